//! Entity handles and the append-only entity allocator.
//!
//! An [`Entity`] is a dense index. The allocator hands out `0, 1, 2, ...` and
//! records, per entity, the [`Signature`] of component types it owns. Entities
//! are never destroyed within a run, so a handle is valid from allocation
//! until the world is dropped and always addresses the same row in every
//! component store.

use std::fmt;

use crate::engine::error::ComponentError;
use crate::engine::types::{EntityID, Signature};


/// Handle naming one row across all component stores.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Entity(pub EntityID);

impl Entity {
    /// Row index of this entity in every component store.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Append-only allocator storing each entity's component signature.
#[derive(Default, Debug, Clone)]
pub struct Entities {
    signatures: Vec<Signature>,
}

impl Entities {
    /// Creates an empty allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next entity with the given component signature.
    ///
    /// ## Errors
    /// `EntityCapacity` if the id space of [`EntityID`] is exhausted.
    pub fn allocate(&mut self, signature: Signature) -> Result<Entity, ComponentError> {
        let index = self.signatures.len();
        let id = EntityID::try_from(index).map_err(|_| ComponentError::EntityCapacity(index))?;
        self.signatures.push(signature);
        Ok(Entity(id))
    }

    /// Number of allocated entities.
    #[inline]
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    /// Returns `true` if no entity has been allocated.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    /// Returns `true` if `entity` was allocated by this allocator.
    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        entity.index() < self.signatures.len()
    }

    /// Component signature of `entity`, if allocated.
    #[inline]
    pub fn signature(&self, entity: Entity) -> Option<Signature> {
        self.signatures.get(entity.index()).copied()
    }

    /// All signatures, indexed by entity id.
    #[inline]
    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// Iterates, in ascending id order, over entities whose signature
    /// contains every bit of `filter`.
    pub fn matching(&self, filter: Signature) -> impl Iterator<Item = Entity> + '_ {
        self.signatures
            .iter()
            .enumerate()
            .filter(move |(_, signature)| signature.contains_all(&filter))
            .map(|(index, _)| Entity(index as EntityID))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::build_signature;

    #[test]
    fn ids_are_sequential() {
        let mut entities = Entities::new();
        let a = entities.allocate(Signature::of(0)).unwrap();
        let b = entities.allocate(Signature::of(1)).unwrap();
        assert_eq!((a, b), (Entity(0), Entity(1)));
        assert_eq!(entities.signature(b), Some(Signature::of(1)));
        assert_eq!(entities.signature(Entity(2)), None);
    }

    #[test]
    fn matching_filters_by_signature() {
        let mut entities = Entities::new();
        entities.allocate(build_signature(&[0, 1])).unwrap();
        entities.allocate(build_signature(&[1])).unwrap();
        entities.allocate(build_signature(&[0, 1, 2])).unwrap();

        let hits: Vec<_> = entities.matching(build_signature(&[0, 1])).collect();
        assert_eq!(hits, vec![Entity(0), Entity(2)]);
    }
}
