//! Core ECS Types, Identifiers, and Bit-Level Layouts
//!
//! This module defines the **fundamental identifiers and signatures** shared by
//! every other part of the engine: component registration, entity allocation,
//! system matching, and scheduling.
//!
//! ## Design Philosophy
//!
//! The runtime is deliberately flat:
//!
//! - **Dense storage**: one array per component type, indexed by entity id.
//! - **Single-word signatures**: an entity's component set is one `u64`.
//! - **Stable numeric identifiers**: small, copyable ids for every concept.
//!
//! Because a [`Signature`] is a single machine word, at most [`COMPONENT_CAP`]
//! component types can ever be registered. Matching an entity against a system
//! is one `AND` and one compare.
//!
//! ## Entity Representation
//!
//! Entities are plain indices. They are never despawned or recycled, so no
//! version or shard bits are needed: an id is valid for the whole run and
//! addresses the same row in every component store.

use std::fmt;


/// Raw entity index.
pub type EntityID = u32;

/// Identifier for a registered component type (its bit position in a [`Signature`]).
pub type ComponentID = u8;

/// Identifier for a registered system (its registration index).
pub type SystemID = u16;

/// Identifier for a registered auxiliary context.
pub type AuxID = u16;

/// Simulation tick counter.
pub type Tick = u64;

/// Maximum number of registered component types.
pub const COMPONENT_CAP: usize = u64::BITS as usize;

/// Bitset describing which component types an entity owns, or which a system
/// requires.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Signature(pub u64);

impl Signature {
    /// The empty signature.
    pub const EMPTY: Signature = Signature(0);

    /// Returns a signature with the single bit for `component_id` set.
    #[inline]
    pub const fn of(component_id: ComponentID) -> Self {
        Signature(1u64 << component_id)
    }

    /// Sets the bit corresponding to `component_id`.
    #[inline]
    pub fn set(&mut self, component_id: ComponentID) {
        debug_assert!((component_id as usize) < COMPONENT_CAP);
        self.0 |= 1u64 << component_id;
    }

    /// Clears the bit corresponding to `component_id`.
    #[inline]
    pub fn clear(&mut self, component_id: ComponentID) {
        debug_assert!((component_id as usize) < COMPONENT_CAP);
        self.0 &= !(1u64 << component_id);
    }

    /// Builder-style [`set`](Self::set).
    #[inline]
    #[must_use]
    pub fn with(mut self, component_id: ComponentID) -> Self {
        self.set(component_id);
        self
    }

    /// Returns `true` if `component_id` is present in this signature.
    #[inline]
    pub fn has(&self, component_id: ComponentID) -> bool {
        (component_id as usize) < COMPONENT_CAP && (self.0 >> component_id) & 1 == 1
    }

    /// Returns `true` if all components in `other` are present.
    #[inline]
    pub fn contains_all(&self, other: &Signature) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of two signatures.
    #[inline]
    #[must_use]
    pub fn union(self, other: Signature) -> Signature {
        Signature(self.0 | other.0)
    }

    /// Returns `true` if no bit is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of component types in the signature.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates over all component IDs set in this signature, lowest first.
    pub fn iterate_over_components(&self) -> impl Iterator<Item = ComponentID> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let tz = bits.trailing_zeros();
            bits &= bits - 1;
            Some(tz as ComponentID)
        })
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iterate_over_components()).finish()
    }
}

impl FromIterator<ComponentID> for Signature {
    fn from_iter<I: IntoIterator<Item = ComponentID>>(iter: I) -> Self {
        iter.into_iter().fold(Signature::EMPTY, Signature::with)
    }
}

/// Builds a component signature from a list of component IDs.
pub fn build_signature(component_ids: &[ComponentID]) -> Signature {
    component_ids.iter().copied().collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_clear_and_has() {
        let mut s = Signature::default();
        s.set(0);
        s.set(63);
        assert!(s.has(0) && s.has(63) && !s.has(5));
        s.clear(0);
        assert!(!s.has(0));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn contains_all_is_subset_test() {
        let entity = build_signature(&[1, 2, 3]);
        assert!(entity.contains_all(&build_signature(&[1, 3])));
        assert!(entity.contains_all(&Signature::EMPTY));
        assert!(!entity.contains_all(&build_signature(&[1, 4])));
    }

    #[test]
    fn iterates_in_ascending_order() {
        let s = build_signature(&[40, 2, 17]);
        let ids: Vec<_> = s.iterate_over_components().collect();
        assert_eq!(ids, vec![2, 17, 40]);
    }
}
