//! # Component Registry
//!
//! Assigns stable [`ComponentID`] values to named component types and records
//! their layout metadata.
//!
//! ## Design
//! - Components are registered once, by unique name, and receive the next free
//!   id in `[0, COMPONENT_CAP)`. The id doubles as the component's bit in an
//!   entity [`Signature`].
//! - The record size is taken from the Rust type, so a registration can never
//!   disagree with the store that backs it.
//! - The registry belongs to one world. There is no process-wide state; two
//!   worlds may register the same names independently.
//!
//! ## Invariants
//! - Ids are dense, stable, and never reused.
//! - `descs[id]` exists for every registered id and `by_name` maps back to it.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;

use crate::engine::error::ComponentError;
use crate::engine::storage::Component;
use crate::engine::types::{ComponentID, Signature, COMPONENT_CAP};


/// Describes a registered component type.
///
/// ## Fields
/// - `component_id`: The runtime identifier assigned by the registry.
/// - `name`: The registration name used by system descriptors and diagnostics.
/// - `type_name`: The Rust type name (`type_name::<T>()`).
/// - `size`: Record size in bytes.
/// - `align`: Record alignment in bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentDesc {
    /// Runtime identifier assigned to this component type.
    pub component_id: ComponentID,

    /// Registration name.
    pub name: String,

    /// Rust type name for diagnostics.
    pub type_name: &'static str,

    /// Runtime `TypeId` of the record type.
    pub type_id: TypeId,

    /// Size of one record in bytes.
    pub size: usize,

    /// Alignment of one record in bytes.
    pub align: usize,
}

impl ComponentDesc {
    /// Constructs a descriptor for record type `T`.
    pub fn of<T: 'static>(component_id: ComponentID, name: &str) -> Self {
        Self {
            component_id,
            name: name.to_owned(),
            type_name: type_name::<T>(),
            type_id: TypeId::of::<T>(),
            size: std::mem::size_of::<T>(),
            align: std::mem::align_of::<T>(),
        }
    }

    /// Returns `true` if this descriptor refers to type `T`.
    #[inline]
    pub fn matches_type<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl fmt::Display for ComponentDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ComponentDesc {{ id: {}, name: {}, type: {}, size: {}, align: {} }}",
            self.component_id, self.name, self.type_name, self.size, self.align
        )
    }
}

/// Name-keyed registry of component types for one world.
#[derive(Default, Debug)]
pub struct ComponentRegistry {
    by_name: HashMap<String, ComponentID>,
    descs: Vec<ComponentDesc>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the next id for record type `T` under `name`.
    ///
    /// ## Errors
    /// - `DuplicateName` if `name` is already taken.
    /// - `CapacityExhausted` once [`COMPONENT_CAP`] types exist.
    pub fn register<T: Component>(&mut self, name: &str) -> Result<ComponentID, ComponentError> {
        if self.by_name.contains_key(name) {
            return Err(ComponentError::DuplicateName(name.to_owned()));
        }
        if self.descs.len() >= COMPONENT_CAP {
            return Err(ComponentError::CapacityExhausted { name: name.to_owned(), cap: COMPONENT_CAP });
        }

        let id = self.descs.len() as ComponentID;
        self.by_name.insert(name.to_owned(), id);
        self.descs.push(ComponentDesc::of::<T>(id, name));
        Ok(id)
    }

    /// Number of registered component types.
    pub fn len(&self) -> usize {
        self.descs.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.descs.is_empty()
    }

    /// Looks up a component id by registration name.
    pub fn id_of(&self, name: &str) -> Option<ComponentID> {
        self.by_name.get(name).copied()
    }

    /// Returns the descriptor for `component_id`, if registered.
    pub fn description(&self, component_id: ComponentID) -> Option<&ComponentDesc> {
        self.descs.get(component_id as usize)
    }

    /// Registration name of `component_id`, or `"?"` when unknown.
    pub fn name_of(&self, component_id: ComponentID) -> &str {
        self.description(component_id).map_or("?", |d| d.name.as_str())
    }

    /// Signature with a bit set for every registered component.
    pub fn registered(&self) -> Signature {
        if self.descs.len() == COMPONENT_CAP {
            Signature(u64::MAX)
        } else {
            Signature((1u64 << self.descs.len()) - 1)
        }
    }

    /// Returns the first component id in `signature` that is not registered.
    pub fn first_unknown(&self, signature: Signature) -> Option<ComponentID> {
        signature
            .iterate_over_components()
            .find(|id| (*id as usize) >= self.descs.len())
    }

    /// Iterates over all descriptors in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentDesc> {
        self.descs.iter()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_dense_and_stable() {
        let mut registry = ComponentRegistry::new();
        let a = registry.register::<f32>("a").unwrap();
        let b = registry.register::<[f32; 3]>("b").unwrap();
        assert_eq!((a, b), (0, 1));
        assert_eq!(registry.id_of("b"), Some(1));
        assert_eq!(registry.description(b).unwrap().size, 12);
        assert!(registry.description(a).unwrap().matches_type::<f32>());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = ComponentRegistry::new();
        registry.register::<f32>("pos").unwrap();
        assert_eq!(
            registry.register::<u32>("pos"),
            Err(ComponentError::DuplicateName("pos".into()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn id_space_is_bounded_by_signature_width() {
        let mut registry = ComponentRegistry::new();
        for i in 0..COMPONENT_CAP {
            registry.register::<u8>(&format!("c{i}")).unwrap();
        }
        assert_eq!(registry.registered(), Signature(u64::MAX));
        assert!(matches!(
            registry.register::<u8>("one_too_many"),
            Err(ComponentError::CapacityExhausted { .. })
        ));
    }

    #[test]
    fn finds_unregistered_bits() {
        let mut registry = ComponentRegistry::new();
        registry.register::<u8>("x").unwrap();
        assert_eq!(registry.first_unknown(Signature::of(0)), None);
        assert_eq!(registry.first_unknown(Signature::of(0).with(5)), Some(5));
    }
}
