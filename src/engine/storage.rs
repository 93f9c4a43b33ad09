//! Dense component storage and type-erased access.
//!
//! Every registered component type owns exactly one [`DenseStore<T>`]: a
//! contiguous, growable array indexed directly by entity id. There are no
//! chunks and no archetype tables; the row for entity `e` is always slot `e`
//! in every store.
//!
//! # What this module provides
//!
//! - **`DenseStore<T>`**: the typed column.
//! - **`TypeErasedStore`**: an object-safe view used to keep heterogeneous
//!   columns in one container, grow them together, and export raw bytes.
//! - **`ComponentStores`**: the container, with checked typed access and
//!   disjoint multi-column borrows for systems that read one component while
//!   writing another.
//!
//! # Growth
//!
//! Stores only ever grow. All stores are resized together whenever an entity
//! is allocated, so `len() >= entity_count` holds for every column. Growth is
//! amortized geometric (`Vec` doubling) and moves the allocation; it therefore
//! requires `&mut ComponentStores` and can never overlap a system borrow.
//! Previously written records are preserved across every reallocation.
//!
//! # Export
//!
//! Component records are `bytemuck::Pod`, so a column can be viewed as
//! `&[u8]` without copying. This is the surface consumed by renderers that
//! upload positions into GPU-visible buffers each frame.

use std::any::{type_name, Any, TypeId};

use bytemuck::Pod;

use crate::engine::error::AccessError;
use crate::engine::types::ComponentID;


/// Marker for types that can live in a component store.
///
/// Records must be plain data (`Pod`) with a default value used to fill newly
/// allocated rows.
pub trait Component: Pod + Default + Send + Sync + 'static {}

impl<T: Pod + Default + Send + Sync + 'static> Component for T {}

/// Object-safe interface over a [`DenseStore<T>`] of unknown `T`.
pub trait TypeErasedStore: Any + Send + Sync {
    /// `TypeId` of the stored record type.
    fn element_type_id(&self) -> TypeId;

    /// Rust name of the stored record type.
    fn element_type_name(&self) -> &'static str;

    /// Size in bytes of one record.
    fn record_size(&self) -> usize;

    /// Number of initialized rows.
    fn len(&self) -> usize;

    /// Returns `true` if the store has no rows.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of rows that fit without reallocating.
    fn capacity(&self) -> usize;

    /// Grows the store to `len` rows, filling new rows with `T::default()`.
    ///
    /// Never shrinks.
    fn grow_to(&mut self, len: usize);

    /// Raw bytes of the first `rows` records.
    fn as_bytes(&self, rows: usize) -> &[u8];

    /// Upcast for downcasting to the concrete store.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete store.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Contiguous column of `T` records indexed by entity id.
#[derive(Debug, Clone, Default)]
pub struct DenseStore<T> {
    values: Vec<T>,
}

impl<T: Component> DenseStore<T> {
    /// Creates a store pre-grown to `len` default records.
    pub fn with_len(len: usize) -> Self {
        Self { values: vec![T::default(); len] }
    }

    /// Returns the record for row `index`, if in bounds.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.values.get(index)
    }

    /// Returns the mutable record for row `index`, if in bounds.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.values.get_mut(index)
    }

    /// All rows as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    /// All rows as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.values
    }
}

impl<T: Component> TypeErasedStore for DenseStore<T> {
    fn element_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn element_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn record_size(&self) -> usize {
        std::mem::size_of::<T>()
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn capacity(&self) -> usize {
        self.values.capacity()
    }

    fn grow_to(&mut self, len: usize) {
        if len > self.values.len() {
            self.values.resize(len, T::default());
        }
    }

    fn as_bytes(&self, rows: usize) -> &[u8] {
        let rows = rows.min(self.values.len());
        bytemuck::cast_slice(&self.values[..rows])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Downcasts an erased store to `DenseStore<T>`, reporting a type mismatch.
fn typed<T: Component>(
    component_id: ComponentID,
    store: &dyn TypeErasedStore,
) -> Result<&DenseStore<T>, AccessError> {
    store
        .as_any()
        .downcast_ref::<DenseStore<T>>()
        .ok_or_else(|| AccessError::TypeMismatch {
            component_id,
            expected: store.element_type_name(),
            actual: type_name::<T>(),
        })
}

/// Mutable variant of [`typed`].
fn typed_mut<T: Component>(
    component_id: ComponentID,
    store: &mut dyn TypeErasedStore,
) -> Result<&mut DenseStore<T>, AccessError> {
    let expected = store.element_type_name();
    store
        .as_any_mut()
        .downcast_mut::<DenseStore<T>>()
        .ok_or(AccessError::TypeMismatch {
            component_id,
            expected,
            actual: type_name::<T>(),
        })
}

/// All component columns, indexed by [`ComponentID`].
///
/// ## Invariants
/// - `stores[id]` exists for every registered component id.
/// - Every store has the same length, which is `>=` the entity count.
#[derive(Default)]
pub struct ComponentStores {
    stores: Vec<Box<dyn TypeErasedStore>>,
}

impl ComponentStores {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a new column for `T` with `len` default rows and returns its id.
    ///
    /// The caller (the component registry) is responsible for id capacity.
    pub(crate) fn push<T: Component>(&mut self, len: usize) -> ComponentID {
        let id = self.stores.len() as ComponentID;
        self.stores.push(Box::new(DenseStore::<T>::with_len(len)));
        id
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    /// Returns `true` if no component type has been registered.
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Grows every column to at least `len` rows.
    pub(crate) fn grow_all(&mut self, len: usize) {
        for store in &mut self.stores {
            store.grow_to(len);
        }
    }

    /// Returns the erased column for `component_id`.
    pub fn erased(&self, component_id: ComponentID) -> Result<&dyn TypeErasedStore, AccessError> {
        self.stores
            .get(component_id as usize)
            .map(|store| store.as_ref())
            .ok_or(AccessError::UnknownComponent(component_id))
    }

    fn erased_mut(&mut self, component_id: ComponentID) -> Result<&mut dyn TypeErasedStore, AccessError> {
        self.stores
            .get_mut(component_id as usize)
            .map(|store| store.as_mut())
            .ok_or(AccessError::UnknownComponent(component_id))
    }

    /// Typed column for `component_id`.
    pub fn column<T: Component>(&self, component_id: ComponentID) -> Result<&[T], AccessError> {
        Ok(typed::<T>(component_id, self.erased(component_id)?)?.as_slice())
    }

    /// Mutable typed column for `component_id`.
    pub fn column_mut<T: Component>(&mut self, component_id: ComponentID) -> Result<&mut [T], AccessError> {
        Ok(typed_mut::<T>(component_id, self.erased_mut(component_id)?)?.as_mut_slice())
    }

    /// Borrows one column for reading and a different column for writing.
    ///
    /// ## Errors
    /// `Aliased` if `read == write`; `UnknownComponent` / `TypeMismatch` as for
    /// [`column`](Self::column).
    pub fn read_write<R: Component, W: Component>(
        &mut self,
        read: ComponentID,
        write: ComponentID,
    ) -> Result<(&[R], &mut [W]), AccessError> {
        let [r, w] = self.disjoint_mut([read, write])?;
        Ok((typed::<R>(read, &**r)?.as_slice(), typed_mut::<W>(write, &mut **w)?.as_mut_slice()))
    }

    /// Borrows two columns for reading and a third for writing.
    pub fn read2_write<R1: Component, R2: Component, W: Component>(
        &mut self,
        read_a: ComponentID,
        read_b: ComponentID,
        write: ComponentID,
    ) -> Result<(&[R1], &[R2], &mut [W]), AccessError> {
        let [a, b, w] = self.disjoint_mut([read_a, read_b, write])?;
        Ok((
            typed::<R1>(read_a, &**a)?.as_slice(),
            typed::<R2>(read_b, &**b)?.as_slice(),
            typed_mut::<W>(write, &mut **w)?.as_mut_slice(),
        ))
    }

    fn disjoint_mut<const N: usize>(
        &mut self,
        ids: [ComponentID; N],
    ) -> Result<[&mut Box<dyn TypeErasedStore>; N], AccessError> {
        for (i, id) in ids.iter().enumerate() {
            if (*id as usize) >= self.stores.len() {
                return Err(AccessError::UnknownComponent(*id));
            }
            if ids[..i].contains(id) {
                return Err(AccessError::Aliased(*id));
            }
        }
        self.stores
            .get_disjoint_mut(ids.map(|id| id as usize))
            .map_err(|_| AccessError::Aliased(ids[0]))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C)]
    #[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
    struct Mass(f32);

    #[repr(C)]
    #[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
    struct Heat(u32);

    #[test]
    fn growth_preserves_sentinels() {
        let mut store = DenseStore::<Heat>::with_len(3);
        store.as_mut_slice().copy_from_slice(&[Heat(7), Heat(8), Heat(9)]);
        let first_capacity = store.capacity();
        store.grow_to(first_capacity * 8 + 1);
        assert_eq!(&store.as_slice()[..3], &[Heat(7), Heat(8), Heat(9)]);
        assert!(store.as_slice()[3..].iter().all(|h| *h == Heat(0)));
    }

    #[test]
    fn grow_to_never_shrinks() {
        let mut store = DenseStore::<Heat>::with_len(10);
        store.grow_to(2);
        assert_eq!(TypeErasedStore::len(&store), 10);
    }

    #[test]
    fn typed_access_rejects_wrong_type() {
        let mut stores = ComponentStores::new();
        let mass = stores.push::<Mass>(4);
        assert!(stores.column::<Mass>(mass).is_ok());
        assert!(matches!(stores.column::<Heat>(mass), Err(AccessError::TypeMismatch { .. })));
        assert!(matches!(stores.column::<Mass>(9), Err(AccessError::UnknownComponent(9))));
    }

    #[test]
    fn read_write_borrows_two_columns() {
        let mut stores = ComponentStores::new();
        let mass = stores.push::<Mass>(2);
        let heat = stores.push::<Heat>(2);
        stores.column_mut::<Mass>(mass).unwrap()[1] = Mass(2.5);

        let (m, h) = stores.read_write::<Mass, Heat>(mass, heat).unwrap();
        h[1] = Heat(m[1].0 as u32);
        assert_eq!(stores.column::<Heat>(heat).unwrap()[1], Heat(2));

        assert!(matches!(
            stores.read_write::<Mass, Mass>(mass, mass),
            Err(AccessError::Aliased(_))
        ));
    }

    #[test]
    fn exports_raw_bytes() {
        let mut stores = ComponentStores::new();
        let heat = stores.push::<Heat>(3);
        stores.column_mut::<Heat>(heat).unwrap()[0] = Heat(0x0102_0304);
        let bytes = stores.erased(heat).unwrap().as_bytes(2);
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[..4], &0x0102_0304u32.to_ne_bytes());
    }
}
