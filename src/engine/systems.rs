//! ECS System Abstractions
//!
//! This module defines the core *system execution model* used by the engine.
//!
//! A **system** is a unit of per-entity logic. Each system is registered with
//! a [`SystemDescriptor`] that declares:
//!
//! - a unique name, used by other systems to refer to it;
//! - the component types it **requires** (it is only invoked for entities
//!   owning all of them);
//! - component types it only **observes** (they participate in matching but
//!   are never handed out for writing);
//! - ordering edges: `pre_deps` (must finish before this system starts),
//!   `post_deps` (must start only after this system finishes), and `deps`
//!   (shorthand for `pre_deps`).
//!
//! ## Dispatch
//!
//! The scheduler calls [`System::process`] once per matching entity, in
//! ascending entity order, passing a [`SystemContext`] through which the
//! system resolves the component columns it needs and its auxiliary context.
//! Matching is explicit data (a [`Signature`] test), not type structure.
//!
//! Systems whose per-entity work touches only that entity's own rows may also
//! implement [`System::process_batch`], a data-parallel form used when the
//! scheduler runs in parallel mode.
//!
//! ## Auxiliary contexts
//!
//! State that is not per-entity (for example a collision staging list shared
//! by two systems) lives in an [`AuxContext`] owned by the scheduler. Access
//! is serialized by the dependency graph, so no locking is involved. After
//! every tick the scheduler invokes each context's [`AuxContext::post_tick`]
//! hook.

use std::any::Any;

use crate::engine::entity::Entity;
use crate::engine::error::AccessError;
use crate::engine::storage::{Component, ComponentStores};
use crate::engine::types::{AuxID, ComponentID, Signature, Tick};


/// Declarative description of a system: identity, matching, and ordering.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SystemDescriptor {
    /// Unique system name.
    pub name: String,
    /// Components every processed entity must own.
    pub required: Signature,
    /// Components that participate in matching but are only observed.
    pub observed: Signature,
    /// Systems that must run fully before this one.
    pub pre_deps: Vec<String>,
    /// Systems that must run fully after this one.
    pub post_deps: Vec<String>,
    /// Generic dependencies; equivalent to `pre_deps`.
    pub deps: Vec<String>,
}

impl SystemDescriptor {
    /// Creates a descriptor with no requirements and no edges.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// Requires component `component_id`.
    #[must_use]
    pub fn require(mut self, component_id: ComponentID) -> Self {
        self.required.set(component_id);
        self
    }

    /// Observes component `component_id` without requiring write access.
    #[must_use]
    pub fn observe(mut self, component_id: ComponentID) -> Self {
        self.observed.set(component_id);
        self
    }

    /// Adds a pre-dependency: `system` runs fully before this one.
    #[must_use]
    pub fn after(mut self, system: impl Into<String>) -> Self {
        self.pre_deps.push(system.into());
        self
    }

    /// Adds a post-dependency: `system` runs fully after this one.
    #[must_use]
    pub fn before(mut self, system: impl Into<String>) -> Self {
        self.post_deps.push(system.into());
        self
    }

    /// Adds a generic named dependency (treated as a pre-dependency).
    #[must_use]
    pub fn depends_on(mut self, system: impl Into<String>) -> Self {
        self.deps.push(system.into());
        self
    }

    /// Signature an entity must contain to be dispatched to this system.
    #[inline]
    pub fn match_signature(&self) -> Signature {
        self.required.union(self.observed)
    }

    /// Names of systems that must run before this one.
    pub fn predecessors(&self) -> impl Iterator<Item = &str> {
        self.pre_deps.iter().chain(self.deps.iter()).map(String::as_str)
    }

    /// Names of systems that must run after this one.
    pub fn successors(&self) -> impl Iterator<Item = &str> {
        self.post_deps.iter().map(String::as_str)
    }
}

/// Tick-scoped state shared by systems outside the component model.
pub trait AuxContext: Any + Send {
    /// Invoked by the scheduler once per tick after every system has run.
    fn post_tick(&mut self) {}
}

/// Result of a data-parallel batch attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The system has no batch form; the scheduler falls back to
    /// per-entity dispatch.
    Unsupported,
    /// The batch ran and processed this many entities.
    Processed(u64),
}

/// A unit of per-entity logic dispatched by the scheduler.
pub trait System: Send {
    /// Processes one matching entity.
    fn process(&mut self, ctx: &mut SystemContext<'_>, entity: Entity) -> Result<(), AccessError>;

    /// Processes every matching entity at once, potentially in parallel.
    ///
    /// The default has no batch form.
    fn process_batch(&mut self, _ctx: &mut SystemContext<'_>) -> Result<BatchOutcome, AccessError> {
        Ok(BatchOutcome::Unsupported)
    }
}

/// View of the world handed to a system while it runs.
pub struct SystemContext<'a> {
    stores: &'a mut ComponentStores,
    signatures: &'a [Signature],
    filter: Signature,
    aux: Option<(AuxID, &'a mut (dyn AuxContext + 'static))>,
    tick: Tick,
}

impl<'a> SystemContext<'a> {
    /// Builds a context. Used by the scheduler and by tests driving systems directly.
    pub fn new(
        stores: &'a mut ComponentStores,
        signatures: &'a [Signature],
        filter: Signature,
        aux: Option<(AuxID, &'a mut (dyn AuxContext + 'static))>,
        tick: Tick,
    ) -> Self {
        Self { stores, signatures, filter, aux, tick }
    }

    /// Index of the tick being executed.
    #[inline]
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Signature the running system matches on.
    #[inline]
    pub fn filter(&self) -> Signature {
        self.filter
    }

    /// Signatures of all allocated entities, indexed by entity id.
    #[inline]
    pub fn signatures(&self) -> &'a [Signature] {
        self.signatures
    }

    /// Number of allocated entities.
    #[inline]
    pub fn entity_count(&self) -> usize {
        self.signatures.len()
    }

    /// Returns `true` if `entity` matches the running system.
    #[inline]
    pub fn matches(&self, entity: Entity) -> bool {
        self.signatures
            .get(entity.index())
            .is_some_and(|s| s.contains_all(&self.filter))
    }

    /// Component stores, for multi-column borrows.
    #[inline]
    pub fn stores_mut(&mut self) -> &mut ComponentStores {
        &mut *self.stores
    }

    /// Typed column for `component_id`.
    #[inline]
    pub fn column<T: Component>(&self, component_id: ComponentID) -> Result<&[T], AccessError> {
        self.stores.column(component_id)
    }

    /// Mutable typed column for `component_id`.
    #[inline]
    pub fn column_mut<T: Component>(&mut self, component_id: ComponentID) -> Result<&mut [T], AccessError> {
        self.stores.column_mut(component_id)
    }

    /// The running system's auxiliary context, downcast to `T`.
    pub fn aux_mut<T: AuxContext>(&mut self) -> Result<&mut T, AccessError> {
        let (id, aux) = self.aux.as_mut().ok_or(AccessError::NoAux)?;
        let id = *id;
        let any: &mut dyn Any = &mut **aux;
        any.downcast_mut::<T>().ok_or(AccessError::Aux(id))
    }

    /// Splits the context into the component stores and the typed auxiliary
    /// context so both can be borrowed at once.
    pub fn stores_and_aux<T: AuxContext>(&mut self) -> Result<(&mut ComponentStores, &mut T), AccessError> {
        let (id, aux) = self.aux.as_mut().ok_or(AccessError::NoAux)?;
        let id = *id;
        let any: &mut dyn Any = &mut **aux;
        let typed = any.downcast_mut::<T>().ok_or(AccessError::Aux(id))?;
        Ok((&mut *self.stores, typed))
    }
}

/// A [`System`] backed by a closure.
///
/// `FnSystem` lets small systems (renderers, probes, test fixtures) be
/// defined inline without a dedicated type.
pub struct FnSystem<F>
where
    F: FnMut(&mut SystemContext<'_>, Entity) -> Result<(), AccessError> + Send,
{
    f: F,
}

impl<F> FnSystem<F>
where
    F: FnMut(&mut SystemContext<'_>, Entity) -> Result<(), AccessError> + Send,
{
    /// Wraps `f` as a system.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> System for FnSystem<F>
where
    F: FnMut(&mut SystemContext<'_>, Entity) -> Result<(), AccessError> + Send,
{
    fn process(&mut self, ctx: &mut SystemContext<'_>, entity: Entity) -> Result<(), AccessError> {
        (self.f)(ctx, entity)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter(u32);

    impl AuxContext for Counter {}

    #[test]
    fn builder_collects_edges_and_matching() {
        let d = SystemDescriptor::new("integrate")
            .require(1)
            .observe(3)
            .after("gravity")
            .depends_on("drag")
            .before("commit");

        assert_eq!(d.match_signature(), Signature::of(1).with(3));
        assert_eq!(d.predecessors().collect::<Vec<_>>(), vec!["gravity", "drag"]);
        assert_eq!(d.successors().collect::<Vec<_>>(), vec!["commit"]);
    }

    #[test]
    fn aux_downcast_checks_type() {
        let mut stores = ComponentStores::new();
        let mut counter = Counter::default();
        let mut ctx = SystemContext::new(&mut stores, &[], Signature::EMPTY, Some((0, &mut counter as &mut dyn AuxContext)), 0);

        ctx.aux_mut::<Counter>().unwrap().0 += 1;
        assert!(matches!(ctx.aux_mut::<Unit>(), Err(AccessError::Aux(0))));
        drop(ctx);
        assert_eq!(counter.0, 1);
    }

    struct Unit;
    impl AuxContext for Unit {}

    #[test]
    fn missing_aux_is_an_error() {
        let mut stores = ComponentStores::new();
        let mut ctx = SystemContext::new(&mut stores, &[], Signature::EMPTY, None, 0);
        assert_eq!(ctx.aux_mut::<Counter>().err(), Some(AccessError::NoAux));
        assert!(matches!(ctx.stores_and_aux::<Counter>(), Err(AccessError::NoAux)));
    }
}
