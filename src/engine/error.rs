//! Error types for registration, scheduling, and component access.
//!
//! The runtime distinguishes two families of failure:
//!
//! * **Configuration errors** ([`ComponentError`], [`DependencyError`]) are
//!   detected while components and systems are registered or when the
//!   execution order is finalized. They are fatal to startup: a world with an
//!   unresolved dependency or a cycle never runs a tick.
//! * **Bounds violations** ([`AccessError`]) describe component access for an
//!   entity that does not own the component, an id that does not exist, or a
//!   type that does not match the registered store. They are programming
//!   errors; the checked accessors report them instead of touching memory.
//!
//! Each type is small and carries enough context to be actionable in logs.
//! [`ECSError`] aggregates them so orchestration code can use `?` throughout.
//!
//! ## Display vs. Debug
//! * `Display` messages are short and suitable for logs.
//! * `Debug` (derived) retains full structure for diagnostics.

use thiserror::Error;

use crate::engine::types::{AuxID, ComponentID, EntityID};


/// Failures while registering component types or allocating entities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {

    /// A component type with this name was already registered.
    #[error("component `{0}` is already registered")]
    DuplicateName(String),

    /// The signature word has no free bit left for another component type.
    #[error("component id space exhausted ({cap} types); cannot register `{name}`")]
    CapacityExhausted {
        /// Name of the component that could not be registered.
        name: String,
        /// Maximum number of component types.
        cap: usize,
    },

    /// A signature referenced a component id that was never registered.
    #[error("component id {0} is not registered")]
    UnknownComponent(ComponentID),

    /// The entity id space is exhausted.
    #[error("entity limit reached ({0} entities)")]
    EntityCapacity(usize),
}

/// Failures while registering systems or resolving the execution order.
///
/// All variants are configuration errors: they are raised by
/// `register_system` or `finalize` and never while a tick is running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {

    /// A system with this name was already registered.
    #[error("system `{0}` is already registered")]
    DuplicateSystem(String),

    /// A dependency name does not match any registered system.
    #[error("system `{system}` depends on unknown system `{dependency}`")]
    UnresolvedDependency {
        /// System declaring the dependency.
        system: String,
        /// Name that failed to resolve.
        dependency: String,
    },

    /// The dependency graph contains a cycle.
    ///
    /// `path` lists the systems on the cycle in edge order; the first entry
    /// is repeated at the end.
    #[error("dependency cycle: {}", path.join(" -> "))]
    Cycle {
        /// Systems forming the cycle.
        path: Vec<String>,
    },

    /// A system referenced an auxiliary context that was never inserted.
    #[error("system `{system}` references unknown aux context {aux}")]
    UnknownAux {
        /// System referencing the context.
        system: String,
        /// Offending aux id.
        aux: AuxID,
    },

    /// The descriptor is malformed (empty name, no required components,
    /// unregistered component ids).
    #[error("invalid descriptor for system `{system}`: {reason}")]
    InvalidDescriptor {
        /// System being registered.
        system: String,
        /// Human-readable reason.
        reason: &'static str,
    },
}

/// Checked component access failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {

    /// The entity id was never allocated.
    #[error("entity {entity} out of range ({entity_count} allocated)")]
    EntityOutOfRange {
        /// Requested entity.
        entity: EntityID,
        /// Number of allocated entities.
        entity_count: usize,
    },

    /// The entity does not own the requested component.
    #[error("entity {entity} does not own component `{component}`")]
    MissingComponent {
        /// Requested entity.
        entity: EntityID,
        /// Component name.
        component: String,
    },

    /// The requested Rust type does not match the registered store type.
    #[error("type mismatch for component {component_id}: store holds `{expected}`, requested `{actual}`")]
    TypeMismatch {
        /// Component id that was addressed.
        component_id: ComponentID,
        /// Type held by the store.
        expected: &'static str,
        /// Type requested by the caller.
        actual: &'static str,
    },

    /// The component id was never registered.
    #[error("component id {0} is not registered")]
    UnknownComponent(ComponentID),

    /// The same component store was requested twice in one disjoint borrow.
    #[error("component {0} requested more than once in a disjoint borrow")]
    Aliased(ComponentID),

    /// The auxiliary context does not exist or holds another type.
    #[error("aux context {0} is missing or has a different type")]
    Aux(AuxID),

    /// The running system was registered without an auxiliary context.
    #[error("system has no aux context bound")]
    NoAux,
}

/// Aggregate error for the public ECS surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ECSError {

    /// Component registration or entity allocation failed.
    #[error(transparent)]
    Component(#[from] ComponentError),

    /// System registration or ordering failed.
    #[error(transparent)]
    Dependency(#[from] DependencyError),

    /// A checked component access failed.
    #[error(transparent)]
    Access(#[from] AccessError),
}

/// Convenience alias used across the engine.
pub type ECSResult<T> = Result<T, ECSError>;
