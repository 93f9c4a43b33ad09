//! # decs_sim
//!
//! Data-oriented Entity-Component-System runtime with a point and sphere
//! physics pipeline built on top of it.
//!
//! ## Design Goals
//! - Flat dense storage: one array per component type, indexed by entity id
//! - Deterministic, dependency-ordered scheduling of per-entity systems
//! - Checked component access; configuration errors surface before the first tick
//! - Optional data-parallel entity loops with a barrier between systems
//!
//! ## Layout
//! - [`engine`]: components, entities, systems, scheduler
//! - [`physics`]: physics components and systems, spawning
//! - [`config`]: TOML configuration
//! - [`logger`]: tracing subscriber setup for binaries

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![allow(clippy::module_inception)]

pub mod engine;
pub mod physics;
pub mod config;
pub mod logger;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use engine::manager::ECSManager;
pub use engine::entity::Entity;
pub use engine::types::{build_signature, AuxID, ComponentID, EntityID, Signature, SystemID, Tick};
pub use engine::error::{AccessError, ComponentError, DependencyError, ECSError, ECSResult};
pub use engine::systems::{AuxContext, BatchOutcome, FnSystem, System, SystemContext, SystemDescriptor};
pub use engine::scheduler::{DryRunReport, ExecutionMode, Scheduler};
pub use engine::perf::{default_counter_source, CounterSource, CycleCounter, PerfSample, PerfStats};
#[cfg(target_os = "linux")]
pub use engine::perf::HardwareCounters;
pub use config::SimulationConfig;

/// Convenience re-exports for common usage.
///
/// ```rust
/// use decs_sim::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AccessError,
        AuxContext,
        ECSError,
        ECSManager,
        ECSResult,
        Entity,
        ExecutionMode,
        FnSystem,
        Signature,
        SimulationConfig,
        System,
        SystemContext,
        SystemDescriptor,
    };
    pub use crate::physics::components::{PhysComponents, PhysDyn, PhysPos, PhysSphere};
    pub use crate::physics::install::{install, PhysicsHandles};
    pub use crate::physics::sphere::SphereWorld;
}
