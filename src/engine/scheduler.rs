//! ECS system scheduling and execution.
//!
//! This module is responsible for:
//! * registering systems and the auxiliary contexts they share,
//! * resolving named dependencies into a single execution order,
//! * running every system over its matching entities once per tick,
//! * sampling per-system performance counters.
//!
//! ## Scheduling model
//!
//! Systems form a directed acyclic graph (see [`crate::engine::graph`]). The
//! graph is checked for cycles eagerly at each registration, and fully
//! resolved by [`Scheduler::finalize`], which freezes a stable topological
//! order. A system begins only after every system ordered before it has
//! finished with every entity; there is no overlap between systems.
//!
//! ## Execution modes
//!
//! * [`ExecutionMode::Sequential`]: each system visits matching entities in
//!   ascending id order on the calling thread.
//! * [`ExecutionMode::Parallel`]: systems that provide a batch form
//!   ([`System::process_batch`]) split their entity range across the Rayon
//!   pool. Systems without one, and systems sharing an auxiliary context,
//!   still run sequentially. Ordering between systems is unchanged.
//!
//! ## Post-tick hooks
//!
//! After the last system of a tick returns, or after a system fails, every
//! auxiliary context receives [`AuxContext::post_tick`], in insertion order.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace_span, warn};

use crate::engine::entity::Entities;
use crate::engine::error::{AccessError, DependencyError, ECSResult};
use crate::engine::graph::{DependencyGraph, Resolution};
use crate::engine::perf::{default_counter_source, CounterSource, PerfStats};
use crate::engine::storage::ComponentStores;
use crate::engine::systems::{AuxContext, BatchOutcome, System, SystemContext, SystemDescriptor};
use crate::engine::types::{AuxID, Signature, SystemID, Tick};


/// How entity loops are executed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One thread, ascending entity order.
    #[default]
    Sequential,
    /// Batch-capable systems use the Rayon pool.
    Parallel,
}

/// A registered system together with its bookkeeping.
struct SystemEntry {
    descriptor: SystemDescriptor,
    system: Box<dyn System>,
    aux: Option<AuxID>,
    stats: PerfStats,
}

/// One line of a [`DryRunReport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DryRunEntry {
    /// System name.
    pub name: String,
    /// Position in the execution order.
    pub position: usize,
    /// Number of entities the system would process.
    pub matched: usize,
    /// Auxiliary context bound to the system.
    pub aux: Option<AuxID>,
}

/// Execution order and per-system match counts, produced without running
/// any system.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DryRunReport {
    /// Entries in execution order.
    pub entries: Vec<DryRunEntry>,
}

impl DryRunReport {
    /// System names in execution order.
    pub fn order(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }
}

/// Owns systems, auxiliary contexts, and the frozen execution order.
///
/// ## Invariants
/// * System names are unique.
/// * `order` is a permutation of all registered systems whenever
///   `finalized` is `true`.
/// * Registering a system clears `finalized`.
pub struct Scheduler {
    systems: Vec<SystemEntry>,
    by_name: HashMap<String, SystemID>,
    aux: Vec<Box<dyn AuxContext>>,
    order: Vec<SystemID>,
    finalized: bool,
    mode: ExecutionMode,
    counters: Box<dyn CounterSource>,
    ticks: Tick,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(ExecutionMode::default())
    }
}

impl Scheduler {
    /// Creates an empty scheduler.
    pub fn new(mode: ExecutionMode) -> Self {
        Self {
            systems: Vec::new(),
            by_name: HashMap::new(),
            aux: Vec::new(),
            order: Vec::new(),
            finalized: false,
            mode,
            counters: default_counter_source(),
            ticks: 0,
        }
    }

    /// Current execution mode.
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Switches the execution mode. Takes effect on the next tick.
    pub fn set_mode(&mut self, mode: ExecutionMode) {
        self.mode = mode;
    }

    /// Replaces the performance counter source.
    pub fn set_counter_source(&mut self, source: Box<dyn CounterSource>) {
        self.counters = source;
    }

    /// Number of completed ticks.
    pub fn ticks(&self) -> Tick {
        self.ticks
    }

    /// Number of registered systems.
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Takes ownership of an auxiliary context and returns its id.
    pub fn insert_aux<T: AuxContext>(&mut self, context: T) -> AuxID {
        let id = self.aux.len() as AuxID;
        self.aux.push(Box::new(context));
        id
    }

    /// Typed shared access to an auxiliary context.
    pub fn aux<T: AuxContext>(&self, id: AuxID) -> Result<&T, AccessError> {
        let context: &dyn AuxContext = self.aux.get(id as usize).ok_or(AccessError::Aux(id))?.as_ref();
        let any: &dyn std::any::Any = context;
        any.downcast_ref::<T>().ok_or(AccessError::Aux(id))
    }

    /// Typed mutable access to an auxiliary context.
    pub fn aux_mut<T: AuxContext>(&mut self, id: AuxID) -> Result<&mut T, AccessError> {
        let context: &mut dyn AuxContext = self.aux.get_mut(id as usize).ok_or(AccessError::Aux(id))?.as_mut();
        let any: &mut dyn std::any::Any = context;
        any.downcast_mut::<T>().ok_or(AccessError::Aux(id))
    }

    /// Registers a system.
    ///
    /// Dependencies may name systems that are registered later; those edges
    /// are resolved by [`finalize`](Self::finalize). Edges between systems
    /// that already exist are checked for cycles immediately, and a system
    /// that would close a cycle is rejected without being inserted.
    ///
    /// ## Errors
    /// `DuplicateSystem`, `InvalidDescriptor` (empty name), `UnknownAux`,
    /// or `Cycle`.
    pub fn register_system(
        &mut self,
        descriptor: SystemDescriptor,
        system: Box<dyn System>,
        aux: Option<AuxID>,
    ) -> Result<SystemID, DependencyError> {
        if descriptor.name.is_empty() {
            return Err(DependencyError::InvalidDescriptor {
                system: descriptor.name,
                reason: "system name is empty",
            });
        }
        if self.by_name.contains_key(&descriptor.name) {
            return Err(DependencyError::DuplicateSystem(descriptor.name));
        }
        if let Some(id) = aux {
            if id as usize >= self.aux.len() {
                return Err(DependencyError::UnknownAux { system: descriptor.name, aux: id });
            }
        }
        let id = SystemID::try_from(self.systems.len()).map_err(|_| DependencyError::InvalidDescriptor {
            system: descriptor.name.clone(),
            reason: "system id space exhausted",
        })?;

        let candidates = self.systems.iter().map(|e| &e.descriptor).chain(std::iter::once(&descriptor));
        DependencyGraph::build(candidates, Resolution::Partial)?.topological_order()?;

        debug!(
            system = %descriptor.name,
            id,
            required = ?descriptor.required,
            observed = ?descriptor.observed,
            pre = ?descriptor.pre_deps,
            post = ?descriptor.post_deps,
            deps = ?descriptor.deps,
            "registered system"
        );

        self.by_name.insert(descriptor.name.clone(), id);
        self.systems.push(SystemEntry { descriptor, system, aux, stats: PerfStats::default() });
        self.finalized = false;
        Ok(id)
    }

    /// Resolves every dependency and freezes the execution order.
    ///
    /// Calling it again without new registrations is a no-op.
    ///
    /// ## Errors
    /// `UnresolvedDependency` or `Cycle`.
    pub fn finalize(&mut self) -> Result<&[SystemID], DependencyError> {
        if !self.finalized {
            let graph = DependencyGraph::build(self.systems.iter().map(|e| &e.descriptor), Resolution::Strict)?;
            self.order = graph.topological_order()?.into_iter().map(|i| i as SystemID).collect();
            self.finalized = true;
            let names: Vec<&str> = self.order_names().collect();
            info!(order = ?names, "execution order finalized");
        }
        Ok(&self.order)
    }

    /// Returns `true` if the order is frozen and no system was added since.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Names in execution order. Empty before finalization.
    pub fn order_names(&self) -> impl Iterator<Item = &str> {
        let frozen: &[SystemID] = if self.finalized { &self.order } else { &[] };
        frozen.iter().map(|&id| self.systems[id as usize].descriptor.name.as_str())
    }

    /// Looks up a system id by name.
    pub fn system_id(&self, name: &str) -> Option<SystemID> {
        self.by_name.get(name).copied()
    }

    /// Descriptor of a registered system.
    pub fn descriptor(&self, id: SystemID) -> Option<&SystemDescriptor> {
        self.systems.get(id as usize).map(|e| &e.descriptor)
    }

    /// Performance counters of the named system.
    pub fn stats_of(&self, name: &str) -> Option<&PerfStats> {
        self.system_id(name).map(|id| &self.systems[id as usize].stats)
    }

    /// `(name, stats)` for every system, in registration order.
    pub fn system_stats(&self) -> impl Iterator<Item = (&str, &PerfStats)> {
        self.systems.iter().map(|e| (e.descriptor.name.as_str(), &e.stats))
    }

    /// Finalizes and reports what a tick would do, without running systems.
    pub fn dry_run(&mut self, entities: &Entities) -> Result<DryRunReport, DependencyError> {
        self.finalize()?;
        let entries: Vec<DryRunEntry> = self
            .order
            .iter()
            .enumerate()
            .map(|(position, &id)| {
                let entry = &self.systems[id as usize];
                DryRunEntry {
                    name: entry.descriptor.name.clone(),
                    position,
                    matched: entities.matching(entry.descriptor.match_signature()).count(),
                    aux: entry.aux,
                }
            })
            .collect();

        for e in &entries {
            info!(position = e.position, system = %e.name, matched = e.matched, aux = ?e.aux, "dry run");
        }
        Ok(DryRunReport { entries })
    }

    /// Executes one tick: every system in order, then every post-tick hook.
    ///
    /// Finalizes first if needed. A system error stops the tick at that
    /// system; the post-tick hooks still run, so auxiliary contexts start the
    /// next tick clean, but the tick counter does not advance. Component
    /// writes made before the error are kept.
    pub fn run_tick(&mut self, stores: &mut ComponentStores, entities: &Entities) -> ECSResult<()> {
        self.finalize()?;
        let tick = self.ticks;
        let _tick_span = trace_span!("tick", tick).entered();

        let outcome = self.run_systems(stores, entities, tick);

        for context in &mut self.aux {
            context.post_tick();
        }
        if let Err(err) = &outcome {
            warn!(tick, error = %err, "tick aborted");
        }
        outcome?;
        self.ticks += 1;
        Ok(())
    }

    fn run_systems(&mut self, stores: &mut ComponentStores, entities: &Entities, tick: Tick) -> Result<(), AccessError> {
        for position in 0..self.order.len() {
            let entry = &mut self.systems[self.order[position] as usize];
            entry.stats.begin_tick();

            let filter = entry.descriptor.match_signature();
            let aux = match entry.aux {
                Some(id) => Some((id, self.aux[id as usize].as_mut())),
                None => None,
            };
            let shares_aux = aux.is_some();
            let mut ctx = SystemContext::new(stores, entities.signatures(), filter, aux, tick);

            let _system_span = trace_span!("system", name = %entry.descriptor.name).entered();
            let before = self.counters.read();
            let started = Instant::now();

            let batched = if self.mode == ExecutionMode::Parallel && !shares_aux {
                entry.system.process_batch(&mut ctx)?
            } else {
                BatchOutcome::Unsupported
            };
            let processed = match batched {
                BatchOutcome::Processed(n) => n,
                BatchOutcome::Unsupported => run_entities(entry.system.as_mut(), &mut ctx, entities, filter)?,
            };

            let elapsed: Duration = started.elapsed();
            let delta = self.counters.read() - before;
            entry.stats.record(delta, processed, elapsed);
        }
        Ok(())
    }
}

/// Sequential entity loop: ascending ids, signature filter.
fn run_entities(
    system: &mut dyn System,
    ctx: &mut SystemContext<'_>,
    entities: &Entities,
    filter: Signature,
) -> Result<u64, AccessError> {
    let mut processed = 0u64;
    for entity in entities.matching(filter) {
        system.process(ctx, entity)?;
        processed += 1;
    }
    Ok(processed)
}
