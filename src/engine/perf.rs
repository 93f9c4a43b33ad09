//! Per-system performance counters.
//!
//! The scheduler samples a [`CounterSource`] immediately before and after
//! each system's entity loop and folds the difference into that system's
//! [`PerfStats`]. Two views are kept:
//!
//! * `last_tick`: reset at the start of every tick, for live overlays;
//! * `total`: accumulated since the system was registered.
//!
//! ## Sources
//!
//! * [`CycleCounter`] measures cycles only (the CPU timestamp counter on
//!   x86_64, elapsed nanoseconds elsewhere).
//! * `HardwareCounters` (Linux) adds last-level cache references and misses
//!   and branch instructions and misses through one perf-events group.
//!
//! [`default_counter_source`] picks the hardware source when the kernel lets
//! the process open it (see `perf_event_paranoid`) and falls back to
//! [`CycleCounter`] otherwise. Hardware counters follow the opening thread
//! only, so work a batch system hands to the Rayon pool is not included in
//! the cache and branch figures.

use std::ops::{AddAssign, Sub};
use std::time::{Duration, Instant};

#[cfg(target_os = "linux")]
use tracing::debug;


/// One reading (or difference of readings) of the performance counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PerfSample {
    /// CPU cycles (or nanoseconds on targets without a cycle counter).
    pub cpu_cycles: u64,
    /// Last-level cache references.
    pub cache_refs: u64,
    /// Last-level cache misses.
    pub cache_misses: u64,
    /// Retired branch instructions.
    pub branch_instrs: u64,
    /// Mispredicted branches.
    pub branch_misses: u64,
}

impl Sub for PerfSample {
    type Output = PerfSample;

    fn sub(self, earlier: PerfSample) -> PerfSample {
        PerfSample {
            cpu_cycles: self.cpu_cycles.saturating_sub(earlier.cpu_cycles),
            cache_refs: self.cache_refs.saturating_sub(earlier.cache_refs),
            cache_misses: self.cache_misses.saturating_sub(earlier.cache_misses),
            branch_instrs: self.branch_instrs.saturating_sub(earlier.branch_instrs),
            branch_misses: self.branch_misses.saturating_sub(earlier.branch_misses),
        }
    }
}

impl AddAssign for PerfSample {
    fn add_assign(&mut self, rhs: PerfSample) {
        self.cpu_cycles = self.cpu_cycles.saturating_add(rhs.cpu_cycles);
        self.cache_refs = self.cache_refs.saturating_add(rhs.cache_refs);
        self.cache_misses = self.cache_misses.saturating_add(rhs.cache_misses);
        self.branch_instrs = self.branch_instrs.saturating_add(rhs.branch_instrs);
        self.branch_misses = self.branch_misses.saturating_add(rhs.branch_misses);
    }
}

impl PerfSample {
    /// Divides every counter by `n` (per-entity averages). `n == 0` yields zeros.
    pub fn per(&self, n: u64) -> PerfSample {
        if n == 0 {
            return PerfSample::default();
        }
        PerfSample {
            cpu_cycles: self.cpu_cycles / n,
            cache_refs: self.cache_refs / n,
            cache_misses: self.cache_misses / n,
            branch_instrs: self.branch_instrs / n,
            branch_misses: self.branch_misses / n,
        }
    }
}

/// Monotonic source of counter readings.
pub trait CounterSource: Send {
    /// Reads the current counter values.
    fn read(&mut self) -> PerfSample;
}

/// Cycle-only counter source.
#[derive(Debug)]
pub struct CycleCounter {
    #[cfg_attr(target_arch = "x86_64", allow(dead_code))]
    origin: Instant,
}

impl Default for CycleCounter {
    fn default() -> Self {
        Self { origin: Instant::now() }
    }
}

impl CounterSource for CycleCounter {
    #[cfg(target_arch = "x86_64")]
    fn read(&mut self) -> PerfSample {
        #[allow(unused_unsafe)]
        // SAFETY: RDTSC has no memory effects and is present on every x86_64 CPU.
        let cycles = unsafe { core::arch::x86_64::_rdtsc() };
        PerfSample { cpu_cycles: cycles, ..PerfSample::default() }
    }

    #[cfg(not(target_arch = "x86_64"))]
    fn read(&mut self) -> PerfSample {
        let nanos = self.origin.elapsed().as_nanos() as u64;
        PerfSample { cpu_cycles: nanos, ..PerfSample::default() }
    }
}

/// Cycle counter plus cache and branch counters read from one perf-events
/// group. The group counts the thread that opened it.
#[cfg(target_os = "linux")]
pub struct HardwareCounters {
    cycles: CycleCounter,
    group: perf_event::Group,
    cache_refs: perf_event::Counter,
    cache_misses: perf_event::Counter,
    branch_instrs: perf_event::Counter,
    branch_misses: perf_event::Counter,
}

#[cfg(target_os = "linux")]
impl HardwareCounters {
    /// Opens and enables the counter group.
    ///
    /// ## Errors
    /// Any error from `perf_event_open`, typically a permission error under a
    /// restrictive `perf_event_paranoid` or missing PMU support in a VM.
    pub fn open() -> std::io::Result<Self> {
        use perf_event::events::Hardware;
        use perf_event::{Builder, Group};

        let mut group = Group::new()?;
        let cache_refs = group.add(&Builder::new(Hardware::CACHE_REFERENCES))?;
        let cache_misses = group.add(&Builder::new(Hardware::CACHE_MISSES))?;
        let branch_instrs = group.add(&Builder::new(Hardware::BRANCH_INSTRUCTIONS))?;
        let branch_misses = group.add(&Builder::new(Hardware::BRANCH_MISSES))?;
        group.enable()?;

        Ok(Self {
            cycles: CycleCounter::default(),
            group,
            cache_refs,
            cache_misses,
            branch_instrs,
            branch_misses,
        })
    }
}

#[cfg(target_os = "linux")]
impl CounterSource for HardwareCounters {
    fn read(&mut self) -> PerfSample {
        let cpu_cycles = self.cycles.read().cpu_cycles;
        match self.group.read() {
            Ok(counts) => PerfSample {
                cpu_cycles,
                cache_refs: counts[&self.cache_refs],
                cache_misses: counts[&self.cache_misses],
                branch_instrs: counts[&self.branch_instrs],
                branch_misses: counts[&self.branch_misses],
            },
            Err(_) => PerfSample { cpu_cycles, ..PerfSample::default() },
        }
    }
}

/// Hardware counters where available, otherwise [`CycleCounter`].
pub fn default_counter_source() -> Box<dyn CounterSource> {
    #[cfg(target_os = "linux")]
    {
        match HardwareCounters::open() {
            Ok(counters) => return Box::new(counters),
            Err(err) => debug!(error = %err, "hardware counters unavailable, measuring cycles only"),
        }
    }
    Box::new(CycleCounter::default())
}

/// Counters accumulated for one system.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PerfStats {
    /// Counters for the most recent tick.
    pub last_tick: PerfSample,
    /// Counters summed over every tick.
    pub total: PerfSample,
    /// Entities processed in the most recent tick.
    pub invocations_last_tick: u64,
    /// Entities processed over every tick.
    pub invocations_total: u64,
    /// Wall time of the most recent tick's entity loop.
    pub elapsed_last_tick: Duration,
    /// Wall time summed over every tick.
    pub elapsed_total: Duration,
    /// Number of ticks in which the system ran.
    pub ticks: u64,
}

impl PerfStats {
    /// Clears the per-tick view. Called by the scheduler before each tick.
    pub fn begin_tick(&mut self) {
        self.last_tick = PerfSample::default();
        self.invocations_last_tick = 0;
        self.elapsed_last_tick = Duration::ZERO;
    }

    /// Folds one measured entity loop into both views.
    pub fn record(&mut self, delta: PerfSample, invocations: u64, elapsed: Duration) {
        self.last_tick += delta;
        self.total += delta;
        self.invocations_last_tick += invocations;
        self.invocations_total += invocations;
        self.elapsed_last_tick += elapsed;
        self.elapsed_total += elapsed;
        self.ticks += 1;
    }

    /// Per-entity averages for the most recent tick.
    pub fn last_tick_per_entity(&self) -> PerfSample {
        self.last_tick.per(self.invocations_last_tick)
    }
}
