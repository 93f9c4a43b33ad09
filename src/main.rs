//! Headless particle fountain.
//!
//! Builds a world with the full physics pipeline, spawns particles every tick
//! and prints per-system performance counters at the end.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, level_filters::LevelFilter};

use decs_sim::config::SimulationConfig;
use decs_sim::physics::install::install;
use decs_sim::physics::spawn::ParticleSpawner;
use decs_sim::physics::sphere::SphereWorld;
use decs_sim::{logger, ECSManager, ExecutionMode};


#[derive(Debug, Parser)]
#[command(name = "decs-sim", about = "Run the particle physics simulation without a window")]
struct Args {
    /// TOML config file; defaults are used if it does not exist.
    #[arg(long, default_value = "decs-sim.toml")]
    config: PathBuf,

    /// Number of ticks to run.
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// Run batch-capable systems on the thread pool.
    #[arg(long)]
    parallel: bool,

    /// Only validate registration and print the execution order.
    #[arg(long)]
    dry_run: bool,

    /// Log level for this crate (error, warn, info, debug, trace).
    #[arg(long)]
    log: Option<LevelFilter>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init(args.log.unwrap_or_else(logger::default_level))?;

    let mut config = SimulationConfig::load_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if args.parallel {
        config.scheduler.mode = ExecutionMode::Parallel;
    }

    let mut ecs = ECSManager::with_mode(config.scheduler.mode);
    let handles = install(&mut ecs, &config.physics).context("installing physics")?;
    let mut spawner = ParticleSpawner::new(&mut ecs, handles.components, config.spawn)?;

    let report = ecs.dry_run().context("resolving system order")?;
    for entry in &report.entries {
        println!("{:>2}  {}", entry.position, entry.name);
    }
    if args.dry_run {
        return Ok(());
    }

    info!(ticks = args.ticks, mode = ?config.scheduler.mode, "running");
    for _ in 0..args.ticks {
        spawner.spawn_tick(&mut ecs)?;
        ecs.tick()?;
    }

    print_stats(&ecs);
    if let Some(id) = handles.sphere_world {
        let world = ecs.aux::<SphereWorld>(id)?;
        let total = world.total();
        println!(
            "sphere contacts: {}, exhausted back-outs: {}",
            total.contacts, total.exhausted_backouts
        );
    }
    Ok(())
}

/// Per-system totals for the last tick with per-entity averages in parentheses.
fn print_stats(ecs: &ECSManager) {
    println!("entity count: {}  ticks: {}", ecs.entity_count(), ecs.ticks());
    for (name, stats) in ecs.system_stats() {
        let per = stats.last_tick_per_entity();
        let last = stats.last_tick;
        println!("{name}:");
        println!("    cpu cycles: {} ({})", last.cpu_cycles, per.cpu_cycles);
        println!("    l3 cache refs: {} ({})", last.cache_refs, per.cache_refs);
        println!("    l3 cache misses: {} ({})", last.cache_misses, per.cache_misses);
        println!("    branch instructions: {} ({})", last.branch_instrs, per.branch_instrs);
        println!("    branch misses: {} ({})", last.branch_misses, per.branch_misses);
        println!(
            "    entities: {}  wall time: {:?}  total: {:?}",
            stats.invocations_last_tick, stats.elapsed_last_tick, stats.elapsed_total
        );
    }
}
