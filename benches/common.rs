#![allow(dead_code)]

use decs_sim::config::{SimulationConfig, SpawnConfig};
use decs_sim::engine::error::ECSResult;
use decs_sim::physics::install::{install, install_motion, PhysicsHandles};
use decs_sim::physics::spawn::ParticleSpawner;
use decs_sim::{ECSManager, ExecutionMode};

pub const PARTICLES_SMALL: usize = 2_000;
pub const PARTICLES_MED: usize = 100_000;
pub const PARTICLES_LARGE: usize = 1_000_000;

/// World with `count` particles already spawned.
///
/// Sphere collision is quadratic in the particle count, so callers pick
/// `spheres = false` for the larger sizes.
pub fn populated_world(count: usize, mode: ExecutionMode, spheres: bool) -> ECSResult<ECSManager> {
    let config = SimulationConfig::default();
    let mut ecs = ECSManager::with_mode(mode);
    let handles: PhysicsHandles = if spheres {
        install(&mut ecs, &config.physics)?
    } else {
        install_motion(&mut ecs, &config.physics)?
    };

    let spawn = SpawnConfig {
        per_tick: count as u32,
        max_entities: count,
        radius: if spheres { config.spawn.radius } else { 0.0 },
        ..config.spawn
    };
    let mut spawner = ParticleSpawner::new(&mut ecs, handles.components, spawn)?;
    spawner.spawn_tick(&mut ecs)?;
    ecs.finalize()?;
    Ok(ecs)
}
