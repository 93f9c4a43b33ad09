//! Particle fountain spawner.
//!
//! Every particle starts at the configured origin. Its velocity direction
//! rotates with the entity id (a quarter radian per particle) plus a seeded
//! random offset, so consecutive particles fan out while a given seed always
//! reproduces the same run.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::SpawnConfig;
use crate::engine::entity::Entity;
use crate::engine::error::{ComponentError, ECSResult};
use crate::engine::manager::ECSManager;
use crate::engine::types::ComponentID;
use crate::physics::components::{PhysComponents, PhysDyn, PhysPos, PhysSphere};


/// Registration name of [`ParticleColor`].
pub const PARTICLE_COLOR: &str = "particle_color";

/// Display color consumed by renderers.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleColor {
    /// Linear RGB; values above 1 saturate when drawn.
    pub rgb: Vec3,
}

/// Allocates and initializes particles.
pub struct ParticleSpawner {
    config: SpawnConfig,
    components: PhysComponents,
    color: ComponentID,
    rng: ChaCha8Rng,
}

impl ParticleSpawner {
    /// Registers [`ParticleColor`] and prepares a spawner seeded from `config`.
    pub fn new(ecs: &mut ECSManager, components: PhysComponents, config: SpawnConfig) -> Result<Self, ComponentError> {
        let color = ecs.register_component::<ParticleColor>(PARTICLE_COLOR)?;
        Ok(Self { config, components, color, rng: ChaCha8Rng::seed_from_u64(config.seed) })
    }

    /// Component id of [`ParticleColor`].
    pub fn color_component(&self) -> ComponentID {
        self.color
    }

    /// Spawns one particle, or returns `None` once `max_entities` is reached.
    pub fn spawn(&mut self, ecs: &mut ECSManager) -> ECSResult<Option<Entity>> {
        if ecs.entity_count() >= self.config.max_entities {
            return Ok(None);
        }

        let collidable = self.config.radius > 0.0;
        let body = if collidable { self.components.sphere_body() } else { self.components.point() };
        let entity = ecs.allocate_entity(body.with(self.color))?;

        let id = entity.0 as f32;
        let angle = id * 0.25 + self.rng.gen::<f32>();
        let vel = Vec3::new(angle.cos(), angle.sin(), angle.sin()) * self.config.speed;

        ecs.get_component_mut::<PhysPos>(self.components.pos, entity)?.pos = self.config.origin;
        *ecs.get_component_mut::<PhysDyn>(self.components.dynamics, entity)? = PhysDyn {
            vel,
            mass: self.config.mass,
            ..PhysDyn::default()
        };
        if collidable {
            ecs.get_component_mut::<PhysSphere>(self.components.sphere, entity)?.r = self.config.radius;
        }
        ecs.get_component_mut::<ParticleColor>(self.color, entity)?.rgb =
            Vec3::new((id * 0.01).sin() * 2.0, (id * 0.03).cos() * 2.0, id * 0.04);

        Ok(Some(entity))
    }

    /// Spawns the configured per-tick batch; returns how many were created.
    pub fn spawn_tick(&mut self, ecs: &mut ECSManager) -> ECSResult<u32> {
        let mut spawned = 0;
        for _ in 0..self.config.per_tick {
            if self.spawn(ecs)?.is_none() {
                break;
            }
            spawned += 1;
        }
        Ok(spawned)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> (ECSManager, PhysComponents) {
        let mut ecs = ECSManager::new();
        let components = PhysComponents::register(&mut ecs).unwrap();
        (ecs, components)
    }

    #[test]
    fn spawns_at_origin_with_configured_mass_and_speed() {
        let (mut ecs, components) = world();
        let config = SpawnConfig::default();
        let mut spawner = ParticleSpawner::new(&mut ecs, components, config).unwrap();

        let e = spawner.spawn(&mut ecs).unwrap().unwrap();
        let body = ecs.get_component::<PhysDyn>(components.dynamics, e).unwrap();
        assert_eq!(body.mass, 7.0);
        assert_eq!(ecs.get_component::<PhysPos>(components.pos, e).unwrap().pos, config.origin);
        assert_eq!(ecs.get_component::<PhysSphere>(components.sphere, e).unwrap().r, config.radius);
        let planar = Vec3::new(body.vel.x, body.vel.y, 0.0).length();
        assert!((planar - config.speed).abs() < 1e-5);
    }

    #[test]
    fn same_seed_same_particles() {
        let velocities = |seed| {
            let (mut ecs, components) = world();
            let config = SpawnConfig { seed, per_tick: 5, ..SpawnConfig::default() };
            let mut spawner = ParticleSpawner::new(&mut ecs, components, config).unwrap();
            spawner.spawn_tick(&mut ecs).unwrap();
            ecs.column::<PhysDyn>(components.dynamics).unwrap().iter().map(|d| d.vel).collect::<Vec<_>>()
        };
        assert_eq!(velocities(1), velocities(1));
        assert_ne!(velocities(1), velocities(2));
    }

    #[test]
    fn stops_at_max_entities() {
        let (mut ecs, components) = world();
        let config = SpawnConfig { per_tick: 4, max_entities: 6, ..SpawnConfig::default() };
        let mut spawner = ParticleSpawner::new(&mut ecs, components, config).unwrap();
        assert_eq!(spawner.spawn_tick(&mut ecs).unwrap(), 4);
        assert_eq!(spawner.spawn_tick(&mut ecs).unwrap(), 2);
        assert_eq!(spawner.spawn_tick(&mut ecs).unwrap(), 0);
        assert_eq!(ecs.entity_count(), 6);
    }

    #[test]
    fn zero_radius_spawns_points() {
        let (mut ecs, components) = world();
        let config = SpawnConfig { radius: 0.0, ..SpawnConfig::default() };
        let mut spawner = ParticleSpawner::new(&mut ecs, components, config).unwrap();
        let e = spawner.spawn(&mut ecs).unwrap().unwrap();
        assert!(!ecs.signature_of(e).unwrap().has(components.sphere));
    }
}
