//! Registers the physics components, the sphere world and all physics systems.
//!
//! Systems are registered in declaration order (gravity, drag, integrate,
//! walls, commit, sphere build, sphere resolve); the execution order comes
//! from the dependency edges alone.

use crate::config::PhysicsConfig;
use crate::engine::error::ECSResult;
use crate::engine::manager::ECSManager;
use crate::engine::systems::SystemDescriptor;
use crate::engine::types::AuxID;
use crate::physics::components::PhysComponents;
use crate::physics::forces::{Drag, Gravity};
use crate::physics::motion::{Commit, Integrate};
use crate::physics::sphere::{Backout, SphereBuild, SphereResolve, SphereWorld};
use crate::physics::walls::{WallCollision, Walls};
use crate::physics::{COMMIT, DRAG, GRAVITY, INTEGRATE, SPHERE_BUILD, SPHERE_RESOLVE, WALL_COLLISION};


/// Ids produced by [`install`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhysicsHandles {
    /// Physics component ids.
    pub components: PhysComponents,
    /// Id of the [`SphereWorld`] context, if sphere collision is installed.
    pub sphere_world: Option<AuxID>,
}

/// Registers components and the point-physics systems: gravity, drag,
/// integration, walls and commit.
pub fn install_motion(ecs: &mut ECSManager, config: &PhysicsConfig) -> ECSResult<PhysicsHandles> {
    let components = PhysComponents::register(ecs)?;
    let PhysComponents { pos, dynamics, .. } = components;

    ecs.register_system(SystemDescriptor::new(GRAVITY).require(dynamics), Gravity::new(dynamics, config.gravity), None)?;
    ecs.register_system(SystemDescriptor::new(DRAG).require(dynamics), Drag::new(dynamics, config.drag_constant()), None)?;
    ecs.register_system(
        SystemDescriptor::new(INTEGRATE).require(dynamics).depends_on(GRAVITY).depends_on(DRAG),
        Integrate::new(dynamics, config.dt),
        None,
    )?;

    let walls = Walls {
        min: config.bounds_min,
        max: config.bounds_max,
        restitution: config.restitution,
        epsilon: config.wall_epsilon,
    };
    ecs.register_system(
        SystemDescriptor::new(WALL_COLLISION).require(pos).require(dynamics).depends_on(INTEGRATE),
        WallCollision::new(pos, dynamics, walls),
        None,
    )?;
    ecs.register_system(
        SystemDescriptor::new(COMMIT).require(pos).require(dynamics).depends_on(WALL_COLLISION),
        Commit::new(pos, dynamics),
        None,
    )?;

    Ok(PhysicsHandles { components, sphere_world: None })
}

/// Adds the sphere world and the build/resolve systems to a world prepared
/// by [`install_motion`].
pub fn install_sphere_collision(
    ecs: &mut ECSManager,
    handles: PhysicsHandles,
    config: &PhysicsConfig,
) -> ECSResult<PhysicsHandles> {
    let PhysComponents { pos, dynamics, sphere } = handles.components;
    let world = ecs.insert_aux(SphereWorld::new());

    ecs.register_system(
        SystemDescriptor::new(SPHERE_BUILD).require(pos).require(sphere).observe(dynamics).after(INTEGRATE),
        SphereBuild::new(pos, sphere),
        Some(world),
    )?;

    let backout = Backout {
        factor: config.backout_factor,
        min_step: config.min_backout,
        max_iterations: config.max_backout_iterations,
    };
    ecs.register_system(
        SystemDescriptor::new(SPHERE_RESOLVE)
            .require(pos)
            .require(dynamics)
            .require(sphere)
            .after(SPHERE_BUILD)
            .before(COMMIT),
        SphereResolve::new(pos, dynamics, sphere, backout),
        Some(world),
    )?;

    Ok(PhysicsHandles { sphere_world: Some(world), ..handles })
}

/// Installs the whole physics pipeline.
pub fn install(ecs: &mut ECSManager, config: &PhysicsConfig) -> ECSResult<PhysicsHandles> {
    let handles = install_motion(ecs, config)?;
    install_sphere_collision(ecs, handles, config)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_order_follows_dependencies() {
        let mut ecs = ECSManager::new();
        install(&mut ecs, &PhysicsConfig::default()).unwrap();
        ecs.finalize().unwrap();
        assert_eq!(
            ecs.execution_order(),
            [GRAVITY, DRAG, INTEGRATE, WALL_COLLISION, SPHERE_BUILD, SPHERE_RESOLVE, COMMIT]
        );
    }

    #[test]
    fn installing_twice_fails_cleanly() {
        let mut ecs = ECSManager::new();
        install_motion(&mut ecs, &PhysicsConfig::default()).unwrap();
        assert!(install_motion(&mut ecs, &PhysicsConfig::default()).is_err());
    }
}
