//! Physics component records and their registration.
//!
//! All records are `#[repr(C)]` plain data so their stores can be uploaded to
//! GPU buffers without conversion. `PhysPos` is 12 bytes and `PhysDyn` is 40.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::engine::error::ComponentError;
use crate::engine::manager::ECSManager;
use crate::engine::types::{ComponentID, Signature};


/// Registration name of [`PhysPos`].
pub const PHYS_POS: &str = "phys_pos";
/// Registration name of [`PhysDyn`].
pub const PHYS_DYN: &str = "phys_dyn";
/// Registration name of [`PhysSphere`].
pub const PHYS_SPHERE: &str = "phys_sphere";

/// Authoritative position. Written only by the commit system.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PhysPos {
    /// World-space position.
    pub pos: Vec3,
}

/// Motion state of a dynamic body.
///
/// `force` accumulates during a tick and is cleared by integration. `d_pos` is
/// the displacement staged for this tick; collision systems amend it and the
/// commit system applies it.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PhysDyn {
    /// Displacement staged for the current tick.
    pub d_pos: Vec3,
    /// Velocity.
    pub vel: Vec3,
    /// Accumulated force.
    pub force: Vec3,
    /// Mass. Non-positive mass marks the body immovable.
    pub mass: f32,
}

/// Collision sphere radius.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PhysSphere {
    /// Radius.
    pub r: f32,
}

/// Component ids of the physics records in one world.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhysComponents {
    /// [`PhysPos`] id.
    pub pos: ComponentID,
    /// [`PhysDyn`] id.
    pub dynamics: ComponentID,
    /// [`PhysSphere`] id.
    pub sphere: ComponentID,
}

impl PhysComponents {
    /// Registers the three physics components.
    pub fn register(ecs: &mut ECSManager) -> Result<Self, ComponentError> {
        Ok(Self {
            pos: ecs.register_component::<PhysPos>(PHYS_POS)?,
            dynamics: ecs.register_component::<PhysDyn>(PHYS_DYN)?,
            sphere: ecs.register_component::<PhysSphere>(PHYS_SPHERE)?,
        })
    }

    /// Signature of a moving point: position and dynamics.
    pub fn point(&self) -> Signature {
        Signature::of(self.pos).with(self.dynamics)
    }

    /// Signature of a moving, collidable sphere.
    pub fn sphere_body(&self) -> Signature {
        self.point().with(self.sphere)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_sizes_match_the_gpu_layout() {
        assert_eq!(std::mem::size_of::<PhysPos>(), 12);
        assert_eq!(std::mem::size_of::<PhysDyn>(), 40);
        assert_eq!(std::mem::size_of::<PhysSphere>(), 4);
    }

    #[test]
    fn registers_under_fixed_names() {
        let mut ecs = ECSManager::new();
        let ids = PhysComponents::register(&mut ecs).unwrap();
        assert_eq!(ecs.component_id(PHYS_DYN), Some(ids.dynamics));
        assert_eq!(ecs.component_desc(ids.dynamics).unwrap().size, 40);
        assert!(ids.sphere_body().contains_all(&ids.point()));
        assert!(PhysComponents::register(&mut ecs).is_err());
    }
}
