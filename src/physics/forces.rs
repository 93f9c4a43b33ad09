//! Force accumulation: gravity and quadratic drag.

use glam::Vec3;

use crate::engine::entity::Entity;
use crate::engine::error::AccessError;
use crate::engine::systems::{BatchOutcome, System, SystemContext};
use crate::engine::types::ComponentID;
use crate::physics::components::PhysDyn;
use crate::physics::par_rows;


/// Adds a constant force along +Y (screen-down) every tick.
#[derive(Clone, Copy, Debug)]
pub struct Gravity {
    dynamics: ComponentID,
    g: f32,
}

impl Gravity {
    /// Gravity of magnitude `g` acting on the `PhysDyn` column `dynamics`.
    pub fn new(dynamics: ComponentID, g: f32) -> Self {
        Self { dynamics, g }
    }

    #[inline]
    fn apply(&self, body: &mut PhysDyn) {
        body.force.y += self.g;
    }
}

impl System for Gravity {
    fn process(&mut self, ctx: &mut SystemContext<'_>, entity: Entity) -> Result<(), AccessError> {
        self.apply(&mut ctx.column_mut::<PhysDyn>(self.dynamics)?[entity.index()]);
        Ok(())
    }

    fn process_batch(&mut self, ctx: &mut SystemContext<'_>) -> Result<BatchOutcome, AccessError> {
        let this = *self;
        par_rows(ctx, self.dynamics, move |body: &mut PhysDyn| this.apply(body))
    }
}

/// Quadratic drag force for velocity `vel` and drag constant `k = ½·ρ·Cd·A`.
///
/// Each axis is opposed in proportion to `v·|v|`; zero velocity yields zero.
#[inline]
pub fn drag_force(vel: Vec3, k: f32) -> Vec3 {
    -k * vel * vel.abs()
}

/// Quadratic air resistance.
#[derive(Clone, Copy, Debug)]
pub struct Drag {
    dynamics: ComponentID,
    k: f32,
}

impl Drag {
    /// Drag with constant `k` acting on the `PhysDyn` column `dynamics`.
    pub fn new(dynamics: ComponentID, k: f32) -> Self {
        Self { dynamics, k }
    }

    #[inline]
    fn apply(&self, body: &mut PhysDyn) {
        body.force += drag_force(body.vel, self.k);
    }
}

impl System for Drag {
    fn process(&mut self, ctx: &mut SystemContext<'_>, entity: Entity) -> Result<(), AccessError> {
        self.apply(&mut ctx.column_mut::<PhysDyn>(self.dynamics)?[entity.index()]);
        Ok(())
    }

    fn process_batch(&mut self, ctx: &mut SystemContext<'_>) -> Result<BatchOutcome, AccessError> {
        let this = *self;
        par_rows(ctx, self.dynamics, move |body: &mut PhysDyn| this.apply(body))
    }
}
