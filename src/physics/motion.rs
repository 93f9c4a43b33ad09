//! Integration and position commit.

use crate::engine::entity::Entity;
use crate::engine::error::AccessError;
use crate::engine::systems::{BatchOutcome, System, SystemContext};
use crate::engine::types::ComponentID;
use crate::physics::components::{PhysDyn, PhysPos};
use crate::physics::{par_rows, par_rows_with};


/// One semi-implicit Euler step: `v += F/m·dt`, `d_pos = v·dt`, `F = 0`.
///
/// A body with non-positive (or NaN) mass is immovable: its force is cleared
/// and it stages no displacement.
#[inline]
pub fn integrate(body: &mut PhysDyn, dt: f32) {
    if body.mass > 0.0 {
        let acc = body.force / body.mass;
        body.vel += acc * dt;
        body.d_pos = body.vel * dt;
    } else {
        body.d_pos = glam::Vec3::ZERO;
    }
    body.force = glam::Vec3::ZERO;
}

/// Converts accumulated force into velocity and a staged displacement.
#[derive(Clone, Copy, Debug)]
pub struct Integrate {
    dynamics: ComponentID,
    dt: f32,
}

impl Integrate {
    /// Integrator with fixed step `dt` over the `PhysDyn` column `dynamics`.
    pub fn new(dynamics: ComponentID, dt: f32) -> Self {
        Self { dynamics, dt }
    }
}

impl System for Integrate {
    fn process(&mut self, ctx: &mut SystemContext<'_>, entity: Entity) -> Result<(), AccessError> {
        integrate(&mut ctx.column_mut::<PhysDyn>(self.dynamics)?[entity.index()], self.dt);
        Ok(())
    }

    fn process_batch(&mut self, ctx: &mut SystemContext<'_>) -> Result<BatchOutcome, AccessError> {
        let dt = self.dt;
        par_rows(ctx, self.dynamics, move |body: &mut PhysDyn| integrate(body, dt))
    }
}

/// Applies the staged displacement: `pos += d_pos`.
#[derive(Clone, Copy, Debug)]
pub struct Commit {
    pos: ComponentID,
    dynamics: ComponentID,
}

impl Commit {
    /// Commit over the given position and dynamics columns.
    pub fn new(pos: ComponentID, dynamics: ComponentID) -> Self {
        Self { pos, dynamics }
    }
}

impl System for Commit {
    fn process(&mut self, ctx: &mut SystemContext<'_>, entity: Entity) -> Result<(), AccessError> {
        let (dynamics, pos) = ctx.stores_mut().read_write::<PhysDyn, PhysPos>(self.dynamics, self.pos)?;
        pos[entity.index()].pos += dynamics[entity.index()].d_pos;
        Ok(())
    }

    fn process_batch(&mut self, ctx: &mut SystemContext<'_>) -> Result<BatchOutcome, AccessError> {
        par_rows_with(ctx, self.dynamics, self.pos, |body: &PhysDyn, pos: &mut PhysPos| {
            pos.pos += body.d_pos;
        })
    }
}
