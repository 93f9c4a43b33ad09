//! Axis-aligned box walls.
//!
//! The wall system never writes position. When a body's predicted position
//! `pos + d_pos` leaves the box on some axis while moving outward, the
//! velocity component on that axis is reflected and damped, and `d_pos` on
//! that axis is rewritten so the commit lands just inside the wall.

use glam::Vec3;

use crate::engine::entity::Entity;
use crate::engine::error::AccessError;
use crate::engine::systems::{BatchOutcome, System, SystemContext};
use crate::engine::types::ComponentID;
use crate::physics::components::{PhysDyn, PhysPos};
use crate::physics::par_rows_with;


/// Box and bounce parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Walls {
    /// Lower corner.
    pub min: Vec3,
    /// Upper corner.
    pub max: Vec3,
    /// Fraction of normal speed kept after a bounce.
    pub restitution: f32,
    /// Distance inside the wall a bounced body is placed at.
    pub epsilon: f32,
}

impl Walls {
    /// Reflects `body` off any wall its predicted position crosses.
    ///
    /// Returns `true` if any axis bounced.
    pub fn bounce(&self, pos: Vec3, body: &mut PhysDyn) -> bool {
        let predicted = pos + body.d_pos;
        let mut bounced = false;
        for axis in 0..3 {
            let target = if predicted[axis] < self.min[axis] && body.vel[axis] < 0.0 {
                self.min[axis] + self.epsilon
            } else if predicted[axis] > self.max[axis] && body.vel[axis] > 0.0 {
                self.max[axis] - self.epsilon
            } else {
                continue;
            };
            body.vel[axis] = -body.vel[axis] * self.restitution;
            body.d_pos[axis] = target - pos[axis];
            bounced = true;
        }
        bounced
    }
}

/// Keeps bodies inside the box.
#[derive(Clone, Copy, Debug)]
pub struct WallCollision {
    pos: ComponentID,
    dynamics: ComponentID,
    walls: Walls,
}

impl WallCollision {
    /// Wall collision over the given columns.
    pub fn new(pos: ComponentID, dynamics: ComponentID, walls: Walls) -> Self {
        Self { pos, dynamics, walls }
    }
}

impl System for WallCollision {
    fn process(&mut self, ctx: &mut SystemContext<'_>, entity: Entity) -> Result<(), AccessError> {
        let (pos, dynamics) = ctx.stores_mut().read_write::<PhysPos, PhysDyn>(self.pos, self.dynamics)?;
        self.walls.bounce(pos[entity.index()].pos, &mut dynamics[entity.index()]);
        Ok(())
    }

    fn process_batch(&mut self, ctx: &mut SystemContext<'_>) -> Result<BatchOutcome, AccessError> {
        let walls = self.walls;
        par_rows_with(ctx, self.pos, self.dynamics, move |pos: &PhysPos, body: &mut PhysDyn| {
            walls.bounce(pos.pos, body);
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Walls {
        Walls { min: Vec3::ZERO, max: Vec3::ONE, restitution: 0.9, epsilon: 1e-3 }
    }

    #[test]
    fn reflects_outward_motion_and_lands_inside() {
        let walls = unit_box();
        let pos = Vec3::new(0.5, 0.99, 0.5);
        let mut body = PhysDyn { vel: Vec3::new(0.0, 2.0, 0.0), d_pos: Vec3::new(0.0, 0.05, 0.0), mass: 1.0, ..Default::default() };

        assert!(walls.bounce(pos, &mut body));
        assert!((body.vel.y + 1.8).abs() < 1e-6);
        let committed = pos + body.d_pos;
        assert!((committed.y - (1.0 - 1e-3)).abs() < 1e-6);
        assert_eq!(committed.x, 0.5);
    }

    #[test]
    fn inward_motion_is_left_alone() {
        let walls = unit_box();
        let mut body = PhysDyn { vel: Vec3::new(1.0, 0.0, 0.0), d_pos: Vec3::new(0.01, 0.0, 0.0), ..Default::default() };
        let before = body;
        assert!(!walls.bounce(Vec3::new(-0.5, 0.5, 0.5), &mut body));
        assert_eq!(body, before);
    }

    #[test]
    fn corner_hits_bounce_both_axes() {
        let walls = unit_box();
        let mut body = PhysDyn { vel: Vec3::new(-1.0, -1.0, 0.0), d_pos: Vec3::new(-0.1, -0.1, 0.0), ..Default::default() };
        assert!(walls.bounce(Vec3::new(0.05, 0.05, 0.5), &mut body));
        assert!(body.vel.x > 0.0 && body.vel.y > 0.0);
        assert_eq!(body.vel.z, 0.0);
    }
}
