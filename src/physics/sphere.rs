//! # Sphere Collision World
//!
//! Two-phase sphere collision, run as two systems sharing one auxiliary
//! context ([`SphereWorld`]).
//!
//! ## Phases
//!
//! * **Build** (`phys_sphere_build`) stages `(entity, center, radius)` for every
//!   collidable body, using the position at the start of the tick.
//! * **Resolve** (`phys_sphere_resolve`) tests each body's *predicted* sphere
//!   `(pos + d_pos, r)` against every staged sphere except its own, in staging
//!   order. Only the first overlap is handled.
//! * **Reset**: the scheduler's post-tick hook clears the staged list, keeping
//!   its allocation.
//!
//! The scheduler guarantees build has staged every body before the first
//! resolve call, because resolve declares build as a pre-dependency.
//!
//! ## Contact response
//!
//! With contact normal `n` pointing from the intruder to the body:
//!
//! 1. velocity is reflected, `v' = v − 2(v·n)n`;
//! 2. the staged displacement is reversed and scaled, `d_pos *= −backout`
//!    (a displacement of ~0 is replaced by `n · min_backout`);
//! 3. while the backed-out position still overlaps the same intruder,
//!    `d_pos` is doubled, at most `max_iterations` times.
//!
//! If the cap is reached the body keeps its last displacement and residual
//! penetration, the approaching normal component of its velocity is removed,
//! and the event is counted in [`CollisionStats::exhausted_backouts`].

use glam::Vec3;
use tracing::{debug, trace};

use crate::engine::entity::Entity;
use crate::engine::error::AccessError;
use crate::engine::systems::{AuxContext, System, SystemContext};
use crate::engine::types::ComponentID;
use crate::physics::components::{PhysDyn, PhysPos, PhysSphere};


/// `d_pos` shorter than this is treated as zero when backing out.
const MIN_DISPLACEMENT_SQ: f32 = 1.0e-12;

/// Returns `true` iff the spheres overlap: `|a−b|² < (ra+rb)²`.
///
/// Touching spheres do not overlap.
#[inline]
pub fn spheres_overlap(a: Vec3, ra: f32, b: Vec3, rb: f32) -> bool {
    let reach = ra + rb;
    a.distance_squared(b) < reach * reach
}

/// Unit contact normal pointing from `other` towards `predicted`.
///
/// Coincident centers fall back to `−d_pos`, then `−vel`, then `+Y`.
pub fn contact_normal(predicted: Vec3, other: Vec3, body: &PhysDyn) -> Vec3 {
    [predicted - other, -body.d_pos, -body.vel]
        .into_iter()
        .find_map(Vec3::try_normalize)
        .unwrap_or(Vec3::Y)
}

/// Reflects `v` about the plane with unit normal `n`.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// A sphere staged by the build phase.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StagedSphere {
    /// Owning entity.
    pub entity: Entity,
    /// Center at the start of the tick.
    pub center: Vec3,
    /// Radius.
    pub r: f32,
}

/// Where the world is within the current tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CollisionPhase {
    /// Nothing staged.
    #[default]
    Empty,
    /// At least one sphere staged; resolution not started.
    Built,
    /// Resolution has started.
    Resolved,
}

/// Contact counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollisionStats {
    /// Bodies that found an overlap.
    pub contacts: u64,
    /// Back-outs that hit the iteration cap.
    pub exhausted_backouts: u64,
}

impl CollisionStats {
    fn absorb(&mut self, other: CollisionStats) {
        self.contacts += other.contacts;
        self.exhausted_backouts += other.exhausted_backouts;
    }
}

/// Back-out tuning.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Backout {
    /// Factor applied to `−d_pos`.
    pub factor: f32,
    /// Distance along the normal used when `d_pos` is ~0.
    pub min_step: f32,
    /// Maximum number of doublings.
    pub max_iterations: u32,
}

impl Default for Backout {
    fn default() -> Self {
        Self { factor: 0.5, min_step: 1.0e-4, max_iterations: 16 }
    }
}

/// Outcome of resolving one body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    /// The intruder that was resolved against.
    pub other: Entity,
    /// Contact normal.
    pub normal: Vec3,
    /// Number of doublings performed.
    pub iterations: u32,
    /// `true` if the cap was reached while still overlapping.
    pub exhausted: bool,
}

/// Tick-scoped sphere staging list plus contact counters.
#[derive(Debug, Default)]
pub struct SphereWorld {
    spheres: Vec<StagedSphere>,
    phase: CollisionPhase,
    pending: CollisionStats,
    last_tick: CollisionStats,
    total: CollisionStats,
}

impl SphereWorld {
    /// Creates an empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of staged spheres.
    pub fn len(&self) -> usize {
        self.spheres.len()
    }

    /// Returns `true` if nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
    }

    /// Allocated staging capacity.
    pub fn capacity(&self) -> usize {
        self.spheres.capacity()
    }

    /// Staged spheres, in staging order.
    pub fn spheres(&self) -> &[StagedSphere] {
        &self.spheres
    }

    /// Current phase.
    pub fn phase(&self) -> CollisionPhase {
        self.phase
    }

    /// Counters of the most recently completed tick.
    pub fn last_tick(&self) -> CollisionStats {
        self.last_tick
    }

    /// Counters since creation.
    pub fn total(&self) -> CollisionStats {
        self.total
    }

    /// Appends a sphere, doubling the backing storage when full.
    pub fn stage(&mut self, entity: Entity, center: Vec3, r: f32) {
        debug_assert_ne!(self.phase, CollisionPhase::Resolved, "sphere staged after resolution started");
        if self.spheres.len() == self.spheres.capacity() {
            let grow = self.spheres.capacity().max(1);
            self.spheres.reserve_exact(grow);
        }
        self.spheres.push(StagedSphere { entity, center, r });
        self.phase = CollisionPhase::Built;
    }

    /// Resolves `body` (at `pos`, radius `r`) against the first staged sphere
    /// its predicted position overlaps.
    ///
    /// Returns `None` when there is no overlap.
    pub fn resolve(&mut self, entity: Entity, pos: Vec3, r: f32, body: &mut PhysDyn, backout: &Backout) -> Option<Contact> {
        self.phase = CollisionPhase::Resolved;
        let predicted = pos + body.d_pos;
        let other = *self
            .spheres
            .iter()
            .find(|s| s.entity != entity && spheres_overlap(predicted, r, s.center, s.r))?;

        self.pending.contacts += 1;
        let normal = contact_normal(predicted, other.center, body);
        body.vel = reflect(body.vel, normal);

        body.d_pos *= -backout.factor;
        if body.d_pos.length_squared() < MIN_DISPLACEMENT_SQ {
            body.d_pos = normal * backout.min_step;
        }

        let mut iterations = 0;
        while spheres_overlap(pos + body.d_pos, r, other.center, other.r) {
            if iterations == backout.max_iterations {
                let approach = body.vel.dot(normal);
                if approach < 0.0 {
                    body.vel -= approach * normal;
                }
                self.pending.exhausted_backouts += 1;
                trace!(%entity, other = %other.entity, iterations, "sphere back-out exhausted");
                return Some(Contact { other: other.entity, normal, iterations, exhausted: true });
            }
            body.d_pos *= 2.0;
            iterations += 1;
        }
        Some(Contact { other: other.entity, normal, iterations, exhausted: false })
    }
}

impl AuxContext for SphereWorld {
    fn post_tick(&mut self) {
        if self.pending.exhausted_backouts > 0 {
            debug!(
                contacts = self.pending.contacts,
                exhausted = self.pending.exhausted_backouts,
                "sphere back-outs hit the iteration cap"
            );
        }
        self.last_tick = std::mem::take(&mut self.pending);
        self.total.absorb(self.last_tick);
        self.spheres.clear();
        self.phase = CollisionPhase::Empty;
    }
}

/// Stages every collidable body. Must not read other bodies' motion.
#[derive(Clone, Copy, Debug)]
pub struct SphereBuild {
    pos: ComponentID,
    sphere: ComponentID,
}

impl SphereBuild {
    /// Build over the given position and sphere columns.
    pub fn new(pos: ComponentID, sphere: ComponentID) -> Self {
        Self { pos, sphere }
    }
}

impl System for SphereBuild {
    fn process(&mut self, ctx: &mut SystemContext<'_>, entity: Entity) -> Result<(), AccessError> {
        let (stores, world) = ctx.stores_and_aux::<SphereWorld>()?;
        let center = stores.column::<PhysPos>(self.pos)?[entity.index()].pos;
        let r = stores.column::<PhysSphere>(self.sphere)?[entity.index()].r;
        world.stage(entity, center, r);
        Ok(())
    }
}

/// Corrects motion of bodies about to overlap a staged sphere.
#[derive(Clone, Copy, Debug)]
pub struct SphereResolve {
    pos: ComponentID,
    dynamics: ComponentID,
    sphere: ComponentID,
    backout: Backout,
}

impl SphereResolve {
    /// Resolve over the given columns.
    pub fn new(pos: ComponentID, dynamics: ComponentID, sphere: ComponentID, backout: Backout) -> Self {
        Self { pos, dynamics, sphere, backout }
    }
}

impl System for SphereResolve {
    fn process(&mut self, ctx: &mut SystemContext<'_>, entity: Entity) -> Result<(), AccessError> {
        let (stores, world) = ctx.stores_and_aux::<SphereWorld>()?;
        let (pos, sphere, dynamics) =
            stores.read2_write::<PhysPos, PhysSphere, PhysDyn>(self.pos, self.sphere, self.dynamics)?;
        let i = entity.index();
        world.resolve(entity, pos[i].pos, sphere[i].r, &mut dynamics[i], &self.backout);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn moving(vel: Vec3, d_pos: Vec3) -> PhysDyn {
        PhysDyn { vel, d_pos, mass: 1.0, ..Default::default() }
    }

    #[test]
    fn touching_spheres_do_not_overlap() {
        assert!(!spheres_overlap(Vec3::ZERO, 0.5, Vec3::X, 0.5));
        assert!(spheres_overlap(Vec3::ZERO, 0.5, Vec3::new(0.999, 0.0, 0.0), 0.5));
    }

    #[test]
    fn normal_falls_back_when_centers_coincide() {
        let body = moving(Vec3::new(0.0, 0.0, 3.0), Vec3::new(0.2, 0.0, 0.0));
        assert!(contact_normal(Vec3::ONE, Vec3::ONE, &body).abs_diff_eq(Vec3::NEG_X, 1e-6));

        let body = moving(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO);
        assert!(contact_normal(Vec3::ONE, Vec3::ONE, &body).abs_diff_eq(Vec3::NEG_Z, 1e-6));

        assert_eq!(contact_normal(Vec3::ONE, Vec3::ONE, &PhysDyn::default()), Vec3::Y);
    }

    #[test]
    fn staging_doubles_and_reset_keeps_capacity() {
        let mut world = SphereWorld::new();
        for i in 0..9 {
            world.stage(Entity(i), Vec3::splat(i as f32), 0.1);
            assert!(world.capacity() >= world.len());
        }
        assert_eq!(world.phase(), CollisionPhase::Built);
        let capacity = world.capacity();
        assert!(capacity >= 9);

        world.post_tick();
        assert!(world.is_empty());
        assert_eq!(world.capacity(), capacity);
        assert_eq!(world.phase(), CollisionPhase::Empty);
    }

    #[test]
    fn resolve_skips_own_entry() {
        let mut world = SphereWorld::new();
        world.stage(Entity(0), Vec3::ZERO, 0.1);
        let mut body = moving(Vec3::X, Vec3::new(0.01, 0.0, 0.0));
        assert_eq!(world.resolve(Entity(0), Vec3::ZERO, 0.1, &mut body, &Backout::default()), None);
        assert_eq!(body.vel, Vec3::X);
    }

    #[test]
    fn head_on_contact_reflects_and_backs_out() {
        let mut world = SphereWorld::new();
        world.stage(Entity(0), Vec3::new(1.0, 0.0, 0.0), 0.5);
        world.stage(Entity(1), Vec3::ZERO, 0.5);

        // entity 1 moving +X into entity 0
        let mut body = moving(Vec3::new(6.0, 0.0, 0.0), Vec3::new(0.1, 0.0, 0.0));
        let contact = world
            .resolve(Entity(1), Vec3::ZERO, 0.5, &mut body, &Backout::default())
            .unwrap();

        assert_eq!(contact.other, Entity(0));
        assert!(contact.normal.abs_diff_eq(Vec3::NEG_X, 1e-6));
        assert!(body.vel.abs_diff_eq(Vec3::new(-6.0, 0.0, 0.0), 1e-5));
        assert!(body.d_pos.x < 0.0);
        assert!(!spheres_overlap(body.d_pos, 0.5, Vec3::X, 0.5));
        assert!(!contact.exhausted);
    }

    #[test]
    fn exhausted_backout_is_bounded_and_counted() {
        let mut world = SphereWorld::new();
        world.stage(Entity(0), Vec3::ZERO, 10.0);

        // deep inside a much larger sphere, predicted onto its center
        let mut body = moving(Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, -1e-3, 0.0));
        let pos = Vec3::new(0.0, 0.001, 0.0);
        let backout = Backout { factor: 0.5, min_step: 1e-6, max_iterations: 4 };
        let contact = world.resolve(Entity(1), pos, 1.0, &mut body, &backout).unwrap();

        assert!(contact.exhausted);
        assert_eq!(contact.iterations, 4);
        assert!(body.vel.dot(contact.normal) >= 0.0);
        assert!(body.vel.is_finite() && body.d_pos.is_finite());

        world.post_tick();
        assert_eq!(world.last_tick(), CollisionStats { contacts: 1, exhausted_backouts: 1 });
        assert_eq!(world.total().exhausted_backouts, 1);
    }
}
