//! # Physics
//!
//! Point and sphere physics expressed as ECS systems.
//!
//! ## Pipeline
//!
//! Per tick, for every dynamic entity:
//!
//! 1. `phys_gravity`, `phys_drag` accumulate force;
//! 2. `phys_integrate` turns force into velocity and a staged displacement
//!    `d_pos` (semi-implicit Euler), then clears the force;
//! 3. `phys_wall_col` reflects bodies whose predicted position leaves the box;
//! 4. `phys_sphere_build` stages every collidable sphere at its current
//!    position, then `phys_sphere_resolve` corrects `d_pos` and velocity of
//!    bodies whose predicted sphere overlaps a staged one;
//! 5. `phys_commit` applies `pos += d_pos`.
//!
//! Ordering is not hard-coded: every step names its neighbours as
//! dependencies and the scheduler derives the order.
//!
//! ## Write discipline
//!
//! Position is written only by `phys_commit`. Every other step reads position
//! and stages its effect in `PhysDyn`.

pub mod components;
pub mod forces;
pub mod motion;
pub mod walls;
pub mod sphere;
pub mod install;
pub mod spawn;

use rayon::prelude::*;

use crate::engine::error::AccessError;
use crate::engine::storage::Component;
use crate::engine::systems::{BatchOutcome, SystemContext};
use crate::engine::types::ComponentID;


/// Gravity system name.
pub const GRAVITY: &str = "phys_gravity";
/// Drag system name.
pub const DRAG: &str = "phys_drag";
/// Integration system name.
pub const INTEGRATE: &str = "phys_integrate";
/// Wall collision system name.
pub const WALL_COLLISION: &str = "phys_wall_col";
/// Position commit system name.
pub const COMMIT: &str = "phys_commit";
/// Sphere staging system name.
pub const SPHERE_BUILD: &str = "phys_sphere_build";
/// Sphere resolution system name.
pub const SPHERE_RESOLVE: &str = "phys_sphere_resolve";

/// Applies `f` to the row of every matching entity in one column, on the
/// Rayon pool.
pub(crate) fn par_rows<T, F>(ctx: &mut SystemContext<'_>, column: ComponentID, f: F) -> Result<BatchOutcome, AccessError>
where
    T: Component,
    F: Fn(&mut T) + Send + Sync,
{
    let filter = ctx.filter();
    let signatures = ctx.signatures();
    let rows = &mut ctx.column_mut::<T>(column)?[..signatures.len()];

    let processed = rows
        .par_iter_mut()
        .zip(signatures.par_iter())
        .filter(|(_, signature)| signature.contains_all(&filter))
        .map(|(row, _)| {
            f(row);
            1u64
        })
        .sum::<u64>();
    Ok(BatchOutcome::Processed(processed))
}

/// Like [`par_rows`], with a second column borrowed read-only.
pub(crate) fn par_rows_with<R, W, F>(
    ctx: &mut SystemContext<'_>,
    read: ComponentID,
    write: ComponentID,
    f: F,
) -> Result<BatchOutcome, AccessError>
where
    R: Component,
    W: Component,
    F: Fn(&R, &mut W) + Send + Sync,
{
    let filter = ctx.filter();
    let signatures = ctx.signatures();
    let n = signatures.len();
    let (input, output) = ctx.stores_mut().read_write::<R, W>(read, write)?;

    let processed = output[..n]
        .par_iter_mut()
        .zip(input[..n].par_iter())
        .zip(signatures.par_iter())
        .filter(|(_, signature)| signature.contains_all(&filter))
        .map(|((out, inp), _)| {
            f(inp, out);
            1u64
        })
        .sum::<u64>();
    Ok(BatchOutcome::Processed(processed))
}
