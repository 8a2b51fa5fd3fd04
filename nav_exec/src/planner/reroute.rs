//! # Reroute and splice
//!
//! Builds a detour around an obstruction and splices it into the path in place of the
//! obstructed section.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use nalgebra::Vector2;

use super::{
    collision::{right_normal, Obstruction},
    PlannerError, DEPARTURE_FAR_SAMPLES, DEPARTURE_NEAR_SAMPLES, REJOIN_FAR_SAMPLES,
    REJOIN_NEAR_SAMPLES, SPLICE_MARGIN_SAMPLES,
};
use crate::geom::{generate_cubic_path, Path};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// The six detour control points: two departing the path before the obstruction, two offset
/// laterally by `opening_dist_m` at each end of the obstruction, and two rejoining the path
/// after it.
///
/// The obstruction must leave [`SPLICE_MARGIN_SAMPLES`] of path either side of it.
pub fn control_points(
    path: &Path,
    obstruction: &Obstruction,
    opening_dist_m: f64,
) -> Result<[Vector2<f64>; 6], PlannerError> {
    let Obstruction { first, last } = *obstruction;
    let len = path.len();

    let out_of_bounds = || PlannerError::RerouteOutOfBounds { first, last, len };

    if first > last || first < SPLICE_MARGIN_SAMPLES || last + SPLICE_MARGIN_SAMPLES > len {
        return Err(out_of_bounds());
    }

    let on_path = |i: usize| path.point(i).ok_or_else(out_of_bounds);
    let offset = |i: usize| -> Result<Vector2<f64>, PlannerError> {
        let p = on_path(i)?;
        let yaw = path.yaw(i).ok_or_else(out_of_bounds)?;
        Ok(p + opening_dist_m * right_normal(yaw))
    };

    Ok([
        on_path(first - DEPARTURE_FAR_SAMPLES)?,
        on_path(first - DEPARTURE_NEAR_SAMPLES)?,
        offset(first)?,
        offset(last)?,
        on_path(last + REJOIN_NEAR_SAMPLES)?,
        on_path(last + REJOIN_FAR_SAMPLES)?,
    ])
}

/// Fit a detour through the control points and splice it into the path over
/// `[first - 151, last + 151)`.
pub fn reroute(
    path: &Path,
    obstruction: &Obstruction,
    opening_dist_m: f64,
    ds: f64,
) -> Result<Path, PlannerError> {
    let points = control_points(path, obstruction, opening_dist_m)?;

    let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.y).collect();

    let detour = generate_cubic_path(&xs, &ys, ds)?;

    debug!(
        "Detour of {} samples replaces samples {} to {}",
        detour.len(),
        obstruction.first - SPLICE_MARGIN_SAMPLES,
        obstruction.last + SPLICE_MARGIN_SAMPLES
    );

    Ok(path.splice(
        obstruction.first - SPLICE_MARGIN_SAMPLES,
        &detour,
        obstruction.last + SPLICE_MARGIN_SAMPLES,
    )?)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
