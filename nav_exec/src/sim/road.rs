//! Road and goal generation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Deserialize;
use std::f64::consts::PI;

use crate::map::{GridError, OccupancyGrid, FREE, OCCUPIED};
use comms_if::msg::Point2D;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Free space left before the start and after the end of a straight road.
pub const STRAIGHT_ROAD_END_MARGIN_M: f64 = 5.0;

/// Width of the occupied verge either side of a straight road.
pub const STRAIGHT_ROAD_VERGE_M: f64 = 5.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Axis aligned occupied rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Band {
    pub min_m: [f64; 2],
    pub max_m: [f64; 2],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Band {
    pub fn min(&self) -> Vector2<f64> {
        Vector2::new(self.min_m[0], self.min_m[1])
    }

    pub fn max(&self) -> Vector2<f64> {
        Vector2::new(self.max_m[0], self.max_m[1])
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Goals on a circle centred on the origin, starting on +X and running anticlockwise.
///
/// The first point is repeated at the end to close the loop. A non-positive step gives no
/// goals.
pub fn circle_goals(radius_m: f64, angle_step_rad: f64) -> Vec<Point2D> {
    if !(angle_step_rad.is_finite() && angle_step_rad > 0.0) {
        return Vec::new();
    }

    let num_steps = (2.0 * PI / angle_step_rad).ceil() as usize;

    let mut goals: Vec<Point2D> = (0..num_steps)
        .map(|i| i as f64 * angle_step_rad)
        .filter(|theta| *theta < 2.0 * PI)
        .map(|theta| Point2D {
            x: radius_m * theta.cos(),
            y: radius_m * theta.sin(),
        })
        .collect();

    if let Some(first) = goals.first().copied() {
        goals.push(first);
    }

    goals
}

/// Grid with a free ring road centred on the origin and everything else occupied.
///
/// A cell is free when the distance from the origin to its centre lies within
/// `[inner_radius_m, inner_radius_m + road_width_m]`.
pub fn ring_road_grid(
    inner_radius_m: f64,
    road_width_m: f64,
    resolution_m: f64,
    origin_m: Vector2<f64>,
    width: usize,
    height: usize,
) -> Result<OccupancyGrid, GridError> {
    let mut grid = OccupancyGrid::new(width, height, resolution_m, origin_m)?;
    let outer_radius_m = inner_radius_m + road_width_m;

    grid.map_cells(|centre, _| {
        let r = centre.norm();
        if r >= inner_radius_m && r <= outer_radius_m {
            FREE
        }
        else {
            OCCUPIED
        }
    });

    Ok(grid)
}

/// Grid containing a straight road along +X from the origin.
///
/// The road is free for `|y| <= road_half_width_m`, with an occupied verge either side and
/// free space before the start and after the end. Any `obstacles` are then filled in.
pub fn straight_road_grid(
    length_m: f64,
    road_half_width_m: f64,
    resolution_m: f64,
    obstacles: &[Band],
) -> Result<OccupancyGrid, GridError> {
    let half_extent_m = road_half_width_m + STRAIGHT_ROAD_VERGE_M;
    let origin = Vector2::new(-STRAIGHT_ROAD_END_MARGIN_M, -half_extent_m);

    let width = ((length_m + 2.0 * STRAIGHT_ROAD_END_MARGIN_M) / resolution_m).ceil() as usize;
    let height = (2.0 * half_extent_m / resolution_m).ceil() as usize;

    let mut grid = OccupancyGrid::new(width, height, resolution_m, origin)?;

    grid.map_cells(|centre, _| {
        if centre.y.abs() > road_half_width_m {
            OCCUPIED
        }
        else {
            FREE
        }
    });

    for band in obstacles {
        grid.fill_rect(band.min(), band.max(), OCCUPIED);
    }

    Ok(grid)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
