//! # Collision checking
//!
//! Swath scan of a path against the occupancy grid and the lateral opening search used to
//! decide where to reroute.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// Internal
use super::{
    OPENING_WINDOW_CENTRE, OPENING_WINDOW_HALF_WIDTH_M, OPENING_WINDOW_SAMPLES,
    OPENING_WINDOW_STEP_M, SCAN_MARGIN_SAMPLES,
};
use crate::geom::Path;
use crate::map::OccupancyGrid;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Range of path samples, inclusive of both ends, to be avoided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Obstruction {
    pub first: usize,
    pub last: usize,
}

/// The widest gap found in an opening window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Opening {
    /// Number of free samples in the gap
    pub width_samples: usize,

    /// Window index of the middle of the gap
    pub index: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How colliding samples are grouped into a single obstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstructionPolicy {
    /// From the first to the last colliding sample, gaps included. Disjoint obstacles are
    /// treated as one.
    Span,

    /// The first contiguous run of colliding samples only. The rerouted path is scanned again
    /// beyond the detour and each later run is rerouted in turn.
    FirstRun,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ObstructionPolicy {
    fn default() -> Self {
        ObstructionPolicy::Span
    }
}

impl ObstructionPolicy {
    /// Group ascending colliding sample indices into the obstruction to avoid.
    pub fn obstruction(&self, collisions: &[usize]) -> Option<Obstruction> {
        let first = *collisions.first()?;

        let last = match self {
            ObstructionPolicy::Span => *collisions.last()?,
            ObstructionPolicy::FirstRun => {
                let mut last = first;
                for &c in collisions.iter().skip(1) {
                    if c != last + 1 {
                        break;
                    }
                    last = c;
                }
                last
            }
        };

        Some(Obstruction { first, last })
    }
}

impl Opening {
    pub fn width_m(&self) -> f64 {
        self.width_samples as f64 * OPENING_WINDOW_STEP_M
    }

    /// Lateral offset of the middle of the gap from the path, positive to the right.
    pub fn dist_m(&self) -> f64 {
        (self.index as f64 - OPENING_WINDOW_CENTRE as f64) * OPENING_WINDOW_STEP_M
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Number of contiguous runs in ascending colliding sample indices.
pub fn count_runs(collisions: &[usize]) -> usize {
    match collisions.is_empty() {
        true => 0,
        false => 1 + collisions.windows(2).filter(|w| w[1] != w[0] + 1).count(),
    }
}

/// Unit vector pointing to the right of a heading.
pub fn right_normal(yaw: f64) -> Vector2<f64> {
    let a = yaw - std::f64::consts::FRAC_PI_2;
    Vector2::new(a.cos(), a.sin())
}

/// Lateral offsets swept at each sample, `-h, -h + res, ...` strictly below `h`.
pub fn swath_offsets(half_width_m: f64, resolution_m: f64) -> Vec<f64> {
    let mut offsets = Vec::new();

    if !(resolution_m > 0.0) || !(half_width_m > 0.0) {
        return offsets;
    }

    let mut k = 0usize;
    loop {
        let o = -half_width_m + k as f64 * resolution_m;
        if o >= half_width_m {
            break;
        }
        offsets.push(o);
        k += 1;
    }

    offsets
}

/// Find the indices of the path samples whose swath overlaps an occupied cell.
///
/// Samples within [`SCAN_MARGIN_SAMPLES`] of either end are not checked, and nothing is
/// checked against an empty grid. Swath points outside the grid do not collide. The returned
/// indices are in ascending order.
pub fn scan_swath(path: &Path, grid: &OccupancyGrid, half_width_m: f64) -> Vec<usize> {
    let mut collisions = Vec::new();

    if grid.is_empty() || path.len() < 2 * SCAN_MARGIN_SAMPLES {
        return collisions;
    }

    let offsets = swath_offsets(half_width_m, grid.resolution_m());

    for n in SCAN_MARGIN_SAMPLES..(path.len() - SCAN_MARGIN_SAMPLES) {
        let (p, yaw) = match (path.point(n), path.yaw(n)) {
            (Some(p), Some(yaw)) => (p, yaw),
            _ => break,
        };
        let normal = right_normal(yaw);

        let hit = offsets
            .iter()
            .any(|o| grid.occupied_at(&(p + *o * normal)).unwrap_or(false));

        if hit {
            collisions.push(n);
        }
    }

    collisions
}

/// Sample the grid along a line perpendicular to the path at `index`.
///
/// Sample `k` lies `-10.0 + 0.1 k` meters to the right of the path. Samples outside the grid are
/// `None`. If `index` is not on the path the window is all `None`.
pub fn opening_window(path: &Path, grid: &OccupancyGrid, index: usize) -> Vec<Option<i8>> {
    let (p, yaw) = match (path.point(index), path.yaw(index)) {
        (Some(p), Some(yaw)) => (p, yaw),
        _ => return vec![None; OPENING_WINDOW_SAMPLES],
    };
    let normal = right_normal(yaw);

    (0..OPENING_WINDOW_SAMPLES)
        .map(|k| {
            let o = -OPENING_WINDOW_HALF_WIDTH_M + k as f64 * OPENING_WINDOW_STEP_M;
            grid.get_position(&(p + o * normal)).ok()
        })
        .collect()
}

/// Find the longest run of free samples in a window.
///
/// Unknown (`None`) and occupied samples block. The first of equally long runs is chosen. The
/// opening index is `start + len / 2`, so for an even length run it is the upper of the two
/// middle samples. With no free samples the opening has zero width and sits in the centre of the
/// window.
pub fn find_opening(window: &[Option<i8>]) -> Opening {
    let mut best: Option<(usize, usize)> = None;
    let mut run_start: Option<usize> = None;

    let close_run = |start: usize, end: usize, best: &mut Option<(usize, usize)>| {
        let len = end - start;
        let longer = match *best {
            Some((_, l)) => len > l,
            None => true,
        };
        if longer {
            *best = Some((start, len));
        }
    };

    for (i, v) in window.iter().enumerate() {
        let free = match v {
            Some(v) => !OccupancyGrid::is_occupied(*v),
            None => false,
        };

        match (free, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(s)) => {
                close_run(s, i, &mut best);
                run_start = None;
            }
            _ => (),
        }
    }

    if let Some(s) = run_start {
        close_run(s, window.len(), &mut best);
    }

    match best {
        Some((start, len)) => Opening {
            width_samples: len,
            index: start + len / 2,
        },
        None => Opening {
            width_samples: 0,
            index: window.len() / 2,
        },
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
