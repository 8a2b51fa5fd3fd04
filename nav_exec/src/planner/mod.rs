//! # Path planner module
//!
//! The planner turns the goal waypoints into a dense reference path, checks that path against
//! the occupancy grid and, when something is in the way, reroutes around it.
//!
//! Collision checking sweeps a line the width of the vehicle perpendicular to every path sample
//! (except those near either end of the path). When samples collide the obstruction is taken
//! from the first to the last colliding sample, a lateral window is scanned at the start of the
//! obstruction to find the widest gap, and a short detour is fitted through six control points
//! and spliced into the path in place of the obstructed section. If the gap is narrower than the
//! vehicle the detour is still published but the target velocity is set to zero.
//!
//! All sample counts below are in path samples, i.e. multiples of the path step (0.1 m).

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod collision;
mod inputs;
mod params;
pub mod reroute;
mod state;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use collision::{Obstruction, ObstructionPolicy, Opening};
pub use inputs::{PlannerInputs, PlannerSnapshot};
pub use params::Params;
pub use state::{PathPlanner, PlannerOutput, Verdict};

use crate::geom::{PathError, SplineError};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Samples at each end of the path which are not collision checked, leaving room for the
/// reroute control points.
pub const SCAN_MARGIN_SAMPLES: usize = 150;

/// Offset of the first departure control point before the obstruction.
pub const DEPARTURE_FAR_SAMPLES: usize = 150;

/// Offset of the second departure control point before the obstruction.
pub const DEPARTURE_NEAR_SAMPLES: usize = 75;

/// Offset of the first rejoin control point after the obstruction.
pub const REJOIN_NEAR_SAMPLES: usize = 75;

/// Offset of the second rejoin control point after the obstruction.
pub const REJOIN_FAR_SAMPLES: usize = 150;

/// Samples removed either side of the obstruction when splicing in the detour.
pub const SPLICE_MARGIN_SAMPLES: usize = 151;

/// Half width of the lateral window searched for an opening.
pub const OPENING_WINDOW_HALF_WIDTH_M: f64 = 10.0;

/// Spacing of the samples in the opening window.
pub const OPENING_WINDOW_STEP_M: f64 = 0.1;

/// Number of samples in the opening window, `2 * 10.0 / 0.1`.
pub const OPENING_WINDOW_SAMPLES: usize = 200;

/// Index of the window sample lying on the path.
pub const OPENING_WINDOW_CENTRE: usize = OPENING_WINDOW_SAMPLES / 2;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during planning.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PlannerError {
    #[error("The planner has not been initialised")]
    NotInit,

    #[error("At least 2 waypoints are needed to plan a path, got {0}")]
    NotEnoughWaypoints(usize),

    #[error("No occupancy grid has been received")]
    NoGrid,

    #[error("Could not interpolate the path: {0}")]
    SplineError(SplineError),

    #[error("Could not splice the detour into the path: {0}")]
    PathError(#[from] PathError),

    #[error(
        "Obstruction from sample {first} to {last} is too close to the ends of the \
        {len} sample path to reroute"
    )]
    RerouteOutOfBounds {
        first: usize,
        last: usize,
        len: usize
    },

    #[error("The planner inputs lock was poisoned")]
    PoisonError,
}

impl From<SplineError> for PlannerError {
    fn from(e: SplineError) -> Self {
        match e {
            SplineError::NotEnoughPoints(n) => PlannerError::NotEnoughWaypoints(n),
            e => PlannerError::SplineError(e)
        }
    }
}
