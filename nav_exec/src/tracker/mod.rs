//! # Trajectory tracker module
//!
//! The tracker steers the vehicle onto the latest reference path using the Stanley control law.
//! Each cycle the vehicle pose is projected forward to the front axle, the closest path sample
//! becomes the target point, and the steering angle is built from the crosstrack error to that
//! point, the heading error relative to the path, and an optional yaw rate term.
//!
//! Bus callbacks and the control cycle share a single [`TrackerShared`] holder. The errors are
//! derived under the same lock that stores a new vehicle state, so the control cycle never sees
//! errors computed from a half updated state.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controller;
mod params;
mod shared;
mod state;
mod stats;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use controller::{TrackingErrors, VehicleState};
pub use params::{Params, YawConvention};
pub use shared::{ControlInputs, TrackerShared};
pub use state::{Mode, PathTracker, TrackerOutput};
pub use stats::{StatsRecord, TrackingStats};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Acceleration sent with every command. There is no longitudinal control.
pub const NOMINAL_ACCELERATION_MSS: f64 = 1.0;

/// Samples either side of the target used to estimate the path yaw rate.
pub const YAWRATE_WINDOW_SAMPLES: usize = 2;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during tracking.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TrackerError {
    #[error("The tracker has not been initialised")]
    NotInit,

    #[error("Attempted to install an empty path")]
    EmptyPath,

    #[error("No path has been received yet")]
    NoPath,

    #[error("No vehicle state has been received yet")]
    NoState,

    #[error("The tracker state lock is poisoned")]
    PoisonError,
}
