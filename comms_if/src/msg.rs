//! # Bus Messages
//!
//! Everything that crosses the bus between the planner, the tracker, the
//! localisation/mapping providers and the vehicle actuation layer.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A point in the map frame.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2D {
    pub x: f64,
    pub y: f64
}

/// A planar pose, `theta` being the heading in radians.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose2D {
    pub x: f64,
    pub y: f64,
    pub theta: f64
}

/// Planar velocities, `x` and `y` in m/s and the yaw rate `w` in rad/s.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Twist2D {
    pub x: f64,
    pub y: f64,
    pub w: f64
}

/// Goal waypoints in traversal order. A new message replaces the previous list.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Goals {
    pub points: Vec<Point2D>
}

/// An occupancy grid.
///
/// Cells are stored row-major, the value of cell `(ix, iy)` being
/// `data[iy * width + ix]`. Values follow the usual convention of -1 for
/// unknown, 0 for free and up to 100 for occupied.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct OccupancyGridMsg {
    pub width: usize,
    pub height: usize,

    /// Size of one cell in meters
    pub resolution_m: f64,

    /// Position of cell `(0, 0)`'s corner in the map frame
    pub origin: Point2D,

    pub data: Vec<i8>
}

/// Pose and twist of the vehicle.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct State2D {
    pub pose: Pose2D,
    pub twist: Twist2D
}

/// The reference path as consumed by the tracker.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Path2D {
    pub poses: Vec<Pose2D>
}

/// Target velocity set by the planner.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct TargetVelocity {
    pub speed_ms: f64
}

/// Command sent to the actuation layer.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct AckermannDrive {
    /// Forward speed in m/s
    pub speed: f64,

    /// Acceleration in m/s^2
    pub acceleration: f64,

    /// Jerk in m/s^3
    pub jerk: f64,

    /// Steering angle in radians, positive left
    pub steering_angle: f64,

    /// Steering rate in rad/s
    pub steering_angle_velocity: f64
}

/// A 3D pose with its frame, sequence number and timestamp.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PoseStamped {
    pub frame_id: String,
    pub seq: u64,

    /// Seconds since the session epoch
    pub stamp_s: f64,

    pub position: [f64; 3],

    /// Unit quaternion as `[i, j, k, w]`
    pub orientation: [f64; 4]
}

/// Visualisation projection of a path.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct VizPath {
    pub frame_id: String,
    pub stamp_s: f64,
    pub poses: Vec<PoseStamped>
}

/// Status of the tracker after a control cycle.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackerStatus {
    pub target_index: usize,
    pub path_len: usize,
    pub crosstrack_error_m: f64,
    pub heading_error_rad: f64,
    pub yawrate_error_rads: f64,

    /// True when the steering demand was clamped or could not be computed
    pub steering_limited: bool
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Status of the planner after a planning cycle.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum PlannerStatus {
    /// No collision along the path
    Clear,

    /// An obstruction was found and the path rerouted around it
    Avoiding {
        opening_width_m: f64,
        opening_dist_m: f64
    },

    /// The opening is narrower than the vehicle, the vehicle is commanded to
    /// stop while the best-effort detour is still published
    Blocked {
        opening_width_m: f64
    },

    /// The obstruction is too close to either end of the path to reroute,
    /// the previous safe path is kept and the vehicle commanded to stop
    RerouteRejected,

    /// The planning cycle was skipped for lack of inputs
    Stalled
}

impl Default for PlannerStatus {
    fn default() -> Self {
        PlannerStatus::Stalled
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_planner_status_json() {
        let s = serde_json::to_string(&PlannerStatus::Blocked { opening_width_m: 1.5 }).unwrap();
        assert_eq!(s, r#"{"Blocked":{"opening_width_m":1.5}}"#);

        let s: PlannerStatus = serde_json::from_str(r#""Clear""#).unwrap();
        assert_eq!(s, PlannerStatus::Clear);
    }
}
