//! Stanley control law
//!
//! Free functions computing the tracking errors against a reference path and the steering
//! command from those errors. Angles relative to the path are always measured from +X, the
//! vehicle yaw is converted using the configured [`YawConvention`](super::YawConvention).

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Serialize;

use super::{Params, YAWRATE_WINDOW_SAMPLES};
use crate::geom::Path;
use comms_if::msg::State2D;
use util::maths::{clamp, normalise_angle};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Planar vehicle state as used by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VehicleState {
    /// Position of the vehicle reference point (rear axle)
    pub x: f64,
    pub y: f64,

    /// Yaw in the configured convention
    pub yaw: f64,

    pub speed_ms: f64,
    pub yawrate_rads: f64,
}

/// Errors between the vehicle and the path at the target point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TrackingErrors {
    /// Index of the path sample closest to the front axle
    pub target_index: usize,

    /// Lateral offset of the target point, positive when the path is to the vehicle's left
    pub crosstrack_error_m: f64,

    pub heading_error_rad: f64,

    /// Desired yaw rate along the path minus the measured yaw rate
    pub yawrate_error_rads: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VehicleState {
    pub fn from_msg(msg: &State2D) -> Self {
        Self {
            x: msg.pose.x,
            y: msg.pose.y,
            yaw: msg.pose.theta,
            speed_ms: msg.twist.x.hypot(msg.twist.y),
            yawrate_rads: msg.twist.w,
        }
    }

    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Vehicle heading measured from +X.
pub fn heading_rad(state: &VehicleState, params: &Params) -> f64 {
    state.yaw + params.yaw_convention.offset_rad()
}

/// Project the vehicle position forward to the front axle.
pub fn front_axle(state: &VehicleState, params: &Params) -> Vector2<f64> {
    let psi = heading_rad(state, params);
    state.position() + params.cg_to_front_axle_m * Vector2::new(psi.cos(), psi.sin())
}

/// Index of the path sample closest to `point`, searching from `from` onwards.
///
/// Ties go to the lowest index. Returns `None` if there are no samples at or after `from`.
pub fn nearest_index(path: &Path, point: &Vector2<f64>, from: usize) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;

    for (i, (x, y, _)) in path.iter().enumerate().skip(from) {
        let d = (Vector2::new(x, y) - point).norm();

        match best {
            Some((_, best_d)) if d >= best_d => (),
            _ => best = Some((i, d)),
        }
    }

    best.map(|(i, _)| i)
}

/// Signed lateral offset of the target sample from the front axle.
pub fn crosstrack_error(target: &Vector2<f64>, front: &Vector2<f64>, heading_rad: f64) -> f64 {
    let left_normal = Vector2::new(-heading_rad.sin(), heading_rad.cos());
    (target - front).dot(&left_normal)
}

/// Path heading at the target minus the vehicle heading, wrapped into `(-pi, pi]`.
pub fn heading_error(path_yaw_rad: f64, heading_rad: f64) -> f64 {
    normalise_angle(path_yaw_rad - heading_rad)
}

/// Yaw rate needed to follow the path curvature around `index` at `speed_ms`.
///
/// The curvature is the summed heading change over the summed arc length of the segments
/// within [`YAWRATE_WINDOW_SAMPLES`] of the index.
pub fn desired_yawrate(path: &Path, index: usize, speed_ms: f64) -> f64 {
    let first = index.saturating_sub(YAWRATE_WINDOW_SAMPLES);
    let last = index + YAWRATE_WINDOW_SAMPLES;

    let mut dyaw = 0.0;
    let mut ds = 0.0;

    for n in first..=last {
        if n + 1 >= path.len() {
            break;
        }

        if let (Some(a), Some(b), Some(step)) = (path.yaw(n), path.yaw(n + 1), path.step_length(n))
        {
            dyaw += normalise_angle(b - a);
            ds += step;
        }
    }

    if ds > 0.0 {
        dyaw / ds * speed_ms
    }
    else {
        0.0
    }
}

/// Compute all tracking errors for the vehicle against the path.
///
/// The target is searched for from `from`, which is 0 unless the target index is monotonic.
/// Returns `None` for an empty path.
pub fn compute_errors(
    path: &Path,
    state: &VehicleState,
    params: &Params,
    from: usize,
) -> Option<TrackingErrors> {
    let front = front_axle(state, params);
    let psi = heading_rad(state, params);

    // A monotonic search can run off the end of a replaced path, fall back to a full search
    let target_index = nearest_index(path, &front, from).or_else(|| nearest_index(path, &front, 0))?;

    let target = path.point(target_index)?;
    let path_yaw = path.yaw(target_index)?;

    Some(TrackingErrors {
        target_index,
        crosstrack_error_m: crosstrack_error(&target, &front, psi),
        heading_error_rad: heading_error(path_yaw, psi),
        yawrate_error_rads: desired_yawrate(path, target_index, state.speed_ms)
            - state.yawrate_rads,
    })
}

/// Stanley steering command.
///
/// Returns the clamped steering angle and whether the limit was applied. A non-finite result
/// gives zero steering and is reported as limited.
pub fn stanley(errors: &TrackingErrors, target_velocity_ms: f64, params: &Params) -> (f64, bool) {
    let crosstrack_term = (params.control_gain * errors.crosstrack_error_m)
        .atan2(params.softening_gain + target_velocity_ms);

    let steering = crosstrack_term
        + errors.heading_error_rad
        + params.yawrate_gain * errors.yawrate_error_rads;

    if !steering.is_finite() {
        return (0.0, true);
    }

    let limit = params.steering_limit_rad;
    let clamped = clamp(steering, -limit, limit);

    (clamped, clamped != steering)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::tracker::YawConvention;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn params() -> Params {
        Params {
            update_frequency_hz: 20.0,
            frame_id: "map".into(),
            control_gain: 1.0,
            softening_gain: 1.0,
            yawrate_gain: 0.0,
            steering_limit_rad: 0.5,
            cg_to_front_axle_m: 1.0,
            yaw_convention: YawConvention::East,
            monotonic_target_index: false,
            report_period_cycles: 10,
        }
    }

    fn straight(n: usize) -> Path {
        let x = (0..n).map(|i| i as f64 * 0.1).collect();
        Path::new(x, vec![0.0; n], vec![0.0; n]).unwrap()
    }

    fn state(x: f64, y: f64, yaw: f64) -> VehicleState {
        VehicleState {
            x,
            y,
            yaw,
            ..Default::default()
        }
    }

    #[test]
    fn test_front_axle() {
        let p = params();
        let f = front_axle(&state(1.0, 2.0, FRAC_PI_2), &p);
        assert!((f - Vector2::new(1.0, 3.0)).norm() < 1e-12);

        let mut p = params();
        p.yaw_convention = YawConvention::North;
        let f = front_axle(&state(1.0, 2.0, 0.0), &p);
        assert!((f - Vector2::new(1.0, 3.0)).norm() < 1e-12);
    }

    #[test]
    fn test_nearest_index() {
        let path = straight(100);
        assert_eq!(nearest_index(&path, &Vector2::new(2.02, 1.0), 0), Some(20));
        assert_eq!(nearest_index(&path, &Vector2::new(2.02, 1.0), 50), Some(50));
        assert_eq!(nearest_index(&path, &Vector2::new(2.02, 1.0), 100), None);
        assert_eq!(nearest_index(&Path::new_empty(), &Vector2::zeros(), 0), None);

        // Equidistant samples resolve to the first
        let path = Path::new(vec![1.0, -1.0], vec![0.0, 0.0], vec![0.0, 0.0]).unwrap();
        assert_eq!(nearest_index(&path, &Vector2::zeros(), 0), Some(0));
    }

    #[test]
    fn test_crosstrack_sign() {
        let front = Vector2::new(0.0, 0.0);
        assert!((crosstrack_error(&Vector2::new(0.0, 1.0), &front, 0.0) - 1.0).abs() < 1e-12);
        assert!((crosstrack_error(&Vector2::new(0.0, -1.0), &front, 0.0) + 1.0).abs() < 1e-12);
        assert!(crosstrack_error(&Vector2::new(1.0, 0.0), &front, 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_heading_error_wraps() {
        assert!((heading_error(0.1, -0.1) - 0.2).abs() < 1e-12);
        assert!((heading_error(PI - 0.1, -PI + 0.1) + 0.2).abs() < 1e-12);
        assert!((heading_error(0.0, PI) - PI).abs() < 1e-12);
    }

    #[test]
    fn test_desired_yawrate() {
        assert_eq!(desired_yawrate(&straight(50), 10, 2.0), 0.0);

        // Arc of radius 5 m sampled every 0.02 rad
        let n = 40;
        let theta: Vec<f64> = (0..n).map(|i| i as f64 * 0.02).collect();
        let path = Path::new(
            theta.iter().map(|t| 5.0 * t.sin()).collect(),
            theta.iter().map(|t| 5.0 * (1.0 - t.cos())).collect(),
            theta.clone(),
        )
        .unwrap();

        // Yaw rate is v / R
        let r = desired_yawrate(&path, 20, 2.0);
        assert!((r - 0.4).abs() < 1e-3, "yaw rate {}", r);

        // Window clipped at both ends of the path
        assert!((desired_yawrate(&path, 0, 2.0) - 0.4).abs() < 1e-3);
        assert!((desired_yawrate(&path, n - 1, 2.0) - 0.4).abs() < 1e-3);
        assert_eq!(desired_yawrate(&Path::new_empty(), 0, 2.0), 0.0);
    }

    #[test]
    fn test_compute_errors_on_path() {
        let e = compute_errors(&straight(200), &state(0.0, 0.0, 0.0), &params(), 0).unwrap();
        assert_eq!(e.target_index, 10);
        assert!(e.crosstrack_error_m.abs() < 1e-9);
        assert!(e.heading_error_rad.abs() < 1e-12);
        assert!(compute_errors(&Path::new_empty(), &state(0.0, 0.0, 0.0), &params(), 0).is_none());
    }

    #[test]
    fn test_compute_errors_monotonic_fallback() {
        let e = compute_errors(&straight(20), &state(0.0, 0.0, 0.0), &params(), 50).unwrap();
        assert_eq!(e.target_index, 10);
    }

    #[test]
    fn test_stanley() {
        let p = params();

        let zero = TrackingErrors::default();
        assert_eq!(stanley(&zero, 5.0, &p), (0.0, false));

        let left = TrackingErrors {
            crosstrack_error_m: 1.0,
            ..Default::default()
        };
        let (steer, limited) = stanley(&left, 5.0, &p);
        assert!((steer - (1.0f64).atan2(6.0)).abs() < 1e-12);
        assert!(!limited);

        let big = TrackingErrors {
            heading_error_rad: 2.0,
            ..Default::default()
        };
        assert_eq!(stanley(&big, 5.0, &p), (0.5, true));

        let nan = TrackingErrors {
            crosstrack_error_m: std::f64::NAN,
            ..Default::default()
        };
        assert_eq!(stanley(&nan, 5.0, &p), (0.0, true));
    }

    #[test]
    fn test_stanley_yawrate_gain() {
        let mut p = params();
        let e = TrackingErrors {
            yawrate_error_rads: 0.2,
            ..Default::default()
        };
        assert_eq!(stanley(&e, 1.0, &p).0, 0.0);

        p.yawrate_gain = 1.0;
        assert!((stanley(&e, 1.0, &p).0 - 0.2).abs() < 1e-12);
    }
}
