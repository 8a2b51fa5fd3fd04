//! Trajectory tracker scenarios, driven through the public library interface.

use nav_lib::{
    geom::{generate_cubic_path, Path},
    sim::KinematicBicycle,
    tracker::{
        controller::stanley, Params, PathTracker, TrackerShared, TrackingErrors, VehicleState,
        YawConvention,
    },
};
use util::module::State;

// ---------------------------------------------------------------------------
// HELPERS
// ---------------------------------------------------------------------------

const STEERING_LIMIT_RAD: f64 = 0.5;

fn params() -> Params {
    Params {
        update_frequency_hz: 20.0,
        frame_id: "map".into(),
        control_gain: 1.0,
        softening_gain: 1.0,
        yawrate_gain: 0.0,
        steering_limit_rad: STEERING_LIMIT_RAD,
        cg_to_front_axle_m: 1.0,
        yaw_convention: YawConvention::East,
        monotonic_target_index: false,
        report_period_cycles: 10,
    }
}

fn straight_path(length_m: f64) -> Path {
    generate_cubic_path(&[0.0, length_m / 2.0, length_m], &[0.0, 0.0, 0.0], 0.1).unwrap()
}

fn tracker_with(params: Params, path: Path, state: VehicleState) -> (PathTracker, TrackerShared) {
    let mut tracker = PathTracker::new();
    tracker.init(params.clone()).unwrap();

    let shared = TrackerShared::new(params);
    shared.install_path(path).unwrap();
    shared.set_target_velocity(5.0).unwrap();
    shared.update_vehicle_state(state).unwrap();

    (tracker, shared)
}

fn at(x: f64, y: f64, yaw: f64) -> VehicleState {
    VehicleState {
        x,
        y,
        yaw,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// SCENARIOS
// ---------------------------------------------------------------------------

#[test]
fn on_path_gives_no_steering() {
    let (mut tracker, shared) = tracker_with(params(), straight_path(20.0), at(0.0, 0.0, 0.0));

    let (out, status) = tracker.proc(&shared).unwrap();

    assert_eq!(status.target_index, 10);
    assert!(status.crosstrack_error_m.abs() < 1e-9);
    assert!(status.heading_error_rad.abs() < 1e-9);
    assert!(out.command.steering_angle.abs() < 1e-9);
    assert_eq!(out.command.speed, 5.0);
    assert!(!status.steering_limited);
}

#[test]
fn left_of_path_steers_right() {
    let (mut tracker, shared) = tracker_with(params(), straight_path(20.0), at(0.0, 1.0, 0.0));

    let (out, status) = tracker.proc(&shared).unwrap();

    // The path is 1 m to the vehicle's right
    assert!((status.crosstrack_error_m + 1.0).abs() < 1e-9);
    assert!(status.heading_error_rad.abs() < 1e-9);

    let expected = (-1.0f64).atan2(1.0 + 5.0);
    assert!((out.command.steering_angle - expected).abs() < 1e-9);
    assert!(out.command.steering_angle < 0.0);
    assert!(out.command.steering_angle.abs() <= STEERING_LIMIT_RAD);
}

#[test]
fn north_yaw_convention() {
    let mut p = params();
    p.yaw_convention = YawConvention::North;

    // Facing +X is a yaw of -pi/2 from +Y
    let (mut tracker, shared) = tracker_with(
        p,
        straight_path(20.0),
        at(0.0, 0.0, -std::f64::consts::FRAC_PI_2),
    );

    let (out, status) = tracker.proc(&shared).unwrap();
    assert_eq!(status.target_index, 10);
    assert!(status.heading_error_rad.abs() < 1e-9);
    assert!(out.command.steering_angle.abs() < 1e-9);
}

// ---------------------------------------------------------------------------
// PROPERTIES
// ---------------------------------------------------------------------------

#[test]
fn steering_always_within_limits() {
    let p = params();
    let values = [-1e6, -10.0, -1.0, -0.1, 0.0, 0.1, 1.0, 10.0, 1e6];

    for &crosstrack_error_m in values.iter() {
        for &heading_error_rad in values.iter() {
            for &yawrate_error_rads in values.iter() {
                for &v in [0.0, 1.0, 5.0].iter() {
                    let errors = TrackingErrors {
                        target_index: 0,
                        crosstrack_error_m,
                        heading_error_rad,
                        yawrate_error_rads,
                    };

                    let mut p = p.clone();
                    p.yawrate_gain = 0.5;

                    let (steering, _) = stanley(&errors, v, &p);
                    assert!(steering.abs() <= STEERING_LIMIT_RAD);
                }
            }
        }
    }
}

#[test]
fn target_index_advances_while_driving_forward() {
    let path = straight_path(30.0);
    let start = at(0.0, 1.0, 0.0);
    let (mut tracker, shared) = tracker_with(params(), path, start);
    shared.set_target_velocity(2.0).unwrap();

    let mut vehicle = KinematicBicycle::new(start, 1.0);
    let mut last_index = 0;
    let mut last_error = 0.0;

    for _ in 0..150 {
        shared.update_vehicle_state(vehicle.state).unwrap();
        let (out, status) = tracker.proc(&shared).unwrap();

        assert!(status.target_index >= last_index);
        last_index = status.target_index;
        last_error = status.crosstrack_error_m;

        vehicle.step(out.command.speed, out.command.steering_angle, 0.05);
    }

    assert!(last_index > 100);
    assert!(last_error.abs() < 0.2, "crosstrack error {}", last_error);
}

#[test]
fn monotonic_index_ignores_backwards_moves() {
    let mut p = params();
    p.monotonic_target_index = true;

    let (mut tracker, shared) = tracker_with(p, straight_path(20.0), at(5.0, 0.0, 0.0));
    assert_eq!(tracker.proc(&shared).unwrap().1.target_index, 60);

    shared.update_vehicle_state(at(1.0, 0.0, 0.0)).unwrap();
    assert_eq!(tracker.proc(&shared).unwrap().1.target_index, 60);
}
