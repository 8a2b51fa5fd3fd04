//! Kinematic bicycle model

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::tracker::VehicleState;
use comms_if::msg::{Pose2D, State2D, Twist2D};
use util::maths::normalise_angle;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Rear axle referenced kinematic bicycle, yaw measured from +X.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicBicycle {
    pub state: VehicleState,
    pub wheelbase_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl KinematicBicycle {
    pub fn new(state: VehicleState, wheelbase_m: f64) -> Self {
        Self { state, wheelbase_m }
    }

    /// Advance the model by `dt_s` with the given speed and steering angle.
    ///
    /// Speed is applied immediately, there is no longitudinal dynamics.
    pub fn step(&mut self, speed_ms: f64, steering_rad: f64, dt_s: f64) {
        let yawrate_rads = speed_ms / self.wheelbase_m * steering_rad.tan();

        self.state.x += speed_ms * self.state.yaw.cos() * dt_s;
        self.state.y += speed_ms * self.state.yaw.sin() * dt_s;
        self.state.yaw = normalise_angle(self.state.yaw + yawrate_rads * dt_s);
        self.state.speed_ms = speed_ms;
        self.state.yawrate_rads = yawrate_rads;
    }

    /// State message as published by a localiser, twist in the body frame.
    pub fn to_msg(&self) -> State2D {
        State2D {
            pose: Pose2D {
                x: self.state.x,
                y: self.state.y,
                theta: self.state.yaw,
            },
            twist: Twist2D {
                x: self.state.speed_ms,
                y: 0.0,
                w: self.state.yawrate_rads,
            },
        }
    }
}
