//! Trajectory tracker module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};

// Internal
use super::{
    controller::stanley, Params, TrackerError, TrackerShared, TrackingStats,
    NOMINAL_ACCELERATION_MSS,
};
use comms_if::msg::{AckermannDrive, PoseStamped, TrackerStatus};
use util::{
    archive::Archiver,
    maths::{heading_to_quaternion, quaternion_to_array},
    module::State,
    params::LoadError,
    session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Trajectory tracker module state
pub struct PathTracker {
    params: Option<Params>,

    mode: Mode,

    /// Sequence number of the next lateral reference
    seq: u64,

    stats: TrackingStats,
}

/// Output of one control cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerOutput {
    pub command: AckermannDrive,

    /// The target point on the path, for diagnostics
    pub lateral_ref: PoseStamped,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Tracker modes. There is no transition back to `Idle` once a path has been received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// No path yet, no commands are produced
    Idle,

    Tracking,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for PathTracker {
    fn default() -> Self {
        Self {
            params: None,
            mode: Mode::Idle,
            seq: 0,
            stats: TrackingStats::new(1),
        }
    }
}

impl State for PathTracker {
    type InitData = Params;
    type InitError = LoadError;

    type InputData = TrackerShared;
    type OutputData = TrackerOutput;
    type StatusReport = TrackerStatus;
    type ProcError = TrackerError;

    /// Initialise the tracker with its parameters.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        init_data.validate()?;

        self.stats = TrackingStats::new(init_data.report_period_cycles);
        self.params = Some(init_data);
        self.mode = Mode::Idle;
        self.seq = 0;

        Ok(())
    }

    /// Compute the steering command from the latest shared state.
    ///
    /// While idle this returns `TrackerError::NoPath`, and `TrackerError::NoState` until the
    /// first vehicle state arrives. Both mean no command should be sent this cycle.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let params = self.params.as_ref().ok_or(TrackerError::NotInit)?;

        // Copy out under the lock, which is released before anything is published
        let inputs = input_data.snapshot_for_control()?;

        if self.mode == Mode::Idle {
            info!("Path received, tracking started");
            self.mode = Mode::Tracking;
        }

        let (steering_rad, steering_limited) =
            stanley(&inputs.errors, inputs.target_velocity_ms, params);

        if steering_limited {
            debug!("Steering limited to {:.3} rad", steering_rad);
        }

        let command = AckermannDrive {
            speed: inputs.target_velocity_ms,
            acceleration: NOMINAL_ACCELERATION_MSS,
            jerk: 0.0,
            steering_angle: steering_rad,
            steering_angle_velocity: 0.0,
        };

        let stamp_s = session::try_get_elapsed_seconds().unwrap_or(0.0);

        let lateral_ref = PoseStamped {
            frame_id: params.frame_id.clone(),
            seq: self.seq,
            stamp_s,
            position: [inputs.target_pose.x, inputs.target_pose.y, 0.0],
            orientation: quaternion_to_array(&heading_to_quaternion(inputs.target_pose.theta)),
        };
        self.seq += 1;

        let status = TrackerStatus {
            target_index: inputs.errors.target_index,
            path_len: inputs.path_len,
            crosstrack_error_m: inputs.errors.crosstrack_error_m,
            heading_error_rad: inputs.errors.heading_error_rad,
            yawrate_error_rads: inputs.errors.yawrate_error_rads,
            steering_limited,
        };

        self.stats.record(stamp_s, &status, steering_rad);

        Ok((TrackerOutput { command, lateral_ref }, status))
    }
}

impl PathTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Archive tracking statistics samples to the given archiver.
    pub fn set_archiver(&mut self, archiver: Archiver) {
        self.stats.set_archiver(archiver);
    }

    pub fn stats(&self) -> &TrackingStats {
        &self.stats
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
