//! # Tracker shared state
//!
//! Holder for everything the bus callbacks write and the control cycle reads. All fields sit
//! behind one lock so that a new vehicle state and the errors derived from it are always seen
//! together. The lock is never held while publishing.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{Mutex, MutexGuard};

use log::{debug, trace};

use super::{
    controller::{compute_errors, TrackingErrors, VehicleState},
    Params, TrackerError,
};
use crate::geom::Path;
use comms_if::msg::Pose2D;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Thread safe tracker state shared between the bus and the control cycle.
pub struct TrackerShared {
    params: Params,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    state: Option<VehicleState>,
    path: Option<Path>,
    target_velocity_ms: f64,
    errors: Option<TrackingErrors>,
}

/// Everything the control cycle needs, copied out under the lock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlInputs {
    pub errors: TrackingErrors,

    /// The path sample at the target index
    pub target_pose: Pose2D,

    pub target_velocity_ms: f64,

    pub path_len: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrackerShared {
    /// Create an empty holder. The target velocity is zero until one is received.
    pub fn new(params: Params) -> Self {
        Self {
            params,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Store a new vehicle state, recomputing the errors if a path is installed.
    pub fn update_vehicle_state(&self, state: VehicleState) -> Result<(), TrackerError> {
        let mut inner = self.lock()?;
        inner.state = Some(state);
        inner.derive_errors(&self.params);

        Ok(())
    }

    /// Replace the path being tracked.
    ///
    /// The target search restarts from the start of the new path. An empty path is rejected
    /// and the installed path is kept.
    pub fn install_path(&self, path: Path) -> Result<(), TrackerError> {
        if path.is_empty() {
            return Err(TrackerError::EmptyPath);
        }

        let mut inner = self.lock()?;

        trace!("Installing {} sample path", path.len());

        inner.path = Some(path);
        inner.errors = None;
        inner.derive_errors(&self.params);

        Ok(())
    }

    pub fn set_target_velocity(&self, speed_ms: f64) -> Result<(), TrackerError> {
        self.lock()?.target_velocity_ms = speed_ms;
        Ok(())
    }

    pub fn has_path(&self) -> bool {
        self.lock().map(|i| i.path.is_some()).unwrap_or(false)
    }

    pub fn has_state(&self) -> bool {
        self.lock().map(|i| i.state.is_some()).unwrap_or(false)
    }

    /// Copy out the latest errors and command inputs.
    pub fn snapshot_for_control(&self) -> Result<ControlInputs, TrackerError> {
        let inner = self.lock()?;

        let path = inner.path.as_ref().ok_or(TrackerError::NoPath)?;
        let errors = inner.errors.ok_or(TrackerError::NoState)?;

        let (x, y, theta) = path
            .iter()
            .nth(errors.target_index)
            .ok_or(TrackerError::NoPath)?;

        Ok(ControlInputs {
            errors,
            target_pose: Pose2D { x, y, theta },
            target_velocity_ms: inner.target_velocity_ms,
            path_len: path.len(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, TrackerError> {
        self.inner.lock().map_err(|_| TrackerError::PoisonError)
    }
}

impl Inner {
    /// Recompute the errors from the current state and path, if both are present.
    fn derive_errors(&mut self, params: &Params) {
        let (state, path) = match (&self.state, &self.path) {
            (Some(s), Some(p)) => (s, p),
            _ => return,
        };

        let from = match (params.monotonic_target_index, self.errors) {
            (true, Some(e)) => e.target_index,
            _ => 0,
        };

        self.errors = compute_errors(path, state, params, from);

        if let Some(e) = self.errors {
            debug!(
                "Target {}, crosstrack {:.3} m, heading {:.3} rad",
                e.target_index, e.crosstrack_error_m, e.heading_error_rad
            );
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::tracker::YawConvention;

    fn params(monotonic: bool) -> Params {
        Params {
            update_frequency_hz: 20.0,
            frame_id: "map".into(),
            control_gain: 1.0,
            softening_gain: 1.0,
            yawrate_gain: 0.0,
            steering_limit_rad: 0.5,
            cg_to_front_axle_m: 0.0,
            yaw_convention: YawConvention::East,
            monotonic_target_index: monotonic,
            report_period_cycles: 10,
        }
    }

    fn straight(n: usize) -> Path {
        let x = (0..n).map(|i| i as f64 * 0.1).collect();
        Path::new(x, vec![0.0; n], vec![0.0; n]).unwrap()
    }

    fn at(x: f64, y: f64) -> VehicleState {
        VehicleState {
            x,
            y,
            ..Default::default()
        }
    }

    #[test]
    fn test_needs_path_and_state() {
        let s = TrackerShared::new(params(false));
        assert_eq!(s.snapshot_for_control().unwrap_err(), TrackerError::NoPath);

        s.install_path(straight(10)).unwrap();
        assert_eq!(s.snapshot_for_control().unwrap_err(), TrackerError::NoState);

        s.update_vehicle_state(at(0.5, 0.2)).unwrap();
        let c = s.snapshot_for_control().unwrap();
        assert_eq!(c.errors.target_index, 5);
        assert_eq!(c.path_len, 10);
        assert!((c.errors.crosstrack_error_m + 0.2).abs() < 1e-12);
        assert_eq!(c.target_velocity_ms, 0.0);
    }

    #[test]
    fn test_state_before_path() {
        let s = TrackerShared::new(params(false));
        s.update_vehicle_state(at(0.3, 0.0)).unwrap();
        s.set_target_velocity(2.0).unwrap();
        s.install_path(straight(10)).unwrap();

        let c = s.snapshot_for_control().unwrap();
        assert_eq!(c.errors.target_index, 3);
        assert_eq!(c.target_velocity_ms, 2.0);
    }

    #[test]
    fn test_empty_path_rejected() {
        let s = TrackerShared::new(params(false));
        assert_eq!(s.install_path(Path::new_empty()).unwrap_err(), TrackerError::EmptyPath);
        assert!(!s.has_path());

        s.install_path(straight(10)).unwrap();
        assert_eq!(s.install_path(Path::new_empty()).unwrap_err(), TrackerError::EmptyPath);
        assert!(s.has_path());
    }

    #[test]
    fn test_monotonic_index() {
        let s = TrackerShared::new(params(true));
        s.install_path(straight(100)).unwrap();

        s.update_vehicle_state(at(5.0, 0.0)).unwrap();
        assert_eq!(s.snapshot_for_control().unwrap().errors.target_index, 50);

        // Moving backwards does not move the target back
        s.update_vehicle_state(at(2.0, 0.0)).unwrap();
        assert_eq!(s.snapshot_for_control().unwrap().errors.target_index, 50);

        // A new path restarts the search
        s.install_path(straight(100)).unwrap();
        assert_eq!(s.snapshot_for_control().unwrap().errors.target_index, 20);
    }

    #[test]
    fn test_non_monotonic_index() {
        let s = TrackerShared::new(params(false));
        s.install_path(straight(100)).unwrap();

        s.update_vehicle_state(at(5.0, 0.0)).unwrap();
        s.update_vehicle_state(at(2.0, 0.0)).unwrap();
        assert_eq!(s.snapshot_for_control().unwrap().errors.target_index, 20);
    }
}
