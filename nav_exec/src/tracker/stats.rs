//! Tracking statistics

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, warn};
use serde::Serialize;

use comms_if::msg::TrackerStatus;
use util::archive::Archiver;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Periodic sampling of the crosstrack error.
///
/// Every `period_cycles` calls to [`TrackingStats::record`] the current error is sampled,
/// logged and, if an archiver is attached, written to the archive.
pub struct TrackingStats {
    period_cycles: usize,
    cycles: usize,

    samples: usize,
    abs_crosstrack_sum_m: f64,
    max_abs_crosstrack_m: f64,

    archiver: Option<Archiver>,
}

/// One archived sample.
#[derive(Debug, Clone, Serialize)]
pub struct StatsRecord {
    pub time_s: f64,
    pub target_index: usize,
    pub path_len: usize,
    pub crosstrack_error_m: f64,
    pub heading_error_rad: f64,
    pub steering_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrackingStats {
    pub fn new(period_cycles: usize) -> Self {
        Self {
            period_cycles: period_cycles.max(1),
            cycles: 0,
            samples: 0,
            abs_crosstrack_sum_m: 0.0,
            max_abs_crosstrack_m: 0.0,
            archiver: None,
        }
    }

    pub fn set_archiver(&mut self, archiver: Archiver) {
        self.archiver = Some(archiver);
    }

    /// Record one control cycle.
    pub fn record(&mut self, time_s: f64, status: &TrackerStatus, steering_rad: f64) {
        self.cycles += 1;

        if self.cycles % self.period_cycles != 0 {
            return;
        }

        let abs_error = status.crosstrack_error_m.abs();
        self.samples += 1;
        self.abs_crosstrack_sum_m += abs_error;
        self.max_abs_crosstrack_m = self.max_abs_crosstrack_m.max(abs_error);

        info!(
            "Tracking sample {}: target {}/{}, crosstrack {:.3} m, heading {:.3} rad, \
            steering {:.3} rad",
            self.samples,
            status.target_index,
            status.path_len,
            status.crosstrack_error_m,
            status.heading_error_rad,
            steering_rad
        );

        if let Some(ref mut a) = self.archiver {
            let record = StatsRecord {
                time_s,
                target_index: status.target_index,
                path_len: status.path_len,
                crosstrack_error_m: status.crosstrack_error_m,
                heading_error_rad: status.heading_error_rad,
                steering_rad,
            };

            if let Err(e) = a.serialise(&record) {
                warn!("Could not archive tracking statistics: {}", e);
            }
        }
    }

    /// Number of samples taken so far.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Mean absolute crosstrack error over the samples, `None` before the first sample.
    pub fn mean_crosstrack_m(&self) -> Option<f64> {
        if self.samples == 0 {
            None
        }
        else {
            Some(self.abs_crosstrack_sum_m / self.samples as f64)
        }
    }

    pub fn max_crosstrack_m(&self) -> f64 {
        self.max_abs_crosstrack_m
    }

    /// Log the overall tracking performance.
    pub fn log_summary(&self) {
        match self.mean_crosstrack_m() {
            Some(mean) => info!(
                "Mean track error {:.3} m (max {:.3} m) over {} samples",
                mean, self.max_abs_crosstrack_m, self.samples
            ),
            None => info!("No tracking samples were taken"),
        }
    }
}
