//! Trajectory tracker parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use util::params::{require_non_negative, require_positive, LoadError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the trajectory tracker
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Rate of the control cycle
    pub update_frequency_hz: f64,

    /// Frame the lateral reference point is expressed in
    pub frame_id: String,

    /// Crosstrack gain, `k`
    pub control_gain: f64,

    /// Softening gain added to the velocity in the crosstrack term, `k_soft`
    pub softening_gain: f64,

    /// Yaw rate error gain, `k_yaw`. Zero disables the term.
    pub yawrate_gain: f64,

    /// Symmetric limit on the steering command
    pub steering_limit_rad: f64,

    /// Distance from the reported vehicle position to the front axle
    pub cg_to_front_axle_m: f64,

    /// Axis the vehicle yaw is measured from
    pub yaw_convention: YawConvention,

    /// Only search forwards from the previous target index
    #[serde(default)]
    pub monotonic_target_index: bool,

    /// Number of cycles between tracking statistics reports
    pub report_period_cycles: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Axis from which the reported vehicle yaw is measured.
///
/// Path headings are always measured from +X, so a `North` yaw is offset by a quarter turn
/// before it is compared against the path.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum YawConvention {
    /// Yaw measured anticlockwise from +X
    East,

    /// Yaw measured anticlockwise from +Y
    North,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl YawConvention {
    /// Offset added to the vehicle yaw to express it from +X.
    pub fn offset_rad(&self) -> f64 {
        match self {
            YawConvention::East => 0.0,
            YawConvention::North => std::f64::consts::FRAC_PI_2,
        }
    }
}

impl Params {
    /// Check the parameters are usable.
    pub fn validate(&self) -> Result<(), LoadError> {
        require_positive(self.update_frequency_hz, "update_frequency_hz")?;
        require_positive(self.control_gain, "control_gain")?;
        require_non_negative(self.softening_gain, "softening_gain")?;
        require_non_negative(self.yawrate_gain, "yawrate_gain")?;
        require_positive(self.steering_limit_rad, "steering_limit_rad")?;
        require_non_negative(self.cg_to_front_axle_m, "cg_to_front_axle_m")?;

        if self.report_period_cycles == 0 {
            return Err(LoadError::InvalidParam("report_period_cycles"));
        }

        if self.frame_id.is_empty() {
            return Err(LoadError::InvalidParam("frame_id"));
        }

        Ok(())
    }
}
