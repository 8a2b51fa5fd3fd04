//! Path planner parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use super::ObstructionPolicy;
use util::params::{require_positive, LoadError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the path planner
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Rate at which the path is replanned
    pub update_frequency_hz: f64,

    /// Frame the published paths are expressed in
    pub frame_id: String,

    /// Target velocity when the path is clear or can be avoided
    pub target_velocity_ms: f64,

    /// Half the width of the vehicle, the swath checked for collisions is twice this wide
    pub vehicle_half_width_m: f64,

    /// Distance between path samples
    pub path_step_m: f64,

    /// How colliding samples are grouped into the obstruction to avoid
    #[serde(default)]
    pub obstruction_policy: ObstructionPolicy,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check the parameters are usable.
    pub fn validate(&self) -> Result<(), LoadError> {
        require_positive(self.update_frequency_hz, "update_frequency_hz")?;
        require_positive(self.vehicle_half_width_m, "vehicle_half_width_m")?;
        require_positive(self.path_step_m, "path_step_m")?;
        util::params::require_non_negative(self.target_velocity_ms, "target_velocity_ms")?;

        if self.frame_id.is_empty() {
            return Err(LoadError::InvalidParam("frame_id"));
        }

        Ok(())
    }

    /// Full width of the vehicle.
    pub fn vehicle_width_m(&self) -> f64 {
        2.0 * self.vehicle_half_width_m
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const PARAMS: &str = r#"
        update_frequency_hz = 10.0
        frame_id = "map"
        target_velocity_ms = 5.0
        vehicle_half_width_m = 1.0
        path_step_m = 0.1
    "#;

    #[test]
    fn test_parse_defaults() {
        let p: Params = util::params::load_str(PARAMS).unwrap();
        assert!(p.validate().is_ok());
        assert_eq!(p.obstruction_policy, ObstructionPolicy::Span);
        assert_eq!(p.vehicle_width_m(), 2.0);
    }

    #[test]
    fn test_parse_policy() {
        let s = format!("{}obstruction_policy = \"first_run\"\n", PARAMS);
        let p: Params = util::params::load_str(&s).unwrap();
        assert_eq!(p.obstruction_policy, ObstructionPolicy::FirstRun);
    }

    #[test]
    fn test_missing_option() {
        let s = PARAMS.replace("vehicle_half_width_m = 1.0", "");
        let r: Result<Params, _> = util::params::load_str(&s);
        assert!(matches!(r, Err(LoadError::DeserialiseError(_))));
    }

    #[test]
    fn test_invalid_option() {
        let s = PARAMS.replace("path_step_m = 0.1", "path_step_m = 0.0");
        let p: Params = util::params::load_str(&s).unwrap();
        assert!(matches!(p.validate(), Err(LoadError::InvalidParam("path_step_m"))));
    }
}
