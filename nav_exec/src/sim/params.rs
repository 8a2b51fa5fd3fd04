//! Simulation parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Deserialize;

use super::{circle_goals, ring_road_grid, straight_road_grid, Band};
use crate::map::{GridError, OccupancyGrid};
use comms_if::msg::Point2D;
use util::params::{require_positive, LoadError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the closed loop simulation
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Simulated time after which the simulation stops
    pub duration_s: f64,

    /// Integration step of the vehicle model
    pub step_s: f64,

    /// Wheelbase of the simulated vehicle
    pub wheelbase_m: f64,

    pub scenario: Scenario,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The road and goals to simulate.
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scenario {
    /// Straight road along +X with goals every `goal_spacing_m`
    Straight {
        length_m: f64,
        road_half_width_m: f64,
        resolution_m: f64,
        goal_spacing_m: f64,
        #[serde(default)]
        obstacles: Vec<Band>,
    },

    /// Ring road around the origin with goals on a circle
    Ring {
        goal_radius_m: f64,
        angle_step_rad: f64,
        inner_radius_m: f64,
        road_width_m: f64,
        resolution_m: f64,
        origin_m: [f64; 2],
        width: usize,
        height: usize,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check the parameters are usable.
    pub fn validate(&self) -> Result<(), LoadError> {
        require_positive(self.duration_s, "duration_s")?;
        require_positive(self.step_s, "step_s")?;
        require_positive(self.wheelbase_m, "wheelbase_m")?;

        match self.scenario {
            Scenario::Straight {
                length_m,
                road_half_width_m,
                resolution_m,
                goal_spacing_m,
                ..
            } => {
                require_positive(length_m, "length_m")?;
                require_positive(road_half_width_m, "road_half_width_m")?;
                require_positive(resolution_m, "resolution_m")?;
                require_positive(goal_spacing_m, "goal_spacing_m")?;
            }
            Scenario::Ring {
                goal_radius_m,
                angle_step_rad,
                road_width_m,
                resolution_m,
                ..
            } => {
                require_positive(goal_radius_m, "goal_radius_m")?;
                require_positive(angle_step_rad, "angle_step_rad")?;
                require_positive(road_width_m, "road_width_m")?;
                require_positive(resolution_m, "resolution_m")?;
            }
        }

        Ok(())
    }
}

impl Scenario {
    /// Build the goals and occupancy grid for the scenario.
    pub fn build(&self) -> Result<(Vec<Point2D>, OccupancyGrid), GridError> {
        match *self {
            Scenario::Straight {
                length_m,
                road_half_width_m,
                resolution_m,
                goal_spacing_m,
                ref obstacles,
            } => {
                let num_goals = (length_m / goal_spacing_m).floor() as usize + 1;
                let goals = (0..num_goals)
                    .map(|i| Point2D {
                        x: i as f64 * goal_spacing_m,
                        y: 0.0,
                    })
                    .collect();

                let grid =
                    straight_road_grid(length_m, road_half_width_m, resolution_m, obstacles)?;

                Ok((goals, grid))
            }
            Scenario::Ring {
                goal_radius_m,
                angle_step_rad,
                inner_radius_m,
                road_width_m,
                resolution_m,
                origin_m,
                width,
                height,
            } => {
                let grid = ring_road_grid(
                    inner_radius_m,
                    road_width_m,
                    resolution_m,
                    Vector2::new(origin_m[0], origin_m[1]),
                    width,
                    height,
                )?;

                Ok((circle_goals(goal_radius_m, angle_step_rad), grid))
            }
        }
    }
}
