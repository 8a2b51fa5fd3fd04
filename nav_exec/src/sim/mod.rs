//! # Simulation harness
//!
//! Scenario generation (goal rings and road grids) and a kinematic bicycle used to close the
//! loop between the planner and the tracker without a vehicle.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
pub mod road;
pub mod vehicle;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use params::{Params, Scenario};
pub use road::{circle_goals, ring_road_grid, straight_road_grid, Band};
pub use vehicle::KinematicBicycle;
