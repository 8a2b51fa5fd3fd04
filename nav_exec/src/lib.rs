//! # Navigation library.
//!
//! This library allows the executables and the integration tests to access the planner, the
//! tracker and the modules they share.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Geometry - cubic splines and the sampled reference path
pub mod geom;

/// Occupancy grid - the obstacle raster the planner checks paths against
pub mod map;

/// Path planner - builds the reference path from goals and reroutes it around obstacles
pub mod planner;

/// Trajectory tracker - steers the vehicle along the reference path
pub mod tracker;

/// Simulation harness - road generation and a kinematic vehicle model
pub mod sim;
