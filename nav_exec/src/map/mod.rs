//! # Map
//!
//! The occupancy grid used by the planner to check paths for collisions.

// ------------------------------------------------------------------------------------------------
// MODS
// ------------------------------------------------------------------------------------------------

mod occ_grid;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use occ_grid::{GridError, OccupancyGrid, FREE, OCCUPIED, OCCUPIED_THRESHOLD};
