//! # Planner inputs
//!
//! Latest goals, grid and vehicle state, written by the bus receiver and read by the planning
//! cycle. Every access goes through one lock which is only held while copying data in or out.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{Arc, Mutex, MutexGuard};

use comms_if::msg::{Point2D, State2D};

use super::PlannerError;
use crate::map::OccupancyGrid;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Thread safe holder of the planner inputs.
#[derive(Default)]
pub struct PlannerInputs {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    goals: Option<Vec<Point2D>>,
    grid: Option<Arc<OccupancyGrid>>,
    vehicle_state: Option<State2D>,
}

/// A consistent copy of the inputs for one planning cycle.
#[derive(Debug, Clone)]
pub struct PlannerSnapshot {
    pub waypoints: Vec<Point2D>,

    /// Shared so a large grid is not copied every cycle
    pub grid: Arc<OccupancyGrid>,

    pub vehicle_state: Option<State2D>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PlannerInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the waypoint list.
    pub fn set_goals(&self, goals: Vec<Point2D>) -> Result<(), PlannerError> {
        self.lock()?.goals = Some(goals);
        Ok(())
    }

    /// Replace the grid. Cycles already holding the previous grid keep using it.
    pub fn set_grid(&self, grid: OccupancyGrid) -> Result<(), PlannerError> {
        self.lock()?.grid = Some(Arc::new(grid));
        Ok(())
    }

    pub fn set_vehicle_state(&self, state: State2D) -> Result<(), PlannerError> {
        self.lock()?.vehicle_state = Some(state);
        Ok(())
    }

    pub fn has_goals(&self) -> bool {
        self.lock().map(|i| i.goals.is_some()).unwrap_or(false)
    }

    pub fn has_grid(&self) -> bool {
        self.lock().map(|i| i.grid.is_some()).unwrap_or(false)
    }

    /// Copy the inputs out for a planning cycle.
    pub fn snapshot(&self) -> Result<PlannerSnapshot, PlannerError> {
        let inner = self.lock()?;

        let waypoints = match inner.goals {
            Some(ref g) => g.clone(),
            None => return Err(PlannerError::NotEnoughWaypoints(0)),
        };

        let grid = match inner.grid {
            Some(ref g) => g.clone(),
            None => return Err(PlannerError::NoGrid),
        };

        Ok(PlannerSnapshot {
            waypoints,
            grid,
            vehicle_state: inner.vehicle_state,
        })
    }

    fn lock(&self) -> Result<MutexGuard<Inner>, PlannerError> {
        self.inner.lock().map_err(|_| PlannerError::PoisonError)
    }
}

impl PlannerSnapshot {
    /// Waypoints as separate x and y sequences.
    pub fn waypoint_xy(&self) -> (Vec<f64>, Vec<f64>) {
        self.waypoints.iter().map(|p| (p.x, p.y)).unzip()
    }
}
