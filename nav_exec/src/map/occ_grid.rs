//! # Occupancy Grid
//!
//! A single layer grid of occupancy scores, indexed by `(ix, iy)` cell or by map frame
//! position. All accessors are bounds checked.

// ------------------------------------------------------------------------------------------------
// INCLUDES
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use ndarray::Array2;

use comms_if::msg::OccupancyGridMsg;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Cells scoring strictly more than this are occupied.
pub const OCCUPIED_THRESHOLD: i8 = 10;

/// Value used for fully occupied cells.
pub const OCCUPIED: i8 = 100;

/// Value used for free cells.
pub const FREE: i8 = 0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An occupancy grid.
#[derive(Clone, Debug, PartialEq)]
pub struct OccupancyGrid {
    /// Cell scores with dimension order y cell, x cell
    data: Array2<i8>,

    /// The size of each grid cell in meters per cell
    resolution_m: f64,

    /// Position of the corner of cell (0, 0)
    origin_m: Vector2<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GridError {
    #[error("Requested position or cell outside map bounds")]
    OutsideMap,

    #[error("Grid data has {0} cells but the header gives {1} x {2}")]
    IncompatibleShape(usize, usize, usize),

    #[error("Grid resolution must be finite and positive, got {0}")]
    InvalidResolution(f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl OccupancyGrid {
    /// A grid with no cells, used before any map has been received.
    pub fn empty() -> Self {
        Self {
            data: Array2::zeros((0, 0)),
            resolution_m: 1.0,
            origin_m: Vector2::zeros(),
        }
    }

    /// Create a new grid of free cells.
    pub fn new(
        width: usize,
        height: usize,
        resolution_m: f64,
        origin_m: Vector2<f64>,
    ) -> Result<Self, GridError> {
        if !resolution_m.is_finite() || resolution_m <= 0.0 {
            return Err(GridError::InvalidResolution(resolution_m));
        }

        Ok(Self {
            data: Array2::from_elem((height, width), FREE),
            resolution_m,
            origin_m,
        })
    }

    /// Build a grid from a bus message, whose data is row-major.
    pub fn from_msg(msg: &OccupancyGridMsg) -> Result<Self, GridError> {
        if !msg.resolution_m.is_finite() || msg.resolution_m <= 0.0 {
            return Err(GridError::InvalidResolution(msg.resolution_m));
        }

        let data = Array2::from_shape_vec((msg.height, msg.width), msg.data.clone())
            .map_err(|_| GridError::IncompatibleShape(msg.data.len(), msg.width, msg.height))?;

        Ok(Self {
            data,
            resolution_m: msg.resolution_m,
            origin_m: Vector2::new(msg.origin.x, msg.origin.y),
        })
    }

    /// Convert back into a bus message.
    pub fn to_msg(&self) -> OccupancyGridMsg {
        OccupancyGridMsg {
            width: self.width(),
            height: self.height(),
            resolution_m: self.resolution_m,
            origin: comms_if::msg::Point2D {
                x: self.origin_m.x,
                y: self.origin_m.y,
            },
            data: self.data.iter().copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn resolution_m(&self) -> f64 {
        self.resolution_m
    }

    pub fn cell_in_map(&self, ix: usize, iy: usize) -> bool {
        ix < self.width() && iy < self.height()
    }

    /// Cell containing a position, `floor((position - origin) / resolution)`.
    pub fn position_to_cell(&self, position: &Vector2<f64>) -> Result<(usize, usize), GridError> {
        let rel = (position - self.origin_m) / self.resolution_m;
        let fx = rel.x.floor();
        let fy = rel.y.floor();

        // Also rejects NaN
        if !(fx >= 0.0 && fy >= 0.0) {
            return Err(GridError::OutsideMap);
        }

        let (ix, iy) = (fx as usize, fy as usize);
        match self.cell_in_map(ix, iy) {
            true => Ok((ix, iy)),
            false => Err(GridError::OutsideMap),
        }
    }

    /// Position of the centre of a cell.
    pub fn cell_position(&self, ix: usize, iy: usize) -> Result<Vector2<f64>, GridError> {
        if !self.cell_in_map(ix, iy) {
            return Err(GridError::OutsideMap);
        }

        Ok(self.origin_m
            + Vector2::new(ix as f64 + 0.5, iy as f64 + 0.5) * self.resolution_m)
    }

    pub fn get(&self, ix: usize, iy: usize) -> Result<i8, GridError> {
        self.data.get((iy, ix)).copied().ok_or(GridError::OutsideMap)
    }

    pub fn get_position(&self, position: &Vector2<f64>) -> Result<i8, GridError> {
        let (ix, iy) = self.position_to_cell(position)?;
        self.get(ix, iy)
    }

    pub fn set(&mut self, ix: usize, iy: usize, value: i8) -> Result<(), GridError> {
        match self.data.get_mut((iy, ix)) {
            Some(v) => {
                *v = value;
                Ok(())
            }
            None => Err(GridError::OutsideMap),
        }
    }

    /// Whether a score counts as an obstacle.
    pub fn is_occupied(value: i8) -> bool {
        value > OCCUPIED_THRESHOLD
    }

    pub fn occupied_at(&self, position: &Vector2<f64>) -> Result<bool, GridError> {
        self.get_position(position).map(Self::is_occupied)
    }

    /// Set every cell whose centre lies in the closed box `[min, max]`.
    pub fn fill_rect(&mut self, min: Vector2<f64>, max: Vector2<f64>, value: i8) {
        let res = self.resolution_m;
        let origin = self.origin_m;

        for ((iy, ix), v) in self.data.indexed_iter_mut() {
            let c = origin + Vector2::new(ix as f64 + 0.5, iy as f64 + 0.5) * res;
            if c.x >= min.x && c.x <= max.x && c.y >= min.y && c.y <= max.y {
                *v = value;
            }
        }
    }

    /// Apply a function to every cell, given its centre position.
    pub fn map_cells<F: Fn(Vector2<f64>, i8) -> i8>(&mut self, f: F) {
        let res = self.resolution_m;
        let origin = self.origin_m;

        for ((iy, ix), v) in self.data.indexed_iter_mut() {
            let c = origin + Vector2::new(ix as f64 + 0.5, iy as f64 + 0.5) * res;
            *v = f(c, *v);
        }
    }
}

impl Default for OccupancyGrid {
    fn default() -> Self {
        Self::empty()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::msg::Point2D;

    #[test]
    fn test_occ_grid() -> Result<(), GridError> {
        let mut map = OccupancyGrid::new(20, 30, 0.5, Vector2::new(-5.0, -5.0))?;

        assert_eq!(map.width(), 20);
        assert_eq!(map.height(), 30);

        // Test position->cell
        assert_eq!(map.position_to_cell(&Vector2::new(-5.0, -5.0))?, (0, 0));
        assert_eq!(map.position_to_cell(&Vector2::new(0.25, 1.75))?, (10, 13));
        assert_eq!(map.position_to_cell(&Vector2::new(4.99, 9.99))?, (19, 29));
        assert_eq!(map.position_to_cell(&Vector2::new(5.0, 0.0)), Err(GridError::OutsideMap));
        assert_eq!(map.position_to_cell(&Vector2::new(-5.1, 0.0)), Err(GridError::OutsideMap));
        assert_eq!(
            map.position_to_cell(&Vector2::new(f64::NAN, 0.0)),
            Err(GridError::OutsideMap)
        );

        // Test cell->position
        assert_eq!(map.cell_position(0, 0)?, Vector2::new(-4.75, -4.75));
        assert_eq!(map.cell_position(20, 0), Err(GridError::OutsideMap));

        // Occupancy
        map.fill_rect(Vector2::new(0.0, 0.0), Vector2::new(1.0, 1.0), OCCUPIED);
        assert!(map.occupied_at(&Vector2::new(0.5, 0.5))?);
        assert!(!map.occupied_at(&Vector2::new(1.5, 0.5))?);
        assert_eq!(map.get(20, 0), Err(GridError::OutsideMap));

        map.set(19, 29, 50)?;
        assert!(map.occupied_at(&Vector2::new(4.9, 9.9))?);
        assert_eq!(map.set(0, 30, 50), Err(GridError::OutsideMap));

        Ok(())
    }

    #[test]
    fn test_threshold() {
        assert!(!OccupancyGrid::is_occupied(10));
        assert!(OccupancyGrid::is_occupied(11));
        assert!(!OccupancyGrid::is_occupied(-1));
    }

    #[test]
    fn test_from_msg_row_major() {
        let msg = OccupancyGridMsg {
            width: 3,
            height: 2,
            resolution_m: 1.0,
            origin: Point2D { x: 0.0, y: 0.0 },
            data: vec![0, 1, 2, 3, 4, 5],
        };

        let grid = OccupancyGrid::from_msg(&msg).unwrap();
        assert_eq!(grid.get(2, 0), Ok(2));
        assert_eq!(grid.get(0, 1), Ok(3));
        assert_eq!(grid.to_msg(), msg);

        let bad = OccupancyGridMsg { data: vec![0; 5], ..msg.clone() };
        assert_eq!(OccupancyGrid::from_msg(&bad), Err(GridError::IncompatibleShape(5, 3, 2)));

        let bad = OccupancyGridMsg { resolution_m: 0.0, ..msg };
        assert_eq!(OccupancyGrid::from_msg(&bad), Err(GridError::InvalidResolution(0.0)));
    }

    #[test]
    fn test_empty() {
        let grid = OccupancyGrid::empty();
        assert!(grid.is_empty());
        assert_eq!(grid.get_position(&Vector2::zeros()), Err(GridError::OutsideMap));
    }
}
