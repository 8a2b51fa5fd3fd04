//! # Reference path
//!
//! This module defines the densely sampled path produced by the planner and followed by the
//! tracker.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use comms_if::msg::{Path2D, Pose2D, PoseStamped, VizPath};
use util::maths::{heading_to_quaternion, quaternion_to_array};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A path as three parallel sequences of x, y and heading.
///
/// The sequences always have the same length.
#[derive(Clone, Serialize, Debug, Default, PartialEq)]
pub struct Path {
    x: Vec<f64>,
    y: Vec<f64>,
    yaw: Vec<f64>,
}

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PathError {
    #[error("Path sequences have different lengths (x: {0}, y: {1}, yaw: {2})")]
    LengthMismatch(usize, usize, usize),

    #[error(
        "Cannot splice [0, {before_end}) and [{after_start}, {len}) from a path of length {len}"
    )]
    SpliceOutOfBounds {
        before_end: usize,
        after_start: usize,
        len: usize,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Path {
    /// Create a new path from its sequences.
    pub fn new(x: Vec<f64>, y: Vec<f64>, yaw: Vec<f64>) -> Result<Self, PathError> {
        if x.len() != y.len() || x.len() != yaw.len() {
            return Err(PathError::LengthMismatch(x.len(), y.len(), yaw.len()));
        }

        Ok(Self { x, y, yaw })
    }

    /// Create a new empty path
    pub fn new_empty() -> Self {
        Self::default()
    }

    /// Build from sequences the caller has already made equal length.
    pub(crate) fn from_parts_unchecked(x: Vec<f64>, y: Vec<f64>, yaw: Vec<f64>) -> Self {
        debug_assert!(x.len() == y.len() && x.len() == yaw.len());
        Self { x, y, yaw }
    }

    /// Get the number of points in the path
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Position of the `i`th point.
    pub fn point(&self, i: usize) -> Option<Vector2<f64>> {
        Some(Vector2::new(*self.x.get(i)?, *self.y.get(i)?))
    }

    /// Heading of the `i`th point.
    pub fn yaw(&self, i: usize) -> Option<f64> {
        self.yaw.get(i).copied()
    }

    pub fn xs(&self) -> &[f64] {
        &self.x
    }

    pub fn ys(&self) -> &[f64] {
        &self.y
    }

    pub fn yaws(&self) -> &[f64] {
        &self.yaw
    }

    /// Iterate over `(x, y, yaw)` triples.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.x
            .iter()
            .zip(self.y.iter())
            .zip(self.yaw.iter())
            .map(|((&x, &y), &yaw)| (x, y, yaw))
    }

    /// Replace the middle of the path with a detour.
    ///
    /// The result is `self[0, before_end) ++ detour ++ self[after_start, len)`.
    pub fn splice(
        &self,
        before_end: usize,
        detour: &Path,
        after_start: usize,
    ) -> Result<Path, PathError> {
        let len = self.len();
        if before_end > after_start || after_start > len {
            return Err(PathError::SpliceOutOfBounds {
                before_end,
                after_start,
                len,
            });
        }

        let join = |a: &[f64], d: &[f64], b: &[f64]| -> Vec<f64> {
            let mut v = Vec::with_capacity(a.len() + d.len() + b.len());
            v.extend_from_slice(a);
            v.extend_from_slice(d);
            v.extend_from_slice(b);
            v
        };

        Ok(Self {
            x: join(&self.x[..before_end], &detour.x, &self.x[after_start..]),
            y: join(&self.y[..before_end], &detour.y, &self.y[after_start..]),
            yaw: join(&self.yaw[..before_end], &detour.yaw, &self.yaw[after_start..]),
        })
    }

    /// Distance between consecutive points `i` and `i + 1`.
    pub fn step_length(&self, i: usize) -> Option<f64> {
        let a = self.point(i)?;
        let b = self.point(i + 1)?;
        Some((b - a).norm())
    }

    /// Control projection sent to the tracker.
    pub fn to_msg(&self) -> Path2D {
        Path2D {
            poses: self
                .iter()
                .map(|(x, y, theta)| Pose2D { x, y, theta })
                .collect(),
        }
    }

    pub fn from_msg(msg: &Path2D) -> Self {
        let mut x = Vec::with_capacity(msg.poses.len());
        let mut y = Vec::with_capacity(msg.poses.len());
        let mut yaw = Vec::with_capacity(msg.poses.len());

        for p in msg.poses.iter() {
            x.push(p.x);
            y.push(p.y);
            yaw.push(p.theta);
        }

        Self { x, y, yaw }
    }

    /// Visualisation projection, one stamped pose per sample.
    pub fn to_viz(&self, frame_id: &str, stamp_s: f64) -> VizPath {
        VizPath {
            frame_id: frame_id.to_string(),
            stamp_s,
            poses: self
                .iter()
                .enumerate()
                .map(|(seq, (x, y, yaw))| PoseStamped {
                    frame_id: frame_id.to_string(),
                    seq: seq as u64,
                    stamp_s,
                    position: [x, y, 0.0],
                    orientation: quaternion_to_array(&heading_to_quaternion(yaw)),
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
