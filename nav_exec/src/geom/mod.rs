//! # Geometry
//!
//! The reference path and the spline interpolation which produces it.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod path;
pub mod spline;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use path::{Path, PathError};
pub use spline::{generate_cubic_path, CubicSpline1D, CubicSpline2D, SplineError};
