//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{UnitQuaternion, Vector3};
use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Limit a value to the closed range `[min, max]`.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float
{
    value.max(min).min(max)
}

/// Wrap an angle into the half-open range `(-pi, pi]`.
pub fn normalise_angle<T>(angle: T) -> T
where
    T: Float
{
    let pi = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau = pi + pi;

    if !angle.is_finite() {
        return angle;
    }

    let mut a = rem_euclid(angle + pi, tau) - pi;

    // rem_euclid lands on [-pi, pi), move the lower bound onto +pi
    if a <= -pi {
        a = a + tau;
    }

    a
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Build the orientation quaternion for a planar heading, rotating about the
/// vertical axis.
pub fn heading_to_quaternion(yaw_rad: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw_rad)
}

/// Quaternion components in `(i, j, k, w)` order.
pub fn quaternion_to_array(q: &UnitQuaternion<f64>) -> [f64; 4] {
    [q.i, q.j, q.k, q.w]
}
