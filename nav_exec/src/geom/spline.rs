//! # Cubic spline interpolation
//!
//! Natural cubic splines used to turn sparse waypoints into a dense reference path. The 2D spline
//! is parameterised by the cumulative chord length between waypoints, so sampling it at a fixed
//! step gives points roughly `ds` apart along the curve.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;

use super::Path;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Consecutive waypoints closer than this are treated as the same point.
pub const DUPLICATE_POINT_TOLERANCE_M: f64 = 1e-6;

/// Upper bound on the number of samples in a generated path.
pub const MAX_PATH_SAMPLES: usize = 1_000_000;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A natural cubic spline through `(t, y)` knots.
#[derive(Debug, Clone)]
pub struct CubicSpline1D {
    /// Knot parameters, strictly increasing
    t: Vec<f64>,
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    d: Vec<f64>,
}

/// A planar cubic spline parameterised by arc length.
#[derive(Debug, Clone)]
pub struct CubicSpline2D {
    s: Vec<f64>,
    sx: CubicSpline1D,
    sy: CubicSpline1D,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SplineError {
    #[error("At least 2 distinct points are needed to fit a spline, got {0}")]
    NotEnoughPoints(usize),

    #[error("Got {0} x values but {1} y values")]
    LengthMismatch(usize, usize),

    #[error("The sampling step must be finite and positive, got {0}")]
    InvalidStep(f64),

    #[error("Spline knots must be strictly increasing")]
    KnotsNotIncreasing,

    #[error("Could not solve for the spline coefficients")]
    Singular,

    #[error("Waypoint {0} is not finite")]
    NonFinite(usize),

    #[error("A path of {length_m} m at a {step_m} m step exceeds the sample limit")]
    TooManySamples { length_m: f64, step_m: f64 },
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Interpolate the waypoints with a cubic spline and sample it every `ds` meters.
///
/// Samples are taken at `s = 0, ds, 2ds, ...` strictly below the total length. Consecutive
/// duplicate waypoints are dropped before fitting. Non-finite waypoints are rejected, as are
/// paths that would need more than [`MAX_PATH_SAMPLES`] samples.
pub fn generate_cubic_path(xs: &[f64], ys: &[f64], ds: f64) -> Result<Path, SplineError> {
    if xs.len() != ys.len() {
        return Err(SplineError::LengthMismatch(xs.len(), ys.len()));
    }

    if !ds.is_finite() || ds <= 0.0 {
        return Err(SplineError::InvalidStep(ds));
    }

    if let Some(i) = xs
        .iter()
        .zip(ys.iter())
        .position(|(x, y)| !x.is_finite() || !y.is_finite())
    {
        return Err(SplineError::NonFinite(i));
    }

    // Remove coincident neighbours, which would give a zero chord length
    let mut points: Vec<Vector2<f64>> = Vec::with_capacity(xs.len());
    for (&x, &y) in xs.iter().zip(ys.iter()) {
        let p = Vector2::new(x, y);
        match points.last() {
            Some(last) if (p - last).norm() < DUPLICATE_POINT_TOLERANCE_M => (),
            _ => points.push(p),
        }
    }

    if points.len() < 2 {
        return Err(SplineError::NotEnoughPoints(points.len()));
    }

    let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.y).collect();

    let spline = CubicSpline2D::new(&xs, &ys)?;

    let s_end = spline.length();
    let num_samples = (s_end / ds).ceil();
    if !num_samples.is_finite() || num_samples > MAX_PATH_SAMPLES as f64 {
        return Err(SplineError::TooManySamples { length_m: s_end, step_m: ds });
    }
    let num_samples = num_samples as usize;

    let mut x = Vec::with_capacity(num_samples);
    let mut y = Vec::with_capacity(num_samples);
    let mut yaw = Vec::with_capacity(num_samples);

    for i in 0..num_samples {
        let s = i as f64 * ds;
        if s >= s_end {
            break;
        }

        let p = spline.position(s);
        x.push(p.x);
        y.push(p.y);
        yaw.push(spline.yaw(s));
    }

    // Equal lengths are guaranteed by construction
    Ok(Path::from_parts_unchecked(x, y, yaw))
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CubicSpline1D {
    /// Fit a natural spline (zero second derivative at both ends) through the knots.
    pub fn new(t: &[f64], y: &[f64]) -> Result<Self, SplineError> {
        if t.len() != y.len() {
            return Err(SplineError::LengthMismatch(t.len(), y.len()));
        }
        if t.len() < 2 {
            return Err(SplineError::NotEnoughPoints(t.len()));
        }

        let h: Vec<f64> = t.windows(2).map(|w| w[1] - w[0]).collect();
        if h.iter().any(|&hi| !(hi > 0.0)) {
            return Err(SplineError::KnotsNotIncreasing);
        }

        let n = t.len();
        let a = y.to_vec();

        // ---- TRIDIAGONAL SYSTEM FOR c ----

        let mut lower = vec![0.0; n];
        let mut diag = vec![1.0; n];
        let mut upper = vec![0.0; n];
        let mut rhs = vec![0.0; n];

        for i in 1..(n - 1) {
            lower[i] = h[i - 1];
            diag[i] = 2.0 * (h[i - 1] + h[i]);
            upper[i] = h[i];

            rhs[i] = 3.0 * (a[i + 1] - a[i]) / h[i] - 3.0 * (a[i] - a[i - 1]) / h[i - 1];
        }

        let c = solve_tridiagonal(&lower, &diag, &upper, &rhs).ok_or(SplineError::Singular)?;

        // ---- REMAINING COEFFICIENTS ----

        let mut b = Vec::with_capacity(n - 1);
        let mut d = Vec::with_capacity(n - 1);
        for i in 0..(n - 1) {
            d.push((c[i + 1] - c[i]) / (3.0 * h[i]));
            b.push((a[i + 1] - a[i]) / h[i] - h[i] * (c[i + 1] + 2.0 * c[i]) / 3.0);
        }

        Ok(Self {
            t: t.to_vec(),
            a,
            b,
            c,
            d,
        })
    }

    /// Value at `t`. Outside the knot range the end polynomials are extrapolated.
    pub fn calc(&self, t: f64) -> f64 {
        let (i, dt) = self.segment(t);
        self.a[i] + self.b[i] * dt + self.c[i] * dt.powi(2) + self.d[i] * dt.powi(3)
    }

    /// First derivative at `t`.
    pub fn calc_d(&self, t: f64) -> f64 {
        let (i, dt) = self.segment(t);
        self.b[i] + 2.0 * self.c[i] * dt + 3.0 * self.d[i] * dt.powi(2)
    }

    /// Second derivative at `t`.
    pub fn calc_dd(&self, t: f64) -> f64 {
        let (i, dt) = self.segment(t);
        2.0 * self.c[i] + 6.0 * self.d[i] * dt
    }

    /// Index of the polynomial piece containing `t` and the offset into it.
    fn segment(&self, t: f64) -> (usize, f64) {
        // Number of knots <= t, minus one, clamped to a valid piece
        let i = match self.t.iter().rposition(|&k| k <= t) {
            Some(i) => i.min(self.t.len() - 2),
            None => 0,
        };

        (i, t - self.t[i])
    }
}

impl CubicSpline2D {
    /// Fit a spline through the points, which must not contain consecutive duplicates.
    pub fn new(xs: &[f64], ys: &[f64]) -> Result<Self, SplineError> {
        if xs.len() != ys.len() {
            return Err(SplineError::LengthMismatch(xs.len(), ys.len()));
        }
        if xs.len() < 2 {
            return Err(SplineError::NotEnoughPoints(xs.len()));
        }

        let mut s = Vec::with_capacity(xs.len());
        s.push(0.0);
        for i in 1..xs.len() {
            let ds = (xs[i] - xs[i - 1]).hypot(ys[i] - ys[i - 1]);
            s.push(s[i - 1] + ds);
        }

        Ok(Self {
            sx: CubicSpline1D::new(&s, xs)?,
            sy: CubicSpline1D::new(&s, ys)?,
            s,
        })
    }

    /// Total chord length of the spline.
    pub fn length(&self) -> f64 {
        self.s.last().copied().unwrap_or(0.0)
    }

    pub fn position(&self, s: f64) -> Vector2<f64> {
        Vector2::new(self.sx.calc(s), self.sy.calc(s))
    }

    /// Heading of the tangent at `s`, measured from +X.
    pub fn yaw(&self, s: f64) -> f64 {
        self.sy.calc_d(s).atan2(self.sx.calc_d(s))
    }

    /// Signed curvature at `s`, positive turning left.
    pub fn curvature(&self, s: f64) -> f64 {
        let dx = self.sx.calc_d(s);
        let ddx = self.sx.calc_dd(s);
        let dy = self.sy.calc_d(s);
        let ddy = self.sy.calc_dd(s);

        (ddy * dx - ddx * dy) / (dx.powi(2) + dy.powi(2)).powf(1.5)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Solve a tridiagonal system with the Thomas algorithm.
///
/// Row `i` reads `lower[i] x[i-1] + diag[i] x[i] + upper[i] x[i+1] = rhs[i]`, `lower[0]` and
/// `upper[n-1]` are ignored. Returns `None` on a zero or non-finite pivot.
fn solve_tridiagonal(lower: &[f64], diag: &[f64], upper: &[f64], rhs: &[f64]) -> Option<Vec<f64>> {
    let n = diag.len();
    if n == 0 {
        return Some(Vec::new());
    }

    let mut c_prime = vec![0.0; n];
    let mut d_prime = vec![0.0; n];

    // Forward sweep
    for i in 0..n {
        let (l, c_prev, d_prev) = match i {
            0 => (0.0, 0.0, 0.0),
            _ => (lower[i], c_prime[i - 1], d_prime[i - 1]),
        };

        let pivot = diag[i] - l * c_prev;
        if pivot == 0.0 || !pivot.is_finite() {
            return None;
        }

        c_prime[i] = match i + 1 < n {
            true => upper[i] / pivot,
            false => 0.0,
        };
        d_prime[i] = (rhs[i] - l * d_prev) / pivot;
    }

    // Back substitution
    let mut x = d_prime;
    for i in (0..(n - 1)).rev() {
        x[i] -= c_prime[i] * x[i + 1];
    }

    Some(x)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_spline_1d_passes_through_knots() {
        let t = [0.0, 1.0, 2.5, 4.0];
        let y = [1.0, -1.0, 2.0, 0.5];
        let sp = CubicSpline1D::new(&t, &y).unwrap();

        for (ti, yi) in t.iter().zip(y.iter()) {
            assert!((sp.calc(*ti) - yi).abs() < 1e-9);
        }

        // Natural end conditions
        assert!(sp.calc_dd(0.0).abs() < 1e-9);
    }

    #[test]
    fn test_spline_1d_two_points_is_linear() {
        let sp = CubicSpline1D::new(&[0.0, 2.0], &[1.0, 5.0]).unwrap();
        assert!((sp.calc(1.0) - 3.0).abs() < 1e-12);
        assert!((sp.calc_d(0.3) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_spline_1d_rejects_bad_knots() {
        assert_eq!(
            CubicSpline1D::new(&[0.0, 0.0], &[1.0, 2.0]).unwrap_err(),
            SplineError::KnotsNotIncreasing
        );
    }

    #[test]
    fn test_spline_2d_circle_curvature() {
        // Points on a circle of radius 10, curvature should be close to 0.1
        let n = 36;
        let xs: Vec<f64> = (0..=n)
            .map(|i| 10.0 * (i as f64 * std::f64::consts::TAU / n as f64).cos())
            .collect();
        let ys: Vec<f64> = (0..=n)
            .map(|i| 10.0 * (i as f64 * std::f64::consts::TAU / n as f64).sin())
            .collect();
        let sp = CubicSpline2D::new(&xs, &ys).unwrap();

        let mid = 0.5 * sp.length();
        assert!((sp.curvature(mid) - 0.1).abs() < 5e-3);
    }

    #[test]
    fn test_generate_straight_path() {
        let path = generate_cubic_path(&[0.0, 10.0, 20.0], &[0.0, 0.0, 0.0], 0.1).unwrap();

        assert_eq!(path.len(), 200);
        for (x, y, yaw) in path.iter() {
            assert!(x >= 0.0 && x < 20.0);
            assert!(y.abs() < 1e-9);
            assert!(yaw.abs() < 1e-9);
        }
    }

    #[test]
    fn test_generate_errors() {
        assert_eq!(
            generate_cubic_path(&[0.0], &[0.0], 0.1).unwrap_err(),
            SplineError::NotEnoughPoints(1)
        );
        assert_eq!(
            generate_cubic_path(&[0.0, 0.0], &[1.0, 1.0], 0.1).unwrap_err(),
            SplineError::NotEnoughPoints(1)
        );
        assert_eq!(
            generate_cubic_path(&[0.0, 1.0], &[1.0], 0.1).unwrap_err(),
            SplineError::LengthMismatch(2, 1)
        );
        assert_eq!(
            generate_cubic_path(&[0.0, 1.0], &[0.0, 1.0], 0.0).unwrap_err(),
            SplineError::InvalidStep(0.0)
        );
    }

    #[test]
    fn test_generate_rejects_unbounded_paths() {
        assert_eq!(
            generate_cubic_path(&[0.0, f64::INFINITY], &[0.0, 0.0], 0.1).unwrap_err(),
            SplineError::NonFinite(1)
        );
        assert_eq!(
            generate_cubic_path(&[0.0, 1.0, 2.0], &[0.0, f64::NEG_INFINITY, 0.0], 0.1).unwrap_err(),
            SplineError::NonFinite(1)
        );
        assert_eq!(
            generate_cubic_path(&[0.0, f64::NAN], &[0.0, 0.0], 0.1).unwrap_err(),
            SplineError::NonFinite(1)
        );

        // Finite but far too long to sample
        match generate_cubic_path(&[0.0, 1.0e12], &[0.0, 0.0], 0.1) {
            Err(SplineError::TooManySamples { .. }) => (),
            other => panic!("Expected TooManySamples, got {:?}", other),
        }

        // Chord length overflows to infinity
        match generate_cubic_path(&[-1.0e308, 1.0e308], &[0.0, 0.0], 0.1) {
            Err(SplineError::TooManySamples { .. }) => (),
            other => panic!("Expected TooManySamples, got {:?}", other),
        }
    }

    #[test]
    fn test_solve_tridiagonal() {
        // [2 1 0; 1 3 1; 0 1 2] x = [4, 10, 8] has the solution [1, 2, 3]
        let x = solve_tridiagonal(
            &[0.0, 1.0, 1.0],
            &[2.0, 3.0, 2.0],
            &[1.0, 1.0, 0.0],
            &[4.0, 10.0, 8.0],
        )
        .unwrap();

        for (xi, ei) in x.iter().zip([1.0, 2.0, 3.0].iter()) {
            assert!((xi - ei).abs() < 1e-12);
        }

        assert!(solve_tridiagonal(&[0.0, 1.0], &[0.0, 1.0], &[1.0, 0.0], &[1.0, 1.0]).is_none());
    }

    #[test]
    fn test_spline_long_waypoint_list() {
        // Enough knots that a dense solve would be noticeably slow
        let n = 5000;
        let xs: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let ys: Vec<f64> = (0..n).map(|i| (i as f64 * 0.1).sin()).collect();
        let sp = CubicSpline1D::new(&xs, &ys).unwrap();

        for i in (0..n).step_by(499) {
            assert!((sp.calc(xs[i]) - ys[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_duplicates_dropped() {
        let path = generate_cubic_path(
            &[0.0, 5.0, 5.0, 10.0],
            &[0.0, 0.0, 0.0, 0.0],
            0.5
        ).unwrap();
        assert_eq!(path.len(), 20);
    }
}
