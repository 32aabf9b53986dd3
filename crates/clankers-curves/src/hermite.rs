//! Cubic Hermite curves over a normalized phase.
//!
//! A Hermite segment is pinned by its value and rate at both ends. The curve
//! is parameterized by the phase `s ∈ [0, 1]`; derivatives are taken with
//! respect to `s`, so a caller working in time divides the first derivative
//! by the segment duration `T` and the second by `T²`.
//!
//! ```text
//! p(s) = p1·h1(s) + p2·h2(s) + v1·h3(s) + v2·h4(s)
//!
//! h1 =  2s³ − 3s² + 1     h3 = s³ − 2s² + s
//! h2 = −2s³ + 3s²         h4 = s³ − s²
//! ```

use nalgebra::DVector;

use crate::error::CurveError;

/// Clamp a phase to `[0, 1]`. Curves never extrapolate past their ends.
#[inline]
pub fn clamp_phase(s: f64) -> f64 {
    s.clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// HermiteCurve
// ---------------------------------------------------------------------------

/// Scalar cubic Hermite curve.
///
/// # Example
///
/// ```
/// use clankers_curves::HermiteCurve;
///
/// let curve = HermiteCurve::new(0.0, 0.0, 1.0, 0.0);
/// assert_eq!(curve.evaluate(0.5), 0.5);
/// assert_eq!(curve.evaluate(2.0), 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HermiteCurve {
    p1: f64,
    v1: f64,
    p2: f64,
    v2: f64,
}

impl HermiteCurve {
    /// Build a curve from start value/rate and end value/rate.
    pub const fn new(start_pos: f64, start_vel: f64, end_pos: f64, end_vel: f64) -> Self {
        Self {
            p1: start_pos,
            v1: start_vel,
            p2: end_pos,
            v2: end_vel,
        }
    }

    /// Value at phase `s` (clamped).
    pub fn evaluate(&self, s: f64) -> f64 {
        let s = clamp_phase(s);
        let s2 = s * s;
        let s3 = s2 * s;
        self.p1 * (2.0 * s3 - 3.0 * s2 + 1.0)
            + self.p2 * (-2.0 * s3 + 3.0 * s2)
            + self.v1 * (s3 - 2.0 * s2 + s)
            + self.v2 * (s3 - s2)
    }

    /// First derivative with respect to phase at `s` (clamped).
    pub fn evaluate_first_derivative(&self, s: f64) -> f64 {
        let s = clamp_phase(s);
        let s2 = s * s;
        self.p1 * (6.0 * s2 - 6.0 * s)
            + self.p2 * (-6.0 * s2 + 6.0 * s)
            + self.v1 * (3.0 * s2 - 4.0 * s + 1.0)
            + self.v2 * (3.0 * s2 - 2.0 * s)
    }

    /// Second derivative with respect to phase at `s` (clamped).
    pub fn evaluate_second_derivative(&self, s: f64) -> f64 {
        let s = clamp_phase(s);
        self.p1 * (12.0 * s - 6.0)
            + self.p2 * (-12.0 * s + 6.0)
            + self.v1 * (6.0 * s - 4.0)
            + self.v2 * (6.0 * s - 2.0)
    }

    pub const fn start_pos(&self) -> f64 {
        self.p1
    }

    pub const fn end_pos(&self) -> f64 {
        self.p2
    }
}

// ---------------------------------------------------------------------------
// HermiteCurveVec
// ---------------------------------------------------------------------------

/// Vector Hermite curve: one independent [`HermiteCurve`] per coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct HermiteCurveVec {
    curves: Vec<HermiteCurve>,
}

impl HermiteCurveVec {
    /// Build a curve from start/end values and rates.
    ///
    /// # Errors
    ///
    /// Returns [`CurveError::DimensionMismatch`] if the four boundary vectors
    /// do not share one length.
    pub fn new(
        start_pos: &DVector<f64>,
        start_vel: &DVector<f64>,
        end_pos: &DVector<f64>,
        end_vel: &DVector<f64>,
    ) -> Result<Self, CurveError> {
        let dim = start_pos.len();
        CurveError::check_dim("start_vel", dim, start_vel.len())?;
        CurveError::check_dim("end_pos", dim, end_pos.len())?;
        CurveError::check_dim("end_vel", dim, end_vel.len())?;

        let curves = (0..dim)
            .map(|i| HermiteCurve::new(start_pos[i], start_vel[i], end_pos[i], end_vel[i]))
            .collect();
        Ok(Self { curves })
    }

    /// Number of coordinates.
    pub fn dim(&self) -> usize {
        self.curves.len()
    }

    /// Per-axis scalar curves.
    pub fn axes(&self) -> &[HermiteCurve] {
        &self.curves
    }

    pub fn evaluate(&self, s: f64) -> DVector<f64> {
        DVector::from_iterator(self.dim(), self.curves.iter().map(|c| c.evaluate(s)))
    }

    pub fn evaluate_first_derivative(&self, s: f64) -> DVector<f64> {
        DVector::from_iterator(
            self.dim(),
            self.curves.iter().map(|c| c.evaluate_first_derivative(s)),
        )
    }

    pub fn evaluate_second_derivative(&self, s: f64) -> DVector<f64> {
        DVector::from_iterator(
            self.dim(),
            self.curves.iter().map(|c| c.evaluate_second_derivative(s)),
        )
    }
}
