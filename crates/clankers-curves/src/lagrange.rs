//! Quadratic Lagrange interpolant through three timed waypoints.
//!
//! Used for swing-foot height: lift-off at `t0 = 0`, apex at `t1 = T/2`,
//! touch-down at `t2 = T`.

use crate::error::CurveError;

/// The unique quadratic through `(t0, z0)`, `(t1, z1)`, `(t2, z2)`.
///
/// Evaluated in time, not phase, and without clamping: it is a plain
/// polynomial. Callers that need boundary holding clamp `t` themselves
/// (see [`SwingTrajectory`](crate::SwingTrajectory)).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraticLagrange {
    t: [f64; 3],
    c: [f64; 3],
}

impl QuadraticLagrange {
    /// Build the interpolant.
    ///
    /// # Errors
    ///
    /// [`CurveError::NonIncreasingKnots`] unless `t0 < t1 < t2`.
    pub fn new(
        (t0, z0): (f64, f64),
        (t1, z1): (f64, f64),
        (t2, z2): (f64, f64),
    ) -> Result<Self, CurveError> {
        if !(t0 < t1 && t1 < t2) {
            return Err(CurveError::NonIncreasingKnots { t0, t1, t2 });
        }
        Ok(Self {
            t: [t0, t1, t2],
            c: [
                z0 / ((t0 - t1) * (t0 - t2)),
                z1 / ((t1 - t0) * (t1 - t2)),
                z2 / ((t2 - t0) * (t2 - t1)),
            ],
        })
    }

    /// Reassemble from knots and coefficients produced by [`Self::new`].
    pub(crate) const fn from_parts(t: [f64; 3], c: [f64; 3]) -> Self {
        Self { t, c }
    }

    /// Knot times `[t0, t1, t2]`.
    pub const fn knots(&self) -> [f64; 3] {
        self.t
    }

    /// Lagrange basis coefficients `[c0, c1, c2]`.
    pub const fn coefficients(&self) -> [f64; 3] {
        self.c
    }

    pub fn evaluate(&self, t: f64) -> f64 {
        let [t0, t1, t2] = self.t;
        let [c0, c1, c2] = self.c;
        (t - t1) * (t - t2) * c0 + (t - t0) * (t - t2) * c1 + (t - t0) * (t - t1) * c2
    }

    pub fn evaluate_first_derivative(&self, t: f64) -> f64 {
        let [t0, t1, t2] = self.t;
        let [c0, c1, c2] = self.c;
        c0 * (2.0 * t - t2 - t1) + c1 * (2.0 * t - t0 - t2) + c2 * (2.0 * t - t0 - t1)
    }

    /// Constant second derivative `2(c0 + c1 + c2)`.
    pub fn evaluate_second_derivative(&self) -> f64 {
        2.0 * (self.c[0] + self.c[1] + self.c[2])
    }
}
