//! Structure-of-arrays curves for batched evaluation across robot instances.
//!
//! Every per-instance quantity is stored in a flat `Vec<f64>` with a leading
//! instance index: `[n_batch * dim]`, row `b` holding instance `b`. Each
//! instance is evaluated with exactly the scalar curve's arithmetic, so a
//! batch of `N` produces the same numbers as `N` independent scalar curves.
//!
//! Evaluation fans out over rayon; every worker writes only its own
//! instance's output row, so there is no shared mutable state.
//!
//! There is no batched [`HermiteCurveQuat`](crate::HermiteCurveQuat);
//! orientation curves are evaluated per instance.

use rayon::prelude::*;

use crate::error::CurveError;
use crate::hermite::HermiteCurve;
use crate::lagrange::QuadraticLagrange;
use crate::swing::{blend_acc, blend_pos, blend_vel};

/// Fill an `[n_batch, dim]` buffer, one rayon task per instance row.
fn fill_rows<F>(n_batch: usize, dim: usize, f: F) -> Vec<f64>
where
    F: Fn(usize, usize) -> f64 + Sync,
{
    let mut out = vec![0.0; n_batch * dim];
    if dim == 0 {
        return out;
    }
    out.par_chunks_mut(dim)
        .enumerate()
        .for_each(|(b, row)| {
            for (axis, value) in row.iter_mut().enumerate() {
                *value = f(b, axis);
            }
        });
    out
}

// ---------------------------------------------------------------------------
// BatchHermiteCurveVec
// ---------------------------------------------------------------------------

/// Batched [`HermiteCurveVec`](crate::HermiteCurveVec).
#[derive(Debug, Clone, PartialEq)]
pub struct BatchHermiteCurveVec {
    n_batch: usize,
    dim: usize,
    p1: Vec<f64>,
    v1: Vec<f64>,
    p2: Vec<f64>,
    v2: Vec<f64>,
}

impl BatchHermiteCurveVec {
    /// Build from flat `[n_batch * dim]` boundary buffers.
    ///
    /// # Errors
    ///
    /// [`CurveError::BatchMismatch`] if any buffer is not `n_batch * dim` long.
    pub fn new(
        n_batch: usize,
        dim: usize,
        start_pos: &[f64],
        start_vel: &[f64],
        end_pos: &[f64],
        end_vel: &[f64],
    ) -> Result<Self, CurveError> {
        let len = n_batch * dim;
        CurveError::check_batch("start_pos", len, start_pos.len())?;
        CurveError::check_batch("start_vel", len, start_vel.len())?;
        CurveError::check_batch("end_pos", len, end_pos.len())?;
        CurveError::check_batch("end_vel", len, end_vel.len())?;
        Ok(Self {
            n_batch,
            dim,
            p1: start_pos.to_vec(),
            v1: start_vel.to_vec(),
            p2: end_pos.to_vec(),
            v2: end_vel.to_vec(),
        })
    }

    pub const fn n_batch(&self) -> usize {
        self.n_batch
    }

    pub const fn dim(&self) -> usize {
        self.dim
    }

    fn axis(&self, b: usize, axis: usize) -> HermiteCurve {
        let i = b * self.dim + axis;
        HermiteCurve::new(self.p1[i], self.v1[i], self.p2[i], self.v2[i])
    }

    fn check_phases(&self, s: &[f64]) -> Result<(), CurveError> {
        CurveError::check_batch("phase", self.n_batch, s.len())
    }

    /// Positions at per-instance phases `s[b]`, as `[n_batch * dim]`.
    pub fn evaluate(&self, s: &[f64]) -> Result<Vec<f64>, CurveError> {
        self.check_phases(s)?;
        Ok(fill_rows(self.n_batch, self.dim, |b, a| {
            self.axis(b, a).evaluate(s[b])
        }))
    }

    pub fn evaluate_first_derivative(&self, s: &[f64]) -> Result<Vec<f64>, CurveError> {
        self.check_phases(s)?;
        Ok(fill_rows(self.n_batch, self.dim, |b, a| {
            self.axis(b, a).evaluate_first_derivative(s[b])
        }))
    }

    pub fn evaluate_second_derivative(&self, s: &[f64]) -> Result<Vec<f64>, CurveError> {
        self.check_phases(s)?;
        Ok(fill_rows(self.n_batch, self.dim, |b, a| {
            self.axis(b, a).evaluate_second_derivative(s[b])
        }))
    }
}

// ---------------------------------------------------------------------------
// BatchQuadraticLagrange
// ---------------------------------------------------------------------------

/// Batched [`QuadraticLagrange`].
#[derive(Debug, Clone, PartialEq)]
pub struct BatchQuadraticLagrange {
    t0: Vec<f64>,
    t1: Vec<f64>,
    t2: Vec<f64>,
    c0: Vec<f64>,
    c1: Vec<f64>,
    c2: Vec<f64>,
}

impl BatchQuadraticLagrange {
    /// Build from per-instance `(t, z)` waypoint columns, each `[n_batch]`.
    ///
    /// # Errors
    ///
    /// [`CurveError::BatchMismatch`] on ragged input and
    /// [`CurveError::NonIncreasingKnots`] for the first bad instance.
    pub fn new(
        (t0, z0): (&[f64], &[f64]),
        (t1, z1): (&[f64], &[f64]),
        (t2, z2): (&[f64], &[f64]),
    ) -> Result<Self, CurveError> {
        let n = t0.len();
        for (field, len) in [
            ("z0", z0.len()),
            ("t1", t1.len()),
            ("z1", z1.len()),
            ("t2", t2.len()),
            ("z2", z2.len()),
        ] {
            CurveError::check_batch(field, n, len)?;
        }

        let mut out = Self {
            t0: Vec::with_capacity(n),
            t1: Vec::with_capacity(n),
            t2: Vec::with_capacity(n),
            c0: Vec::with_capacity(n),
            c1: Vec::with_capacity(n),
            c2: Vec::with_capacity(n),
        };
        for b in 0..n {
            let pol = QuadraticLagrange::new((t0[b], z0[b]), (t1[b], z1[b]), (t2[b], z2[b]))?;
            let [k0, k1, k2] = pol.knots();
            let [c0, c1, c2] = pol.coefficients();
            out.t0.push(k0);
            out.t1.push(k1);
            out.t2.push(k2);
            out.c0.push(c0);
            out.c1.push(c1);
            out.c2.push(c2);
        }
        Ok(out)
    }

    pub fn n_batch(&self) -> usize {
        self.t0.len()
    }

    fn instance(&self, b: usize) -> QuadraticLagrange {
        QuadraticLagrange::from_parts(
            [self.t0[b], self.t1[b], self.t2[b]],
            [self.c0[b], self.c1[b], self.c2[b]],
        )
    }

    pub fn evaluate(&self, t: &[f64]) -> Result<Vec<f64>, CurveError> {
        CurveError::check_batch("time", self.n_batch(), t.len())?;
        Ok(fill_rows(self.n_batch(), 1, |b, _| self.instance(b).evaluate(t[b])))
    }

    pub fn evaluate_first_derivative(&self, t: &[f64]) -> Result<Vec<f64>, CurveError> {
        CurveError::check_batch("time", self.n_batch(), t.len())?;
        Ok(fill_rows(self.n_batch(), 1, |b, _| {
            self.instance(b).evaluate_first_derivative(t[b])
        }))
    }

    pub fn evaluate_second_derivative(&self) -> Vec<f64> {
        fill_rows(self.n_batch(), 1, |b, _| {
            self.instance(b).evaluate_second_derivative()
        })
    }
}

// ---------------------------------------------------------------------------
// BatchSwingTrajectory
// ---------------------------------------------------------------------------

/// Batched [`SwingTrajectory`](crate::SwingTrajectory); outputs are `[n_batch * 3]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSwingTrajectory {
    start: Vec<f64>,
    end: Vec<f64>,
    duration: Vec<f64>,
    height: BatchQuadraticLagrange,
}

impl BatchSwingTrajectory {
    /// Build from `[n_batch * 3]` start/end positions, `[n_batch]` apex
    /// heights and `[n_batch]` durations.
    ///
    /// # Errors
    ///
    /// [`CurveError::BatchMismatch`] on ragged input and
    /// [`CurveError::InvalidDuration`] for the first non-positive duration.
    pub fn new(
        start: &[f64],
        end: &[f64],
        apex_height: &[f64],
        duration: &[f64],
    ) -> Result<Self, CurveError> {
        let n = duration.len();
        CurveError::check_batch("start", n * 3, start.len())?;
        CurveError::check_batch("end", n * 3, end.len())?;
        CurveError::check_batch("apex_height", n, apex_height.len())?;
        for &d in duration {
            CurveError::check_duration(d)?;
        }

        let zeros = vec![0.0; n];
        let mid: Vec<f64> = duration.iter().map(|d| d * 0.5).collect();
        let z_start: Vec<f64> = start.chunks_exact(3).map(|p| p[2]).collect();
        let z_end: Vec<f64> = end.chunks_exact(3).map(|p| p[2]).collect();
        let height = BatchQuadraticLagrange::new(
            (zeros.as_slice(), z_start.as_slice()),
            (mid.as_slice(), apex_height),
            (duration, z_end.as_slice()),
        )?;

        Ok(Self {
            start: start.to_vec(),
            end: end.to_vec(),
            duration: duration.to_vec(),
            height,
        })
    }

    pub fn n_batch(&self) -> usize {
        self.duration.len()
    }

    fn clamped(&self, t: &[f64]) -> Result<Vec<f64>, CurveError> {
        CurveError::check_batch("time", self.n_batch(), t.len())?;
        Ok(t.iter()
            .zip(&self.duration)
            .map(|(t, d)| t.clamp(0.0, *d))
            .collect())
    }

    /// Positions `t[b]` seconds after each instance's lift-off.
    pub fn evaluate(&self, t: &[f64]) -> Result<Vec<f64>, CurveError> {
        let t = self.clamped(t)?;
        let z = self.height.evaluate(&t)?;
        Ok(fill_rows(self.n_batch(), 3, |b, a| {
            if a == 2 {
                z[b]
            } else {
                blend_pos(self.start[b * 3 + a], self.end[b * 3 + a], t[b], self.duration[b])
            }
        }))
    }

    pub fn evaluate_first_derivative(&self, t: &[f64]) -> Result<Vec<f64>, CurveError> {
        let t = self.clamped(t)?;
        let z = self.height.evaluate_first_derivative(&t)?;
        Ok(fill_rows(self.n_batch(), 3, |b, a| {
            if a == 2 {
                z[b]
            } else {
                blend_vel(self.start[b * 3 + a], self.end[b * 3 + a], t[b], self.duration[b])
            }
        }))
    }

    pub fn evaluate_second_derivative(&self, t: &[f64]) -> Result<Vec<f64>, CurveError> {
        let t = self.clamped(t)?;
        let z = self.height.evaluate_second_derivative();
        Ok(fill_rows(self.n_batch(), 3, |b, a| {
            if a == 2 {
                z[b]
            } else {
                blend_acc(self.start[b * 3 + a], self.end[b * 3 + a], t[b], self.duration[b])
            }
        }))
    }
}
