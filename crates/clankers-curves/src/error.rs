use thiserror::Error;

/// Errors raised while constructing a curve.
///
/// Evaluation never fails: phases are clamped and rotational singularities
/// are absorbed inside the curve. Only malformed boundary conditions are
/// rejected, and always at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CurveError {
    #[error("Boundary dimension mismatch for {field}: expected {expected}, got {got}")]
    DimensionMismatch {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Invalid duration: {0} (must be > 0)")]
    InvalidDuration(f64),

    #[error("Interpolation knots must be strictly increasing: t0={t0}, t1={t1}, t2={t2}")]
    NonIncreasingKnots { t0: f64, t1: f64, t2: f64 },

    #[error("Batch size mismatch for {field}: expected {expected}, got {got}")]
    BatchMismatch {
        field: &'static str,
        expected: usize,
        got: usize,
    },
}

impl CurveError {
    /// Check a boundary vector length against the curve dimension.
    pub(crate) fn check_dim(field: &'static str, expected: usize, got: usize) -> Result<(), Self> {
        if expected == got {
            Ok(())
        } else {
            Err(Self::DimensionMismatch {
                field,
                expected,
                got,
            })
        }
    }

    /// Check a flat batched buffer length against `n_batch * dim`.
    pub(crate) fn check_batch(field: &'static str, expected: usize, got: usize) -> Result<(), Self> {
        if expected == got {
            Ok(())
        } else {
            Err(Self::BatchMismatch {
                field,
                expected,
                got,
            })
        }
    }

    /// Reject non-positive (or NaN) durations.
    pub(crate) fn check_duration(duration: f64) -> Result<(), Self> {
        if duration > 0.0 {
            Ok(())
        } else {
            Err(Self::InvalidDuration(duration))
        }
    }
}
