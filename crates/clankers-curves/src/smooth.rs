//! Cosine "smooth changing" blend between two scalars.
//!
//! `ini + (end − ini) · 0.5 · (1 − cos(π t / T))` for `t ∈ [0, T]`; after `T`
//! the value holds at `end` with zero rate. Before `0` it holds at `ini`.
//! Used to ramp contact force limits in and out.

use std::f64::consts::PI;

use crate::error::CurveError;

/// A scalar cosine ramp from `ini` to `end` over `duration` seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothChanging {
    ini: f64,
    end: f64,
    duration: f64,
}

impl SmoothChanging {
    /// # Errors
    ///
    /// [`CurveError::InvalidDuration`] if `duration <= 0`.
    pub fn new(ini: f64, end: f64, duration: f64) -> Result<Self, CurveError> {
        CurveError::check_duration(duration)?;
        Ok(Self { ini, end, duration })
    }

    pub const fn duration(&self) -> f64 {
        self.duration
    }

    pub fn evaluate(&self, t: f64) -> f64 {
        if t >= self.duration {
            return self.end;
        }
        let t = t.max(0.0);
        self.ini + (self.end - self.ini) * 0.5 * (1.0 - (PI * t / self.duration).cos())
    }

    pub fn evaluate_first_derivative(&self, t: f64) -> f64 {
        if t >= self.duration || t <= 0.0 {
            return 0.0;
        }
        let w = PI / self.duration;
        (self.end - self.ini) * 0.5 * w * (w * t).sin()
    }

    pub fn evaluate_second_derivative(&self, t: f64) -> f64 {
        if t > self.duration || t < 0.0 {
            return 0.0;
        }
        let w = PI / self.duration;
        (self.end - self.ini) * 0.5 * w * w * (w * t).cos()
    }
}
