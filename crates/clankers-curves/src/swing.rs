//! Swing-foot trajectory.
//!
//! While a foot is in swing it travels from its lift-off position to a landing
//! target. The horizontal motion is a cosine blend, which starts and ends with
//! zero horizontal velocity:
//!
//! ```text
//! x(s) = 0.5 · (x_start + x_end + cos(πs) · (x_start − x_end)),   s = t / T
//! ```
//!
//! The height follows a [`QuadraticLagrange`] through lift-off height at
//! `t = 0`, the apex height at `t = T/2` and the touch-down height at `t = T`.

use std::f64::consts::PI;

use nalgebra::Vector3;

use crate::error::CurveError;
use crate::lagrange::QuadraticLagrange;

// Horizontal cosine blend. `t` is already clamped to `[0, duration]`.

pub(crate) fn blend_pos(start: f64, end: f64, t: f64, duration: f64) -> f64 {
    let c = (PI * t / duration).cos();
    0.5 * (start + end + c * (start - end))
}

pub(crate) fn blend_vel(start: f64, end: f64, t: f64, duration: f64) -> f64 {
    let w = PI / duration;
    0.5 * w * (w * t).sin() * (end - start)
}

pub(crate) fn blend_acc(start: f64, end: f64, t: f64, duration: f64) -> f64 {
    let w = PI / duration;
    0.5 * w * w * (w * t).cos() * (end - start)
}

/// Position, velocity and acceleration of one swing sample (time domain).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwingSample {
    pub pos: Vector3<f64>,
    pub vel: Vector3<f64>,
    pub acc: Vector3<f64>,
}

/// Planar cosine blend plus quadratic height profile.
#[derive(Debug, Clone, PartialEq)]
pub struct SwingTrajectory {
    start: Vector3<f64>,
    end: Vector3<f64>,
    apex_height: f64,
    duration: f64,
    height: QuadraticLagrange,
}

impl SwingTrajectory {
    /// Build a swing from `start` to `end` peaking at `apex_height` (world z)
    /// halfway through `duration` seconds.
    ///
    /// # Errors
    ///
    /// [`CurveError::InvalidDuration`] if `duration <= 0`.
    pub fn new(
        start: Vector3<f64>,
        end: Vector3<f64>,
        apex_height: f64,
        duration: f64,
    ) -> Result<Self, CurveError> {
        CurveError::check_duration(duration)?;
        let height = QuadraticLagrange::new(
            (0.0, start.z),
            (duration * 0.5, apex_height),
            (duration, end.z),
        )?;
        Ok(Self {
            start,
            end,
            apex_height,
            duration,
            height,
        })
    }

    pub const fn duration(&self) -> f64 {
        self.duration
    }

    pub const fn start(&self) -> &Vector3<f64> {
        &self.start
    }

    pub const fn end(&self) -> &Vector3<f64> {
        &self.end
    }

    pub const fn apex_height(&self) -> f64 {
        self.apex_height
    }

    /// Elapsed time clamped to the swing window.
    fn clamp_time(&self, t: f64) -> f64 {
        t.clamp(0.0, self.duration)
    }

    /// Foot position `t` seconds after lift-off.
    pub fn evaluate(&self, t: f64) -> Vector3<f64> {
        let t = self.clamp_time(t);
        Vector3::new(
            blend_pos(self.start.x, self.end.x, t, self.duration),
            blend_pos(self.start.y, self.end.y, t, self.duration),
            self.height.evaluate(t),
        )
    }

    /// Foot velocity `t` seconds after lift-off.
    pub fn evaluate_first_derivative(&self, t: f64) -> Vector3<f64> {
        let t = self.clamp_time(t);
        Vector3::new(
            blend_vel(self.start.x, self.end.x, t, self.duration),
            blend_vel(self.start.y, self.end.y, t, self.duration),
            self.height.evaluate_first_derivative(t),
        )
    }

    /// Foot acceleration `t` seconds after lift-off.
    pub fn evaluate_second_derivative(&self, t: f64) -> Vector3<f64> {
        let t = self.clamp_time(t);
        Vector3::new(
            blend_acc(self.start.x, self.end.x, t, self.duration),
            blend_acc(self.start.y, self.end.y, t, self.duration),
            self.height.evaluate_second_derivative(),
        )
    }

    /// All three quantities at once.
    pub fn sample(&self, t: f64) -> SwingSample {
        SwingSample {
            pos: self.evaluate(t),
            vel: self.evaluate_first_derivative(t),
            acc: self.evaluate_second_derivative(t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn swing() -> SwingTrajectory {
        SwingTrajectory::new(
            Vector3::new(0.1, 0.05, 0.0),
            Vector3::new(0.2, 0.08, 0.01),
            0.06,
            0.3,
        )
        .unwrap()
    }

    #[test]
    fn swing_starts_at_start() {
        let s = swing();
        assert_relative_eq!(s.evaluate(0.0), *s.start(), epsilon = 1e-12);
    }

    #[test]
    fn swing_ends_at_target() {
        let s = swing();
        assert_relative_eq!(s.evaluate(0.3), *s.end(), epsilon = 1e-12);
    }

    #[test]
    fn swing_apex_at_half_duration() {
        let s = swing();
        assert_relative_eq!(s.evaluate(0.15).z, 0.06, epsilon = 1e-12);
    }

    #[test]
    fn horizontal_velocity_zero_at_endpoints() {
        let s = swing();
        for t in [0.0, 0.3] {
            let v = s.evaluate_first_derivative(t);
            assert_relative_eq!(v.x, 0.0, epsilon = 1e-12);
            assert_relative_eq!(v.y, 0.0, epsilon = 1e-12);
        }
        assert!(s.evaluate_first_derivative(0.15).x > 0.0);
    }

    #[test]
    fn velocity_matches_finite_difference() {
        let s = swing();
        let h = 1e-6;
        for &t in &[0.05, 0.12, 0.27] {
            let fd = (s.evaluate(t + h) - s.evaluate(t - h)) / (2.0 * h);
            assert_relative_eq!(s.evaluate_first_derivative(t), fd, epsilon = 1e-6);
            let fd2 = (s.evaluate_first_derivative(t + h) - s.evaluate_first_derivative(t - h))
                / (2.0 * h);
            assert_relative_eq!(s.evaluate_second_derivative(t), fd2, epsilon = 1e-4);
        }
    }

    #[test]
    fn holds_after_touchdown() {
        let s = swing();
        assert_eq!(s.evaluate(0.5), s.evaluate(0.3));
        assert_eq!(s.evaluate(-0.1), s.evaluate(0.0));
        assert_eq!(s.sample(1.0), s.sample(0.3));
    }

    #[test]
    fn rejects_non_positive_duration() {
        let err = SwingTrajectory::new(Vector3::zeros(), Vector3::zeros(), 0.1, 0.0).unwrap_err();
        assert_eq!(err, CurveError::InvalidDuration(0.0));
    }
}
