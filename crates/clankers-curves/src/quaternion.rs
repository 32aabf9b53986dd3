//! Geometric cubic Hermite curve on unit quaternions.
//!
//! The curve is the rotational analogue of a cubic Bezier segment. Two interior
//! control orientations are placed one third of the boundary angular rates
//! away from each end:
//!
//! ```text
//! q1 = q0 ∘ exp(ω_a / 3)        q2 = q3 ∘ exp(−ω_b / 3)
//! Δ1 = q1·q0⁻¹   Δ2 = q2·q1⁻¹   Δ3 = q3·q2⁻¹      ωᵢ = log(Δᵢ)
//!
//! q(s) = exp(b3·ω3) ∘ exp(b2·ω2) ∘ exp(b1·ω1) ∘ q0
//! b1 = 1 − (1 − s)³    b2 = 3s² − 2s³    b3 = s³
//! ```
//!
//! Angular velocity and acceleration are `Σ ωᵢ·ḃᵢ` and `Σ ωᵢ·b̈ᵢ`. This is
//! exact only for small segment rotations; controller gains downstream are
//! tuned against it, so it is kept as is.
//!
//! Quaternions cross the crate boundary in scalar-last `[x, y, z, w]` order.

use nalgebra::{Quaternion, Unit, UnitQuaternion, Vector3, Vector4};

use crate::hermite::clamp_phase;

/// Rotation-vector norm below which a rotation is treated as identity.
pub const ROTATION_EPSILON: f64 = 1e-6;

/// Exponential map with the identity substituted near zero angle.
pub fn rotvec_to_quat(rotvec: &Vector3<f64>) -> UnitQuaternion<f64> {
    let angle = rotvec.norm();
    if angle < ROTATION_EPSILON {
        UnitQuaternion::identity()
    } else {
        UnitQuaternion::from_axis_angle(&Unit::new_unchecked(rotvec / angle), angle)
    }
}

/// Logarithm map (shortest-path rotation vector, angle in `[0, π]`).
pub fn quat_to_rotvec(q: &UnitQuaternion<f64>) -> Vector3<f64> {
    q.scaled_axis()
}

/// Build a unit quaternion from scalar-last `[x, y, z, w]` components.
///
/// The input is renormalized.
pub fn quat_from_xyzw(x: f64, y: f64, z: f64, w: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z))
}

/// Scalar-last `[x, y, z, w]` components of a unit quaternion.
pub fn quat_to_xyzw(q: &UnitQuaternion<f64>) -> Vector4<f64> {
    q.as_ref().coords
}

/// Basis weights and their phase derivatives at one phase.
#[derive(Debug, Clone, Copy)]
struct Basis {
    b: [f64; 3],
    bdot: [f64; 3],
    bddot: [f64; 3],
}

impl Basis {
    fn at(s: f64) -> Self {
        let s = clamp_phase(s);
        let r = 1.0 - s;
        Self {
            b: [1.0 - r * r * r, 3.0 * s * s - 2.0 * s * s * s, s * s * s],
            bdot: [3.0 * r * r, 6.0 * s - 6.0 * s * s, 3.0 * s * s],
            bddot: [-6.0 * r, 6.0 - 12.0 * s, 6.0 * s],
        }
    }
}

/// Cubic Hermite orientation curve.
///
/// # Example
///
/// ```
/// use clankers_curves::HermiteCurveQuat;
/// use nalgebra::{UnitQuaternion, Vector3};
///
/// let q0 = UnitQuaternion::identity();
/// let q3 = UnitQuaternion::from_euler_angles(0.0, 0.0, 1.0);
/// let curve = HermiteCurveQuat::new(q0, Vector3::zeros(), q3, Vector3::zeros());
/// assert!(curve.evaluate(1.0).angle_to(&q3) < 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct HermiteCurveQuat {
    q0: UnitQuaternion<f64>,
    q3: UnitQuaternion<f64>,
    omega_a: Vector3<f64>,
    omega_b: Vector3<f64>,
    omega: [Vector3<f64>; 3],
}

impl HermiteCurveQuat {
    /// Build a curve from start orientation/rate and end orientation/rate.
    pub fn new(
        quat_start: UnitQuaternion<f64>,
        ang_vel_start: Vector3<f64>,
        quat_end: UnitQuaternion<f64>,
        ang_vel_end: Vector3<f64>,
    ) -> Self {
        let q0 = quat_start;
        let q3 = quat_end;
        let q1 = q0 * rotvec_to_quat(&(ang_vel_start / 3.0));
        let q2 = q3 * rotvec_to_quat(&(-ang_vel_end / 3.0));

        let omega = [
            quat_to_rotvec(&(q1 * q0.inverse())),
            quat_to_rotvec(&(q2 * q1.inverse())),
            quat_to_rotvec(&(q3 * q2.inverse())),
        ];

        Self {
            q0,
            q3,
            omega_a: ang_vel_start,
            omega_b: ang_vel_end,
            omega,
        }
    }

    /// Build a curve from scalar-last quaternion components.
    pub fn from_xyzw(
        quat_start: &Vector4<f64>,
        ang_vel_start: Vector3<f64>,
        quat_end: &Vector4<f64>,
        ang_vel_end: Vector3<f64>,
    ) -> Self {
        Self::new(
            quat_from_xyzw(quat_start.x, quat_start.y, quat_start.z, quat_start.w),
            ang_vel_start,
            quat_from_xyzw(quat_end.x, quat_end.y, quat_end.z, quat_end.w),
            ang_vel_end,
        )
    }

    pub const fn start(&self) -> &UnitQuaternion<f64> {
        &self.q0
    }

    pub const fn end(&self) -> &UnitQuaternion<f64> {
        &self.q3
    }

    pub const fn start_rate(&self) -> &Vector3<f64> {
        &self.omega_a
    }

    pub const fn end_rate(&self) -> &Vector3<f64> {
        &self.omega_b
    }

    /// Incremental rotation vectors `ω1, ω2, ω3` between control orientations.
    pub const fn segment_rotvecs(&self) -> &[Vector3<f64>; 3] {
        &self.omega
    }

    /// Orientation at phase `s` (clamped).
    pub fn evaluate(&self, s: f64) -> UnitQuaternion<f64> {
        let basis = Basis::at(s);
        let partial = |i: usize| {
            if self.omega[i].norm() < ROTATION_EPSILON {
                UnitQuaternion::identity()
            } else {
                UnitQuaternion::from_scaled_axis(self.omega[i] * basis.b[i])
            }
        };
        partial(2) * partial(1) * partial(0) * self.q0
    }

    /// Orientation at phase `s` as scalar-last `[x, y, z, w]`.
    pub fn evaluate_xyzw(&self, s: f64) -> Vector4<f64> {
        quat_to_xyzw(&self.evaluate(s))
    }

    /// Angular velocity (per unit phase) at `s`.
    pub fn evaluate_ang_vel(&self, s: f64) -> Vector3<f64> {
        let basis = Basis::at(s);
        self.weighted(&basis.bdot)
    }

    /// Angular acceleration (per unit phase squared) at `s`.
    pub fn evaluate_ang_acc(&self, s: f64) -> Vector3<f64> {
        let basis = Basis::at(s);
        self.weighted(&basis.bddot)
    }

    fn weighted(&self, w: &[f64; 3]) -> Vector3<f64> {
        self.omega[0] * w[0] + self.omega[1] * w[1] + self.omega[2] * w[2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn yaw(angle: f64) -> UnitQuaternion<f64> {
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angle)
    }

    #[test]
    fn reproduces_boundary_orientations() {
        let q0 = UnitQuaternion::from_euler_angles(0.1, -0.2, 0.3);
        let q3 = UnitQuaternion::from_euler_angles(-0.4, 0.5, 1.2);
        let curve = HermiteCurveQuat::new(
            q0,
            Vector3::new(0.3, 0.0, -0.2),
            q3,
            Vector3::new(0.0, 0.4, 0.1),
        );
        assert!(curve.evaluate(0.0).angle_to(&q0) < 1e-9);
        assert!(curve.evaluate(1.0).angle_to(&q3) < 1e-9);
    }

    #[test]
    fn clamps_outside_unit_interval() {
        let curve = HermiteCurveQuat::new(
            yaw(0.0),
            Vector3::new(0.0, 0.0, 0.6),
            yaw(FRAC_PI_2),
            Vector3::zeros(),
        );
        assert_eq!(curve.evaluate(-1.0), curve.evaluate(0.0));
        assert_eq!(curve.evaluate(3.0), curve.evaluate(1.0));
        assert_eq!(curve.evaluate_ang_vel(1.2), curve.evaluate_ang_vel(1.0));
        assert_eq!(curve.evaluate_ang_acc(-0.2), curve.evaluate_ang_acc(0.0));
    }

    #[test]
    fn identity_with_zero_rates_stays_identity() {
        let curve = HermiteCurveQuat::new(
            UnitQuaternion::identity(),
            Vector3::zeros(),
            UnitQuaternion::identity(),
            Vector3::zeros(),
        );
        for i in 0..=10 {
            let s = f64::from(i) / 10.0;
            assert!(curve.evaluate(s).angle() < 1e-12);
            assert_relative_eq!(curve.evaluate_ang_vel(s).norm(), 0.0, epsilon = 1e-12);
            assert_relative_eq!(curve.evaluate_ang_acc(s).norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn start_rate_is_recovered_at_phase_zero() {
        let w = Vector3::new(0.0, 0.0, 0.3);
        let curve = HermiteCurveQuat::new(yaw(0.0), w, yaw(0.5), Vector3::zeros());
        // ḃ1(0) = 3, ω1 = ω_a / 3 for a start at identity
        assert_relative_eq!(curve.evaluate_ang_vel(0.0), w, epsilon = 1e-12);
        assert_relative_eq!(curve.evaluate_ang_vel(1.0).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn planar_rotation_is_monotonic() {
        let curve = HermiteCurveQuat::new(yaw(0.0), Vector3::zeros(), yaw(1.0), Vector3::zeros());
        let mut prev = -1.0;
        for i in 0..=20 {
            let s = f64::from(i) / 20.0;
            let angle = curve.evaluate(s).scaled_axis().z;
            assert!(angle >= prev - 1e-12);
            prev = angle;
        }
        assert_relative_eq!(curve.evaluate(0.5).scaled_axis().z, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn tiny_rates_use_identity_control_points() {
        let curve = HermiteCurveQuat::new(
            yaw(0.2),
            Vector3::new(1e-9, 0.0, 0.0),
            yaw(0.2),
            Vector3::new(0.0, -1e-9, 0.0),
        );
        for w in curve.segment_rotvecs() {
            assert_relative_eq!(w.norm(), 0.0, epsilon = 1e-12);
        }
        assert!(curve.evaluate(0.4).angle_to(&yaw(0.2)) < 1e-12);
    }

    #[test]
    fn xyzw_round_trip_is_scalar_last() {
        let q = quat_from_xyzw(0.0, 0.0, 0.0, 1.0);
        assert_eq!(q, UnitQuaternion::identity());
        let c = quat_to_xyzw(&yaw(FRAC_PI_2));
        assert_relative_eq!(c.w, (FRAC_PI_2 / 2.0).cos(), epsilon = 1e-12);
        assert_relative_eq!(c.z, (FRAC_PI_2 / 2.0).sin(), epsilon = 1e-12);
    }

    #[test]
    fn rotvec_round_trip() {
        let v = Vector3::new(0.2, -0.1, 0.4);
        assert_relative_eq!(quat_to_rotvec(&rotvec_to_quat(&v)), v, epsilon = 1e-12);
        assert_eq!(rotvec_to_quat(&Vector3::new(1e-8, 0.0, 0.0)), UnitQuaternion::identity());
    }
}
