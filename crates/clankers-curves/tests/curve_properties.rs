//! Property tests: boundary reproduction and clamping hold for arbitrary
//! boundary conditions, not just hand-picked ones.

use approx::relative_eq;
use clankers_curves::{HermiteCurve, HermiteCurveQuat, QuadraticLagrange, SwingTrajectory};
use nalgebra::{UnitQuaternion, Vector3};
use proptest::prelude::*;

fn finite() -> impl Strategy<Value = f64> {
    -10.0..10.0f64
}

fn rotvec() -> impl Strategy<Value = Vector3<f64>> {
    (-1.5..1.5f64, -1.5..1.5f64, -1.5..1.5f64).prop_map(|(x, y, z)| Vector3::new(x, y, z))
}

proptest! {
    #[test]
    fn hermite_reproduces_boundary(p1 in finite(), v1 in finite(), p2 in finite(), v2 in finite()) {
        let c = HermiteCurve::new(p1, v1, p2, v2);
        prop_assert!(relative_eq!(c.evaluate(0.0), p1, epsilon = 1e-9));
        prop_assert!(relative_eq!(c.evaluate(1.0), p2, epsilon = 1e-9));
        prop_assert!(relative_eq!(c.evaluate_first_derivative(0.0), v1, epsilon = 1e-9));
        prop_assert!(relative_eq!(c.evaluate_first_derivative(1.0), v2, epsilon = 1e-9));
    }

    #[test]
    fn hermite_holds_outside_phase_window(
        p1 in finite(), v1 in finite(), p2 in finite(), v2 in finite(),
        below in -5.0..0.0f64, above in 1.0..5.0f64,
    ) {
        let c = HermiteCurve::new(p1, v1, p2, v2);
        prop_assert_eq!(c.evaluate(below), c.evaluate(0.0));
        prop_assert_eq!(c.evaluate(above), c.evaluate(1.0));
    }

    #[test]
    fn quaternion_reproduces_boundary(
        a in rotvec(), b in rotvec(), wa in rotvec(), wb in rotvec(),
    ) {
        let q0 = UnitQuaternion::from_scaled_axis(a);
        let q3 = UnitQuaternion::from_scaled_axis(b);
        let curve = HermiteCurveQuat::new(q0, wa, q3, wb);
        // angle_to is sign-agnostic, so q and -q compare equal.
        prop_assert!(curve.evaluate(0.0).angle_to(&q0) < 1e-6);
        prop_assert!(curve.evaluate(1.0).angle_to(&q3) < 1e-6);
        prop_assert_eq!(curve.evaluate(-0.3), curve.evaluate(0.0));
        prop_assert_eq!(curve.evaluate(1.3), curve.evaluate(1.0));
    }

    #[test]
    fn lagrange_interpolates_waypoints(
        t0 in -1.0..0.0f64, dt1 in 0.05..1.0f64, dt2 in 0.05..1.0f64,
        z0 in finite(), z1 in finite(), z2 in finite(), probe in -1.0..3.0f64,
    ) {
        let t1 = t0 + dt1;
        let t2 = t1 + dt2;
        let pol = QuadraticLagrange::new((t0, z0), (t1, z1), (t2, z2)).unwrap();
        prop_assert!(relative_eq!(pol.evaluate(t0), z0, epsilon = 1e-8));
        prop_assert!(relative_eq!(pol.evaluate(t1), z1, epsilon = 1e-8));
        prop_assert!(relative_eq!(pol.evaluate(t2), z2, epsilon = 1e-8));
        // Second derivative does not depend on time at all.
        let acc = pol.evaluate_second_derivative();
        let h = 1e-4;
        let fd = (pol.evaluate_first_derivative(probe + h) - pol.evaluate_first_derivative(probe - h)) / (2.0 * h);
        prop_assert!(relative_eq!(acc, fd, epsilon = 1e-5, max_relative = 1e-6));
    }

    #[test]
    fn swing_has_zero_horizontal_speed_at_ends(
        sx in finite(), sy in finite(), ex in finite(), ey in finite(),
        apex in 0.0..0.3f64, duration in 0.1..2.0f64,
    ) {
        let swing = SwingTrajectory::new(
            Vector3::new(sx, sy, 0.0),
            Vector3::new(ex, ey, 0.0),
            apex,
            duration,
        ).unwrap();
        for t in [0.0, duration] {
            let v = swing.evaluate_first_derivative(t);
            prop_assert!(v.x.abs() < 1e-9 && v.y.abs() < 1e-9);
        }
        prop_assert!(relative_eq!(swing.evaluate(duration * 0.5).z, apex, epsilon = 1e-9));
    }
}
