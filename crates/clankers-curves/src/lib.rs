//! Reference-trajectory curves for whole-body control of legged robots.
//!
//! Every curve is an immutable value built once from boundary conditions and
//! then sampled every control tick. Phase-parameterized curves clamp their
//! input to `[0, 1]` and therefore hold their end state instead of
//! extrapolating.
//!
//! # Curves
//!
//! ```text
//! HermiteCurve ──► HermiteCurveVec          (positions, per-axis)
//! HermiteCurveQuat                           (orientations)
//! QuadraticLagrange ──► SwingTrajectory      (swing-foot height + cosine xy)
//! SmoothChanging                             (scalar cosine ramps)
//! ```
//!
//! [`batch`] holds structure-of-arrays versions of the position curves for
//! evaluating many independent robot instances at once.

pub mod batch;
pub mod error;
pub mod hermite;
pub mod lagrange;
pub mod quaternion;
pub mod smooth;
pub mod swing;

pub use batch::{BatchHermiteCurveVec, BatchQuadraticLagrange, BatchSwingTrajectory};
pub use error::CurveError;
pub use hermite::{HermiteCurve, HermiteCurveVec, clamp_phase};
pub use lagrange::QuadraticLagrange;
pub use quaternion::{
    HermiteCurveQuat, ROTATION_EPSILON, quat_from_xyzw, quat_to_rotvec, quat_to_xyzw,
    rotvec_to_quat,
};
pub use smooth::SmoothChanging;
pub use swing::{SwingSample, SwingTrajectory};
