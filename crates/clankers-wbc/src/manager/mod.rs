//! Trajectory managers.
//!
//! A manager owns one timed motion segment: it samples the robot state at
//! [`TrajectoryManager::initialize`], builds curves from there to a target,
//! and on every [`TrajectoryManager::update`] writes the time-sampled setpoint
//! into the task(s) it drives. Managers hold [`TaskId`](crate::TaskId)
//! handles; the container and robot model are borrowed per call.
//!
//! Re-initializing replaces the segment outright. There is no blending, so a
//! re-initialize mid-segment produces a setpoint discontinuity.

mod floating_base;
mod pose;
mod position;
mod reaction_force;
mod swing_foot;

pub use floating_base::{FloatingBaseTarget, FloatingBaseTrajectoryManager};
pub use pose::PoseTrajectoryManager;
pub use position::PositionTrajectoryManager;
pub use reaction_force::ReactionForceManager;
pub use swing_foot::SwingFootTrajectoryManager;

use clankers_curves::{HermiteCurveQuat, HermiteCurveVec, quat_to_xyzw};
use nalgebra::{DVector, UnitQuaternion, Vector3};
use tracing::{debug, warn};

use crate::container::{TaskForceContainer, TaskId};
use crate::error::WbcError;
use crate::model::RobotModel;
use crate::task::TaskKind;

/// Common lifecycle of every trajectory manager.
pub trait TrajectoryManager {
    /// End state of a segment.
    type Target;

    /// Start a segment at `start_time` lasting `duration` seconds, from the
    /// robot's current state to `target` with zero end rate.
    ///
    /// # Errors
    ///
    /// [`WbcError::InvalidDuration`] if `duration <= 0`, or any model lookup
    /// error for the driven target.
    fn initialize(
        &mut self,
        robot: &dyn RobotModel,
        start_time: f64,
        duration: f64,
        target: &Self::Target,
    ) -> Result<(), WbcError>;

    /// Write `target` straight through with zero velocity and acceleration.
    fn update_desired(
        &self,
        container: &mut TaskForceContainer,
        target: &Self::Target,
    ) -> Result<(), WbcError>;

    /// Freeze the driven task(s) at the robot's current pose.
    fn use_current(
        &self,
        container: &mut TaskForceContainer,
        robot: &dyn RobotModel,
    ) -> Result<(), WbcError>;

    /// Sample the segment at `current_time` and write the setpoint.
    ///
    /// # Errors
    ///
    /// [`WbcError::NotInitialized`] before the first `initialize`.
    fn update(&self, container: &mut TaskForceContainer, current_time: f64)
    -> Result<(), WbcError>;

    /// The active segment, if any.
    fn segment(&self) -> Option<&Segment>;

    fn is_initialized(&self) -> bool {
        self.segment().is_some()
    }
}

/// Timing of one motion segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start_time: f64,
    pub duration: f64,
}

impl Segment {
    pub(crate) fn new(start_time: f64, duration: f64) -> Result<Self, WbcError> {
        WbcError::check_duration(duration)?;
        Ok(Self {
            start_time,
            duration,
        })
    }

    /// Unclamped phase `(t − start) / duration`; curves clamp it.
    pub fn phase(&self, current_time: f64) -> f64 {
        (current_time - self.start_time) / self.duration
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    pub fn is_finished(&self, current_time: f64) -> bool {
        current_time >= self.end_time()
    }
}

/// Validate a new segment and log its start.
///
/// Replacing a segment that has not yet finished is legal but causes a
/// setpoint jump, so it is logged as a warning.
pub(crate) fn begin_segment(
    previous: Option<&Segment>,
    label: &TaskKind,
    start_time: f64,
    duration: f64,
) -> Result<Segment, WbcError> {
    let segment = Segment::new(start_time, duration)?;
    if let Some(prev) = previous {
        if !prev.is_finished(start_time) {
            warn!(
                target_task = %label,
                previous_end = prev.end_time(),
                start_time,
                "re-initialized before the previous segment finished"
            );
        }
    }
    debug!(target_task = %label, start_time, duration, "trajectory segment initialized");
    Ok(segment)
}

// Start rates are measured in time; curves run in phase. `v·T` going in,
// `/T` and `/T²` coming out.

pub(crate) fn hermite_from_state(
    start_pos: &Vector3<f64>,
    start_vel: &Vector3<f64>,
    end_pos: &Vector3<f64>,
    duration: f64,
) -> Result<HermiteCurveVec, WbcError> {
    Ok(HermiteCurveVec::new(
        &DVector::from_column_slice(start_pos.as_slice()),
        &DVector::from_iterator(3, start_vel.iter().map(|v| v * duration)),
        &DVector::from_column_slice(end_pos.as_slice()),
        &DVector::zeros(3),
    )?)
}

pub(crate) fn quat_hermite_from_state(
    start: UnitQuaternion<f64>,
    start_ang_vel: &Vector3<f64>,
    end: UnitQuaternion<f64>,
    duration: f64,
) -> HermiteCurveQuat {
    // The curve applies the start rate in the body frame; measured rates are world.
    let body_rate = start.inverse_transform_vector(&(start_ang_vel * duration));
    HermiteCurveQuat::new(start, body_rate, end, Vector3::zeros())
}

/// Time-domain `(pos, vel, acc)` of a vector curve at phase `s`.
pub(crate) fn sample_hermite(
    curve: &HermiteCurveVec,
    s: f64,
    duration: f64,
) -> (DVector<f64>, DVector<f64>, DVector<f64>) {
    (
        curve.evaluate(s),
        curve.evaluate_first_derivative(s).map(|v| v / duration),
        curve
            .evaluate_second_derivative(s)
            .map(|a| a / (duration * duration)),
    )
}

/// Time-domain `([x,y,z,w], ω, ω̇)` of an orientation curve at phase `s`.
pub(crate) fn sample_quat_hermite(
    curve: &HermiteCurveQuat,
    s: f64,
    duration: f64,
) -> ([f64; 4], Vector3<f64>, Vector3<f64>) {
    let q = quat_to_xyzw(&curve.evaluate(s));
    (
        [q.x, q.y, q.z, q.w],
        curve.evaluate_ang_vel(s).map(|w| w / duration),
        curve.evaluate_ang_acc(s).map(|a| a / (duration * duration)),
    )
}

/// Write a fixed position setpoint with zero rates.
pub(crate) fn hold_position(
    container: &mut TaskForceContainer,
    task: TaskId,
    pos: &Vector3<f64>,
) -> Result<(), WbcError> {
    container
        .task_mut(task)?
        .update_desired(pos.as_slice(), &[0.0; 3], &[0.0; 3])
}

/// Write a fixed orientation setpoint with zero rates.
pub(crate) fn hold_orientation(
    container: &mut TaskForceContainer,
    task: TaskId,
    ori: &UnitQuaternion<f64>,
) -> Result<(), WbcError> {
    let q = quat_to_xyzw(ori);
    container
        .task_mut(task)?
        .update_desired(&[q.x, q.y, q.z, q.w], &[0.0; 3], &[0.0; 3])
}

/// Look up a task's kind and check it against `accept`.
pub(crate) fn driven_kind(
    container: &TaskForceContainer,
    task: TaskId,
    accept: fn(&TaskKind) -> bool,
    expected: &str,
) -> Result<TaskKind, WbcError> {
    let kind = container.task(task)?.kind().clone();
    if accept(&kind) {
        Ok(kind)
    } else {
        Err(WbcError::InvalidArgument(format!(
            "{kind} cannot be driven as {expected}"
        )))
    }
}
