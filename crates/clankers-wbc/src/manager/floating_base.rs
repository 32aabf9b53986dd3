use clankers_curves::{HermiteCurveQuat, HermiteCurveVec};
use nalgebra::{UnitQuaternion, Vector3};
use tracing::trace;

use super::{
    Segment, TrajectoryManager, begin_segment, driven_kind, hermite_from_state, hold_orientation,
    hold_position, quat_hermite_from_state, sample_hermite, sample_quat_hermite,
};
use crate::container::{TaskForceContainer, TaskId};
use crate::error::WbcError;
use crate::model::RobotModel;
use crate::task::TaskKind;

/// Target of a floating-base segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatingBaseTarget {
    pub com_pos: Vector3<f64>,
    pub base_ori: UnitQuaternion<f64>,
}

#[derive(Debug, Clone)]
struct BaseCurves {
    segment: Segment,
    com: HermiteCurveVec,
    ori: HermiteCurveQuat,
}

/// Moves the COM and the base orientation together, e.g. to shift weight
/// before a swing or to recover the nominal stance.
#[derive(Debug, Clone)]
pub struct FloatingBaseTrajectoryManager {
    com_task: TaskId,
    base_ori_task: TaskId,
    base_ori_kind: TaskKind,
    active: Option<BaseCurves>,
}

impl FloatingBaseTrajectoryManager {
    /// # Errors
    ///
    /// [`WbcError::InvalidArgument`] unless `com_task` is the COM task and
    /// `base_ori_task` an orientation task.
    pub fn new(
        container: &TaskForceContainer,
        com_task: TaskId,
        base_ori_task: TaskId,
    ) -> Result<Self, WbcError> {
        driven_kind(container, com_task, |k| *k == TaskKind::Com, "the COM")?;
        let base_ori_kind =
            driven_kind(container, base_ori_task, TaskKind::is_orientation, "an orientation")?;
        Ok(Self {
            com_task,
            base_ori_task,
            base_ori_kind,
            active: None,
        })
    }
}

impl TrajectoryManager for FloatingBaseTrajectoryManager {
    type Target = FloatingBaseTarget;

    fn initialize(
        &mut self,
        robot: &dyn RobotModel,
        start_time: f64,
        duration: f64,
        target: &FloatingBaseTarget,
    ) -> Result<(), WbcError> {
        let segment = begin_segment(self.segment(), &TaskKind::Com, start_time, duration)?;
        let (com, com_vel) = TaskKind::Com.measure_position(robot)?;
        let (ori, ang_vel) = self.base_ori_kind.measure_orientation(robot)?;
        self.active = Some(BaseCurves {
            segment,
            com: hermite_from_state(&com, &com_vel, &target.com_pos, duration)?,
            ori: quat_hermite_from_state(ori, &ang_vel, target.base_ori, duration),
        });
        Ok(())
    }

    fn update_desired(
        &self,
        container: &mut TaskForceContainer,
        target: &FloatingBaseTarget,
    ) -> Result<(), WbcError> {
        hold_position(container, self.com_task, &target.com_pos)?;
        hold_orientation(container, self.base_ori_task, &target.base_ori)
    }

    fn use_current(
        &self,
        container: &mut TaskForceContainer,
        robot: &dyn RobotModel,
    ) -> Result<(), WbcError> {
        hold_position(container, self.com_task, &robot.get_com_pos())?;
        let (ori, _) = self.base_ori_kind.measure_orientation(robot)?;
        hold_orientation(container, self.base_ori_task, &ori)
    }

    fn update(
        &self,
        container: &mut TaskForceContainer,
        current_time: f64,
    ) -> Result<(), WbcError> {
        let active = self.active.as_ref().ok_or(WbcError::NotInitialized)?;
        let s = active.segment.phase(current_time);
        let duration = active.segment.duration;

        let (com, com_vel, com_acc) = sample_hermite(&active.com, s, duration);
        let (quat, ang_vel, ang_acc) = sample_quat_hermite(&active.ori, s, duration);
        trace!(s, "floating base setpoint");

        container
            .task_mut(self.com_task)?
            .update_desired(com.as_slice(), com_vel.as_slice(), com_acc.as_slice())?;
        container
            .task_mut(self.base_ori_task)?
            .update_desired(&quat, ang_vel.as_slice(), ang_acc.as_slice())
    }

    fn segment(&self) -> Option<&Segment> {
        self.active.as_ref().map(|a| &a.segment)
    }
}
