use clankers_curves::{HermiteCurveQuat, HermiteCurveVec};
use nalgebra::Isometry3;
use tracing::trace;

use super::{
    Segment, TrajectoryManager, begin_segment, driven_kind, hermite_from_state, hold_orientation,
    hold_position, quat_hermite_from_state, sample_hermite, sample_quat_hermite,
};
use crate::container::{TaskForceContainer, TaskId};
use crate::error::WbcError;
use crate::model::RobotModel;
use crate::task::TaskKind;

#[derive(Debug, Clone)]
struct PoseCurves {
    segment: Segment,
    pos: HermiteCurveVec,
    ori: HermiteCurveQuat,
}

/// Drives the position and orientation tasks of one link (a hand or a
/// flat foot) to a target pose.
#[derive(Debug, Clone)]
pub struct PoseTrajectoryManager {
    pos_task: TaskId,
    ori_task: TaskId,
    pos_kind: TaskKind,
    ori_kind: TaskKind,
    active: Option<PoseCurves>,
}

impl PoseTrajectoryManager {
    /// # Errors
    ///
    /// [`WbcError::InvalidArgument`] unless `pos_task` is a link-position
    /// task and `ori_task` a link-orientation task on the same link.
    pub fn new(
        container: &TaskForceContainer,
        pos_task: TaskId,
        ori_task: TaskId,
    ) -> Result<Self, WbcError> {
        let pos_kind = driven_kind(
            container,
            pos_task,
            |k| matches!(k, TaskKind::LinkPosition(_)),
            "a link position",
        )?;
        let ori_kind = driven_kind(container, ori_task, TaskKind::is_orientation, "an orientation")?;
        if pos_kind.link() != ori_kind.link() {
            return Err(WbcError::InvalidArgument(format!(
                "{pos_kind} and {ori_kind} target different links"
            )));
        }
        Ok(Self {
            pos_task,
            ori_task,
            pos_kind,
            ori_kind,
            active: None,
        })
    }

    /// The driven link.
    pub fn link(&self) -> &str {
        self.pos_kind.link().unwrap_or_default()
    }
}

impl TrajectoryManager for PoseTrajectoryManager {
    type Target = Isometry3<f64>;

    fn initialize(
        &mut self,
        robot: &dyn RobotModel,
        start_time: f64,
        duration: f64,
        target: &Isometry3<f64>,
    ) -> Result<(), WbcError> {
        let segment = begin_segment(self.segment(), &self.pos_kind, start_time, duration)?;
        let (pos, vel) = self.pos_kind.measure_position(robot)?;
        let (ori, ang_vel) = self.ori_kind.measure_orientation(robot)?;
        self.active = Some(PoseCurves {
            segment,
            pos: hermite_from_state(&pos, &vel, &target.translation.vector, duration)?,
            ori: quat_hermite_from_state(ori, &ang_vel, target.rotation, duration),
        });
        Ok(())
    }

    fn update_desired(
        &self,
        container: &mut TaskForceContainer,
        target: &Isometry3<f64>,
    ) -> Result<(), WbcError> {
        hold_position(container, self.pos_task, &target.translation.vector)?;
        hold_orientation(container, self.ori_task, &target.rotation)
    }

    fn use_current(
        &self,
        container: &mut TaskForceContainer,
        robot: &dyn RobotModel,
    ) -> Result<(), WbcError> {
        let (pos, _) = self.pos_kind.measure_position(robot)?;
        let (ori, _) = self.ori_kind.measure_orientation(robot)?;
        hold_position(container, self.pos_task, &pos)?;
        hold_orientation(container, self.ori_task, &ori)
    }

    fn update(
        &self,
        container: &mut TaskForceContainer,
        current_time: f64,
    ) -> Result<(), WbcError> {
        let active = self.active.as_ref().ok_or(WbcError::NotInitialized)?;
        let s = active.segment.phase(current_time);
        let duration = active.segment.duration;

        let (pos, vel, acc) = sample_hermite(&active.pos, s, duration);
        let (quat, ang_vel, ang_acc) = sample_quat_hermite(&active.ori, s, duration);
        trace!(link = self.link(), s, "pose setpoint");

        container
            .task_mut(self.pos_task)?
            .update_desired(pos.as_slice(), vel.as_slice(), acc.as_slice())?;
        container
            .task_mut(self.ori_task)?
            .update_desired(&quat, ang_vel.as_slice(), ang_acc.as_slice())
    }

    fn segment(&self) -> Option<&Segment> {
        self.active.as_ref().map(|a| &a.segment)
    }
}
