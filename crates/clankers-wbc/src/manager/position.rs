use clankers_curves::HermiteCurveVec;
use nalgebra::Vector3;
use tracing::trace;

use super::{
    Segment, TrajectoryManager, begin_segment, driven_kind, hermite_from_state, hold_position,
    sample_hermite,
};
use crate::container::{TaskForceContainer, TaskId};
use crate::error::WbcError;
use crate::model::RobotModel;
use crate::task::TaskKind;

/// Drives one COM or link-position task along a cubic Hermite segment.
#[derive(Debug, Clone)]
pub struct PositionTrajectoryManager {
    task: TaskId,
    kind: TaskKind,
    active: Option<(Segment, HermiteCurveVec)>,
}

impl PositionTrajectoryManager {
    /// # Errors
    ///
    /// [`WbcError::InvalidArgument`] if `task` is an orientation task.
    pub fn new(container: &TaskForceContainer, task: TaskId) -> Result<Self, WbcError> {
        let kind = driven_kind(container, task, |k| !k.is_orientation(), "a position")?;
        Ok(Self {
            task,
            kind,
            active: None,
        })
    }

    pub const fn task(&self) -> TaskId {
        self.task
    }

    pub fn curve(&self) -> Option<&HermiteCurveVec> {
        self.active.as_ref().map(|(_, curve)| curve)
    }
}

impl TrajectoryManager for PositionTrajectoryManager {
    type Target = Vector3<f64>;

    fn initialize(
        &mut self,
        robot: &dyn RobotModel,
        start_time: f64,
        duration: f64,
        target: &Vector3<f64>,
    ) -> Result<(), WbcError> {
        let segment = begin_segment(self.segment(), &self.kind, start_time, duration)?;
        let (pos, vel) = self.kind.measure_position(robot)?;
        let curve = hermite_from_state(&pos, &vel, target, duration)?;
        self.active = Some((segment, curve));
        Ok(())
    }

    fn update_desired(
        &self,
        container: &mut TaskForceContainer,
        target: &Vector3<f64>,
    ) -> Result<(), WbcError> {
        hold_position(container, self.task, target)
    }

    fn use_current(
        &self,
        container: &mut TaskForceContainer,
        robot: &dyn RobotModel,
    ) -> Result<(), WbcError> {
        let (pos, _) = self.kind.measure_position(robot)?;
        hold_position(container, self.task, &pos)
    }

    fn update(
        &self,
        container: &mut TaskForceContainer,
        current_time: f64,
    ) -> Result<(), WbcError> {
        let (segment, curve) = self.active.as_ref().ok_or(WbcError::NotInitialized)?;
        let s = segment.phase(current_time);
        let (pos, vel, acc) = sample_hermite(curve, s, segment.duration);
        trace!(target_task = %self.kind, s, "position setpoint");
        container
            .task_mut(self.task)?
            .update_desired(pos.as_slice(), vel.as_slice(), acc.as_slice())
    }

    fn segment(&self) -> Option<&Segment> {
        self.active.as_ref().map(|(segment, _)| segment)
    }
}
