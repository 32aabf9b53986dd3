use clankers_curves::SwingTrajectory;
use nalgebra::Vector3;
use tracing::trace;

use super::{Segment, TrajectoryManager, begin_segment, driven_kind, hold_position};
use crate::container::{TaskForceContainer, TaskId};
use crate::error::WbcError;
use crate::model::RobotModel;
use crate::task::TaskKind;

/// Drives a foot-position task through a swing: cosine blend in the plane,
/// quadratic height profile peaking `swing_height` above the higher of
/// lift-off and landing at mid-swing.
///
/// The swing always leaves and lands with zero horizontal velocity; the
/// foot's measured velocity at lift-off is not used.
#[derive(Debug, Clone)]
pub struct SwingFootTrajectoryManager {
    task: TaskId,
    kind: TaskKind,
    swing_height: f64,
    active: Option<(Segment, SwingTrajectory)>,
}

impl SwingFootTrajectoryManager {
    /// # Errors
    ///
    /// [`WbcError::InvalidArgument`] unless `task` is a link-position task
    /// and `swing_height` is finite and non-negative.
    pub fn new(
        container: &TaskForceContainer,
        task: TaskId,
        swing_height: f64,
    ) -> Result<Self, WbcError> {
        let kind = driven_kind(
            container,
            task,
            |k| matches!(k, TaskKind::LinkPosition(_)),
            "a foot position",
        )?;
        if !(swing_height >= 0.0 && swing_height.is_finite()) {
            return Err(WbcError::InvalidArgument(format!(
                "swing height {swing_height} (must be >= 0)"
            )));
        }
        Ok(Self {
            task,
            kind,
            swing_height,
            active: None,
        })
    }

    pub const fn swing_height(&self) -> f64 {
        self.swing_height
    }

    pub fn trajectory(&self) -> Option<&SwingTrajectory> {
        self.active.as_ref().map(|(_, swing)| swing)
    }
}

impl TrajectoryManager for SwingFootTrajectoryManager {
    /// Landing position.
    type Target = Vector3<f64>;

    fn initialize(
        &mut self,
        robot: &dyn RobotModel,
        start_time: f64,
        duration: f64,
        target: &Vector3<f64>,
    ) -> Result<(), WbcError> {
        let segment = begin_segment(self.segment(), &self.kind, start_time, duration)?;
        let (liftoff, _) = self.kind.measure_position(robot)?;
        let apex = liftoff.z.max(target.z) + self.swing_height;
        let swing = SwingTrajectory::new(liftoff, *target, apex, duration)?;
        self.active = Some((segment, swing));
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
        let (segment, swing) = self.active.as_ref().ok_or(WbcError::NotInitialized)?;
        let sample = swing.sample(current_time - segment.start_time);
        trace!(target_task = %self.kind, z = sample.pos.z, "swing setpoint");
        container.task_mut(self.task)?.update_desired(
            sample.pos.as_slice(),
            sample.vel.as_slice(),
            sample.acc.as_slice(),
        )
    }

    fn segment(&self) -> Option<&Segment> {
        self.active.as_ref().map(|(segment, _)| segment)
    }
}
