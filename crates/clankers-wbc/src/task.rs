//! Operational-space tasks.
//!
//! A [`Task`] is one prioritized objective for the hierarchy solver: a
//! setpoint, diagonal PD gains, a hierarchy weight and the Jacobian of its
//! target. Every tick it must be driven in this order:
//!
//! ```text
//! update_desired ──► update_jacobian ──► update_cmd ──► solver reads
//! ```
//!
//! The order is enforced: writing a new setpoint marks the Jacobian stale,
//! and [`Task::update_cmd`] and the Jacobian accessors refuse to run on a
//! stale Jacobian. Any setpoint or Jacobian write also marks the command
//! stale until the next [`Task::update_cmd`].

use std::fmt;

use clankers_curves::{quat_from_xyzw, quat_to_rotvec};
use nalgebra::{DMatrix, DVector, UnitQuaternion, Vector3};
use tracing::trace;

use crate::config::TaskGains;
use crate::error::WbcError;
use crate::model::RobotModel;

/// Dimension of every task (3 linear or 3 angular coordinates).
pub const TASK_DIM: usize = 3;

/// Length of an orientation setpoint (scalar-last quaternion).
pub const QUAT_DIM: usize = 4;

/// What a task controls.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Center-of-mass position.
    Com,
    /// Position of a link origin.
    LinkPosition(String),
    /// Orientation of a link.
    LinkOrientation(String),
}

impl TaskKind {
    pub fn link_position(link: impl Into<String>) -> Self {
        Self::LinkPosition(link.into())
    }

    pub fn link_orientation(link: impl Into<String>) -> Self {
        Self::LinkOrientation(link.into())
    }

    /// Length of the position setpoint: 4 for orientation, 3 otherwise.
    pub const fn pos_dim(&self) -> usize {
        match self {
            Self::LinkOrientation(_) => QUAT_DIM,
            Self::Com | Self::LinkPosition(_) => TASK_DIM,
        }
    }

    pub fn link(&self) -> Option<&str> {
        match self {
            Self::Com => None,
            Self::LinkPosition(link) | Self::LinkOrientation(link) => Some(link),
        }
    }

    pub const fn is_orientation(&self) -> bool {
        matches!(self, Self::LinkOrientation(_))
    }

    /// Current position and linear velocity of a COM or link-position target.
    pub(crate) fn measure_position(
        &self,
        robot: &dyn RobotModel,
    ) -> Result<(Vector3<f64>, Vector3<f64>), WbcError> {
        match self {
            Self::Com => Ok((robot.get_com_pos(), robot.get_com_lin_vel())),
            Self::LinkPosition(link) => {
                let iso = robot.get_link_iso(link)?;
                let vel = robot.get_link_vel(link)?;
                Ok((iso.translation.vector, vel.fixed_rows::<3>(3).into_owned()))
            }
            Self::LinkOrientation(_) => Err(WbcError::InvalidArgument(format!(
                "{self} has no position"
            ))),
        }
    }

    /// Current orientation and angular velocity of a link-orientation target.
    pub(crate) fn measure_orientation(
        &self,
        robot: &dyn RobotModel,
    ) -> Result<(UnitQuaternion<f64>, Vector3<f64>), WbcError> {
        match self {
            Self::LinkOrientation(link) => {
                let iso = robot.get_link_iso(link)?;
                let vel = robot.get_link_vel(link)?;
                Ok((iso.rotation, vel.fixed_rows::<3>(0).into_owned()))
            }
            Self::Com | Self::LinkPosition(_) => Err(WbcError::InvalidArgument(format!(
                "{self} has no orientation"
            ))),
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Com => write!(f, "com"),
            Self::LinkPosition(link) => write!(f, "link_xyz({link})"),
            Self::LinkOrientation(link) => write!(f, "link_ori({link})"),
        }
    }
}

/// One operational-space task.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    kind: TaskKind,
    n_q_dot: usize,
    w_hierarchy: f64,
    kp: DVector<f64>,
    kd: DVector<f64>,

    pos_des: DVector<f64>,
    vel_des: DVector<f64>,
    acc_des: DVector<f64>,

    pos_err: DVector<f64>,
    op_cmd: DVector<f64>,

    jacobian: DMatrix<f64>,
    jacobian_dot_q_dot: DVector<f64>,
    jacobian_fresh: bool,
    cmd_fresh: bool,
}

impl Task {
    /// Create a task on a robot with `n_q_dot` generalized velocities.
    ///
    /// The initial setpoint is zero (identity for orientation tasks).
    ///
    /// # Errors
    ///
    /// [`WbcError::InvalidArgument`] for a negative or non-finite weight.
    pub fn new(
        kind: TaskKind,
        n_q_dot: usize,
        gains: &TaskGains,
        w_hierarchy: f64,
    ) -> Result<Self, WbcError> {
        check_weight(w_hierarchy)?;
        let mut pos_des = DVector::zeros(kind.pos_dim());
        if kind.is_orientation() {
            pos_des[3] = 1.0;
        }
        Ok(Self {
            kind,
            n_q_dot,
            w_hierarchy,
            kp: DVector::from_row_slice(&gains.kp),
            kd: DVector::from_row_slice(&gains.kd),
            pos_des,
            vel_des: DVector::zeros(TASK_DIM),
            acc_des: DVector::zeros(TASK_DIM),
            pos_err: DVector::zeros(TASK_DIM),
            op_cmd: DVector::zeros(TASK_DIM),
            jacobian: DMatrix::zeros(TASK_DIM, n_q_dot),
            jacobian_dot_q_dot: DVector::zeros(TASK_DIM),
            jacobian_fresh: false,
            cmd_fresh: false,
        })
    }

    pub const fn kind(&self) -> &TaskKind {
        &self.kind
    }

    pub const fn dim(&self) -> usize {
        TASK_DIM
    }

    pub const fn w_hierarchy(&self) -> f64 {
        self.w_hierarchy
    }

    /// A weight of 0 disables the task in the solver.
    pub fn set_w_hierarchy(&mut self, w_hierarchy: f64) -> Result<(), WbcError> {
        check_weight(w_hierarchy)?;
        self.w_hierarchy = w_hierarchy;
        Ok(())
    }

    pub const fn kp(&self) -> &DVector<f64> {
        &self.kp
    }

    pub const fn kd(&self) -> &DVector<f64> {
        &self.kd
    }

    pub fn set_gains(&mut self, gains: &TaskGains) {
        self.kp = DVector::from_row_slice(&gains.kp);
        self.kd = DVector::from_row_slice(&gains.kd);
    }

    pub const fn pos_des(&self) -> &DVector<f64> {
        &self.pos_des
    }

    pub const fn vel_des(&self) -> &DVector<f64> {
        &self.vel_des
    }

    pub const fn acc_des(&self) -> &DVector<f64> {
        &self.acc_des
    }

    /// Position error from the last [`Self::update_cmd`].
    ///
    /// # Errors
    ///
    /// [`WbcError::CommandNotUpdated`] if a setpoint or Jacobian was written
    /// since then.
    pub fn pos_err(&self) -> Result<&DVector<f64>, WbcError> {
        self.require_cmd()?;
        Ok(&self.pos_err)
    }

    /// Commanded task acceleration from the last [`Self::update_cmd`].
    pub fn op_cmd(&self) -> Result<&DVector<f64>, WbcError> {
        self.require_cmd()?;
        Ok(&self.op_cmd)
    }

    /// `true` once [`Self::update_jacobian`] ran after the last setpoint write.
    pub const fn is_jacobian_fresh(&self) -> bool {
        self.jacobian_fresh
    }

    /// `true` once [`Self::update_cmd`] ran after the last setpoint or
    /// Jacobian write.
    pub const fn is_cmd_fresh(&self) -> bool {
        self.cmd_fresh
    }

    /// Task Jacobian, `3 × n_q_dot`.
    pub fn jacobian(&self) -> Result<&DMatrix<f64>, WbcError> {
        self.require_fresh()?;
        Ok(&self.jacobian)
    }

    /// `J̇ · q̇`.
    pub fn jacobian_dot_q_dot(&self) -> Result<&DVector<f64>, WbcError> {
        self.require_fresh()?;
        Ok(&self.jacobian_dot_q_dot)
    }

    /// Store a new setpoint.
    ///
    /// `pos_des` has 3 entries, or 4 (scalar-last unit quaternion) for an
    /// orientation task. `vel_des` and `acc_des` always have 3. Nothing is
    /// written unless every argument is valid.
    pub fn update_desired(
        &mut self,
        pos_des: &[f64],
        vel_des: &[f64],
        acc_des: &[f64],
    ) -> Result<(), WbcError> {
        WbcError::check_len("pos_des", self.kind.pos_dim(), pos_des.len())?;
        WbcError::check_len("vel_des", TASK_DIM, vel_des.len())?;
        WbcError::check_len("acc_des", TASK_DIM, acc_des.len())?;
        if self.kind.is_orientation() {
            let norm = pos_des.iter().map(|c| c * c).sum::<f64>().sqrt();
            if !(norm > f64::EPSILON && norm.is_finite()) {
                return Err(WbcError::InvalidArgument(format!(
                    "{} setpoint is not a quaternion (norm {norm})",
                    self.kind
                )));
            }
        }

        self.pos_des.copy_from_slice(pos_des);
        self.vel_des.copy_from_slice(vel_des);
        self.acc_des.copy_from_slice(acc_des);
        self.jacobian_fresh = false;
        self.cmd_fresh = false;
        Ok(())
    }

    /// Refresh `J` and `J̇q̇` from the robot model.
    pub fn update_jacobian(&mut self, robot: &dyn RobotModel) -> Result<(), WbcError> {
        let (jac, jac_dot) = match &self.kind {
            TaskKind::Com => (robot.get_com_lin_jacobian(), robot.get_com_lin_jacobian_dot()),
            TaskKind::LinkPosition(link) => (
                linear_rows(robot.get_link_jacobian(link)?)?,
                linear_rows(robot.get_link_jacobian_dot(link)?)?,
            ),
            TaskKind::LinkOrientation(link) => (
                angular_rows(robot.get_link_jacobian(link)?)?,
                angular_rows(robot.get_link_jacobian_dot(link)?)?,
            ),
        };
        WbcError::check_len("jacobian rows", TASK_DIM, jac.nrows())?;
        WbcError::check_len("jacobian_dot rows", TASK_DIM, jac_dot.nrows())?;
        WbcError::check_len("jacobian cols", self.n_q_dot, jac.ncols())?;
        WbcError::check_len("jacobian_dot cols", self.n_q_dot, jac_dot.ncols())?;

        let q_dot = robot.get_q_dot();
        WbcError::check_len("q_dot", self.n_q_dot, q_dot.len())?;

        self.jacobian_dot_q_dot = &jac_dot * q_dot;
        self.jacobian = jac;
        self.jacobian_fresh = true;
        self.cmd_fresh = false;
        Ok(())
    }

    /// Compute `op_cmd = acc_des + kd∘(vel_des − vel) + kp∘pos_err`.
    ///
    /// Orientation error is the rotation vector of `q_des · q⁻¹`.
    pub fn update_cmd(&mut self, robot: &dyn RobotModel) -> Result<(), WbcError> {
        self.require_fresh()?;

        let (pos_err, vel) = if self.kind.is_orientation() {
            let (q_act, ang_vel) = self.kind.measure_orientation(robot)?;
            let p = &self.pos_des;
            let q_des = quat_from_xyzw(p[0], p[1], p[2], p[3]);
            (quat_to_rotvec(&(q_des * q_act.inverse())), ang_vel)
        } else {
            let (pos, vel) = self.kind.measure_position(robot)?;
            (Vector3::from_column_slice(self.pos_des.as_slice()) - pos, vel)
        };

        let pos_err = DVector::from_column_slice(pos_err.as_slice());
        let vel_err = &self.vel_des - DVector::from_column_slice(vel.as_slice());
        self.op_cmd = &self.acc_des + self.kd.component_mul(&vel_err) + self.kp.component_mul(&pos_err);
        self.pos_err = pos_err;
        self.cmd_fresh = true;

        trace!(task = %self.kind, err = self.pos_err.norm(), "task command updated");
        Ok(())
    }

    fn require_fresh(&self) -> Result<(), WbcError> {
        if self.jacobian_fresh {
            Ok(())
        } else {
            Err(WbcError::JacobianNotRefreshed(self.kind.to_string()))
        }
    }

    fn require_cmd(&self) -> Result<(), WbcError> {
        if self.cmd_fresh {
            Ok(())
        } else {
            Err(WbcError::CommandNotUpdated(self.kind.to_string()))
        }
    }
}

// Link Jacobians are `[angular; linear]`, 6 rows.

pub(crate) fn angular_rows(link_jac: DMatrix<f64>) -> Result<DMatrix<f64>, WbcError> {
    WbcError::check_len("link jacobian rows", 6, link_jac.nrows())?;
    Ok(link_jac.rows(0, TASK_DIM).into_owned())
}

pub(crate) fn linear_rows(link_jac: DMatrix<f64>) -> Result<DMatrix<f64>, WbcError> {
    WbcError::check_len("link jacobian rows", 6, link_jac.nrows())?;
    Ok(link_jac.rows(3, TASK_DIM).into_owned())
}

fn check_weight(w_hierarchy: f64) -> Result<(), WbcError> {
    if w_hierarchy >= 0.0 && w_hierarchy.is_finite() {
        Ok(())
    } else {
        Err(WbcError::InvalidArgument(format!(
            "hierarchy weight {w_hierarchy} (must be >= 0)"
        )))
    }
}
