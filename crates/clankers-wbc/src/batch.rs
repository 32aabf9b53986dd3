//! Batched tasks and managers for many independent robot instances.
//!
//! Every per-instance quantity is a flat structure-of-arrays buffer with a
//! leading instance index (`[n_batch * dim]`, row `b` is instance `b`).
//! Instances never read each other's rows. Per-instance work runs on rayon,
//! one output row per worker, and uses the same arithmetic as the scalar
//! [`Task`](crate::Task) and [`PositionTrajectoryManager`](crate::PositionTrajectoryManager),
//! so instance `b` of a batch matches the scalar computation for that
//! instance exactly.
//!
//! Only position targets (COM and link origins) have a batched manager.
//! Orientation tasks can be batched, but their setpoints are written
//! directly with [`BatchTask::update_desired`].

use clankers_curves::{BatchHermiteCurveVec, quat_from_xyzw, quat_to_rotvec};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use tracing::debug;

use crate::config::TaskGains;
use crate::error::WbcError;
use crate::task::{TASK_DIM, TaskKind};

/// Stacked robot state of `n_batch` instances.
///
/// Buffers are `[n_batch * k]` with instance `b` in row `b`. Matrices are
/// stored row-major per instance (`[n_batch][rows][n_q_dot]`).
pub trait BatchRobotModel: Sync {
    fn n_batch(&self) -> usize;
    fn n_q_dot(&self) -> usize;

    /// `[n_batch * n_q_dot]`.
    fn get_q_dot(&self) -> Vec<f64>;

    /// `[n_batch * 3]`.
    fn get_com_pos(&self) -> Vec<f64>;
    fn get_com_lin_vel(&self) -> Vec<f64>;

    /// `[n_batch * 3 * n_q_dot]`.
    fn get_com_lin_jacobian(&self) -> Vec<f64>;
    fn get_com_lin_jacobian_dot(&self) -> Vec<f64>;

    /// Link origin positions, `[n_batch * 3]`.
    fn get_link_pos(&self, link: &str) -> Result<Vec<f64>, WbcError>;

    /// Link orientations as scalar-last quaternions, `[n_batch * 4]`.
    fn get_link_quat(&self, link: &str) -> Result<Vec<f64>, WbcError>;

    /// Link twists `[angular; linear]`, `[n_batch * 6]`.
    fn get_link_vel(&self, link: &str) -> Result<Vec<f64>, WbcError>;

    /// `[n_batch * 6 * n_q_dot]`, angular rows first.
    fn get_link_jacobian(&self, link: &str) -> Result<Vec<f64>, WbcError>;
    fn get_link_jacobian_dot(&self, link: &str) -> Result<Vec<f64>, WbcError>;
}

/// Current position and linear velocity, `[n_batch * 3]` each.
fn measure_positions(
    kind: &TaskKind,
    robot: &dyn BatchRobotModel,
) -> Result<(Vec<f64>, Vec<f64>), WbcError> {
    match kind {
        TaskKind::Com => Ok((robot.get_com_pos(), robot.get_com_lin_vel())),
        TaskKind::LinkPosition(link) => {
            let pos = robot.get_link_pos(link)?;
            let twist = robot.get_link_vel(link)?;
            Ok((pos, twist_part(&twist, 3)))
        }
        TaskKind::LinkOrientation(link) => {
            let quat = robot.get_link_quat(link)?;
            let twist = robot.get_link_vel(link)?;
            Ok((quat, twist_part(&twist, 0)))
        }
    }
}

/// Angular (`offset = 0`) or linear (`offset = 3`) part of stacked twists.
fn twist_part(twist: &[f64], offset: usize) -> Vec<f64> {
    twist
        .chunks_exact(6)
        .flat_map(|t| t[offset..offset + 3].iter().copied())
        .collect()
}

/// Three rows of a stacked `[n_batch][6][n_q_dot]` link matrix.
fn link_rows(stacked: &[f64], n_q_dot: usize, first_row: usize) -> Vec<f64> {
    if n_q_dot == 0 {
        return Vec::new();
    }
    stacked
        .chunks_exact(6 * n_q_dot)
        .flat_map(|m| m[first_row * n_q_dot..(first_row + TASK_DIM) * n_q_dot].iter().copied())
        .collect()
}

// ---------------------------------------------------------------------------
// BatchTask
// ---------------------------------------------------------------------------

/// [`Task`](crate::Task) over `n_batch` instances.
///
/// Gains and hierarchy weight are shared by all instances; setpoints,
/// errors, commands and Jacobians are per instance.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchTask {
    kind: TaskKind,
    n_batch: usize,
    n_q_dot: usize,
    w_hierarchy: f64,
    kp: [f64; 3],
    kd: [f64; 3],

    pos_des: Vec<f64>,
    vel_des: Vec<f64>,
    acc_des: Vec<f64>,

    pos_err: Vec<f64>,
    op_cmd: Vec<f64>,

    jacobian: Vec<f64>,
    jacobian_dot_q_dot: Vec<f64>,
    jacobian_fresh: bool,
    cmd_fresh: bool,
}

impl BatchTask {
    pub fn new(
        kind: TaskKind,
        n_batch: usize,
        n_q_dot: usize,
        gains: &TaskGains,
        w_hierarchy: f64,
    ) -> Result<Self, WbcError> {
        if !(w_hierarchy >= 0.0 && w_hierarchy.is_finite()) {
            return Err(WbcError::InvalidArgument(format!(
                "hierarchy weight {w_hierarchy} (must be >= 0)"
            )));
        }
        let pos_dim = kind.pos_dim();
        let mut pos_des = vec![0.0; n_batch * pos_dim];
        if kind.is_orientation() {
            for q in pos_des.chunks_mut(pos_dim) {
                q[3] = 1.0;
            }
        }
        Ok(Self {
            kind,
            n_batch,
            n_q_dot,
            w_hierarchy,
            kp: gains.kp,
            kd: gains.kd,
            pos_des,
            vel_des: vec![0.0; n_batch * TASK_DIM],
            acc_des: vec![0.0; n_batch * TASK_DIM],
            pos_err: vec![0.0; n_batch * TASK_DIM],
            op_cmd: vec![0.0; n_batch * TASK_DIM],
            jacobian: vec![0.0; n_batch * TASK_DIM * n_q_dot],
            jacobian_dot_q_dot: vec![0.0; n_batch * TASK_DIM],
            jacobian_fresh: false,
            cmd_fresh: false,
        })
    }

    pub const fn kind(&self) -> &TaskKind {
        &self.kind
    }

    pub const fn n_batch(&self) -> usize {
        self.n_batch
    }

    pub const fn dim(&self) -> usize {
        TASK_DIM
    }

    pub const fn w_hierarchy(&self) -> f64 {
        self.w_hierarchy
    }

    pub fn pos_des(&self) -> &[f64] {
        &self.pos_des
    }

    pub fn vel_des(&self) -> &[f64] {
        &self.vel_des
    }

    pub fn acc_des(&self) -> &[f64] {
        &self.acc_des
    }

    /// `[n_batch * 3]`; fails until [`Self::update_cmd`] has run after the
    /// last setpoint or Jacobian write.
    pub fn pos_err(&self) -> Result<&[f64], WbcError> {
        self.require_cmd()?;
        Ok(&self.pos_err)
    }

    pub fn op_cmd(&self) -> Result<&[f64], WbcError> {
        self.require_cmd()?;
        Ok(&self.op_cmd)
    }

    /// `[n_batch][3][n_q_dot]`, row-major per instance.
    pub fn jacobian(&self) -> Result<&[f64], WbcError> {
        self.require_fresh()?;
        Ok(&self.jacobian)
    }

    pub fn jacobian_dot_q_dot(&self) -> Result<&[f64], WbcError> {
        self.require_fresh()?;
        Ok(&self.jacobian_dot_q_dot)
    }

    /// Jacobian of instance `b` as a matrix.
    pub fn instance_jacobian(&self, b: usize) -> Result<DMatrix<f64>, WbcError> {
        self.require_fresh()?;
        let len = TASK_DIM * self.n_q_dot;
        let rows = self
            .jacobian
            .get(b * len..(b + 1) * len)
            .ok_or_else(|| WbcError::UnknownTarget(format!("batch instance {b}")))?;
        Ok(DMatrix::from_row_slice(TASK_DIM, self.n_q_dot, rows))
    }

    /// Store setpoints for every instance; nothing is written on error.
    pub fn update_desired(
        &mut self,
        pos_des: &[f64],
        vel_des: &[f64],
        acc_des: &[f64],
    ) -> Result<(), WbcError> {
        WbcError::check_len("pos_des", self.n_batch * self.kind.pos_dim(), pos_des.len())?;
        WbcError::check_len("vel_des", self.n_batch * TASK_DIM, vel_des.len())?;
        WbcError::check_len("acc_des", self.n_batch * TASK_DIM, acc_des.len())?;
        if self.kind.is_orientation() {
            for (b, q) in pos_des.chunks_exact(self.kind.pos_dim()).enumerate() {
                let norm = q.iter().map(|c| c * c).sum::<f64>().sqrt();
                if !(norm > f64::EPSILON && norm.is_finite()) {
                    return Err(WbcError::InvalidArgument(format!(
                        "{} setpoint of instance {b} is not a quaternion (norm {norm})",
                        self.kind
                    )));
                }
            }
        }
        self.pos_des.copy_from_slice(pos_des);
        self.vel_des.copy_from_slice(vel_des);
        self.acc_des.copy_from_slice(acc_des);
        self.jacobian_fresh = false;
        self.cmd_fresh = false;
        Ok(())
    }

    pub fn update_jacobian(&mut self, robot: &dyn BatchRobotModel) -> Result<(), WbcError> {
        WbcError::check_len("n_batch", self.n_batch, robot.n_batch())?;
        WbcError::check_len("n_q_dot", self.n_q_dot, robot.n_q_dot())?;
        let n = self.n_q_dot;
        let (jac, jac_dot) = match &self.kind {
            TaskKind::Com => (robot.get_com_lin_jacobian(), robot.get_com_lin_jacobian_dot()),
            TaskKind::LinkPosition(link) => (
                link_rows(&robot.get_link_jacobian(link)?, n, 3),
                link_rows(&robot.get_link_jacobian_dot(link)?, n, 3),
            ),
            TaskKind::LinkOrientation(link) => (
                link_rows(&robot.get_link_jacobian(link)?, n, 0),
                link_rows(&robot.get_link_jacobian_dot(link)?, n, 0),
            ),
        };
        let len = self.n_batch * TASK_DIM * n;
        WbcError::check_len("jacobian", len, jac.len())?;
        WbcError::check_len("jacobian_dot", len, jac_dot.len())?;
        let q_dot = robot.get_q_dot();
        WbcError::check_len("q_dot", self.n_batch * n, q_dot.len())?;

        let block = TASK_DIM * n;
        self.jacobian_dot_q_dot
            .par_chunks_mut(TASK_DIM)
            .enumerate()
            .for_each(|(b, out)| {
                let jd = DMatrix::from_row_slice(TASK_DIM, n, &jac_dot[b * block..(b + 1) * block]);
                let qd = DVector::from_column_slice(&q_dot[b * n..(b + 1) * n]);
                out.copy_from_slice((jd * qd).as_slice());
            });
        self.jacobian = jac;
        self.jacobian_fresh = true;
        self.cmd_fresh = false;
        Ok(())
    }

    /// Per-instance `op_cmd = acc_des + kd∘(vel_des − vel) + kp∘pos_err`.
    pub fn update_cmd(&mut self, robot: &dyn BatchRobotModel) -> Result<(), WbcError> {
        self.require_fresh()?;
        let (pos, vel) = measure_positions(&self.kind, robot)?;
        let pos_dim = self.kind.pos_dim();
        WbcError::check_len("measured position", self.n_batch * pos_dim, pos.len())?;
        WbcError::check_len("measured velocity", self.n_batch * TASK_DIM, vel.len())?;

        let orientation = self.kind.is_orientation();
        let (kp, kd) = (self.kp, self.kd);
        let pos_des = &self.pos_des;
        let vel_des = &self.vel_des;
        let acc_des = &self.acc_des;

        self.pos_err
            .par_chunks_mut(TASK_DIM)
            .zip(self.op_cmd.par_chunks_mut(TASK_DIM))
            .enumerate()
            .for_each(|(b, (err, cmd))| {
                let des = &pos_des[b * pos_dim..(b + 1) * pos_dim];
                let act = &pos[b * pos_dim..(b + 1) * pos_dim];
                if orientation {
                    let q_des = quat_from_xyzw(des[0], des[1], des[2], des[3]);
                    let q_act = quat_from_xyzw(act[0], act[1], act[2], act[3]);
                    err.copy_from_slice(quat_to_rotvec(&(q_des * q_act.inverse())).as_slice());
                } else {
                    for i in 0..TASK_DIM {
                        err[i] = des[i] - act[i];
                    }
                }
                let k = b * TASK_DIM;
                for i in 0..TASK_DIM {
                    cmd[i] = acc_des[k + i] + kd[i] * (vel_des[k + i] - vel[k + i]) + kp[i] * err[i];
                }
            });
        self.cmd_fresh = true;
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

// ---------------------------------------------------------------------------
// BatchPositionTrajectoryManager
// ---------------------------------------------------------------------------

/// [`PositionTrajectoryManager`](crate::PositionTrajectoryManager) over
/// `n_batch` instances, each with its own start time, duration and target.
#[derive(Debug, Clone)]
pub struct BatchPositionTrajectoryManager {
    kind: TaskKind,
    n_batch: usize,
    start_time: Vec<f64>,
    duration: Vec<f64>,
    curve: Option<BatchHermiteCurveVec>,
}

impl BatchPositionTrajectoryManager {
    /// Manager for `task` (COM or link position).
    pub fn new(task: &BatchTask) -> Result<Self, WbcError> {
        if task.kind().is_orientation() {
            return Err(WbcError::InvalidArgument(format!(
                "{} cannot be driven as a position",
                task.kind()
            )));
        }
        Ok(Self {
            kind: task.kind().clone(),
            n_batch: task.n_batch(),
            start_time: vec![0.0; task.n_batch()],
            duration: vec![0.0; task.n_batch()],
            curve: None,
        })
    }

    pub const fn n_batch(&self) -> usize {
        self.n_batch
    }

    pub fn is_initialized(&self) -> bool {
        self.curve.is_some()
    }

    /// Start a segment for every instance.
    ///
    /// `start_time` and `duration` are `[n_batch]`, `target` is
    /// `[n_batch * 3]`.
    pub fn initialize(
        &mut self,
        robot: &dyn BatchRobotModel,
        start_time: &[f64],
        duration: &[f64],
        target: &[f64],
    ) -> Result<(), WbcError> {
        let n = self.n_batch;
        WbcError::check_len("start_time", n, start_time.len())?;
        WbcError::check_len("duration", n, duration.len())?;
        WbcError::check_len("target", n * TASK_DIM, target.len())?;
        for &d in duration {
            WbcError::check_duration(d)?;
        }

        let (pos, vel) = measure_positions(&self.kind, robot)?;
        WbcError::check_len("measured position", n * TASK_DIM, pos.len())?;
        WbcError::check_len("measured velocity", n * TASK_DIM, vel.len())?;
        let start_vel: Vec<f64> = vel
            .chunks(TASK_DIM)
            .zip(duration)
            .flat_map(|(v, &d)| v.iter().map(move |x| x * d))
            .collect();

        let curve = BatchHermiteCurveVec::new(
            n,
            TASK_DIM,
            &pos,
            &start_vel,
            target,
            &vec![0.0; n * TASK_DIM],
        )?;
        debug!(target_task = %self.kind, n_batch = n, "batched trajectory initialized");

        self.start_time = start_time.to_vec();
        self.duration = duration.to_vec();
        self.curve = Some(curve);
        Ok(())
    }

    /// Write targets straight through with zero rates.
    pub fn update_desired(&self, task: &mut BatchTask, target: &[f64]) -> Result<(), WbcError> {
        self.check_task(task)?;
        let zeros = vec![0.0; self.n_batch * TASK_DIM];
        task.update_desired(target, &zeros, &zeros)
    }

    /// Freeze every instance at its current position.
    pub fn use_current(
        &self,
        task: &mut BatchTask,
        robot: &dyn BatchRobotModel,
    ) -> Result<(), WbcError> {
        let (pos, _) = measure_positions(&self.kind, robot)?;
        self.update_desired(task, &pos)
    }

    fn check_task(&self, task: &BatchTask) -> Result<(), WbcError> {
        if task.kind() != &self.kind || task.n_batch() != self.n_batch {
            return Err(WbcError::InvalidArgument(format!(
                "manager for {} x{} cannot drive {} x{}",
                self.kind,
                self.n_batch,
                task.kind(),
                task.n_batch()
            )));
        }
        Ok(())
    }

    /// Sample every instance at its own `current_time[b]`.
    ///
    /// `task` must be the task this manager was built for.
    pub fn update(&self, task: &mut BatchTask, current_time: &[f64]) -> Result<(), WbcError> {
        let curve = self.curve.as_ref().ok_or(WbcError::NotInitialized)?;
        self.check_task(task)?;
        WbcError::check_len("current_time", self.n_batch, current_time.len())?;

        let s: Vec<f64> = current_time
            .iter()
            .zip(&self.start_time)
            .zip(&self.duration)
            .map(|((t, start), d)| (t - start) / d)
            .collect();

        let pos = curve.evaluate(&s)?;
        let mut vel = curve.evaluate_first_derivative(&s)?;
        let mut acc = curve.evaluate_second_derivative(&s)?;
        for (b, &d) in self.duration.iter().enumerate() {
            let row = b * TASK_DIM..(b + 1) * TASK_DIM;
            for v in &mut vel[row.clone()] {
                *v /= d;
            }
            for a in &mut acc[row] {
                *a /= d * d;
            }
        }
        task.update_desired(&pos, &vel, &acc)
    }
}
