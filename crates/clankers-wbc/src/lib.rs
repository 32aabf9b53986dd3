//! Tasks, contacts and trajectory managers for whole-body control of
//! floating-base legged robots.
//!
//! Each control tick a locomotion planner drives the managers, the managers
//! write time-sampled setpoints into tasks, and the tasks turn setpoints and
//! measured state into operational-space acceleration commands for a
//! downstream QP solver.
//!
//! # Architecture
//!
//! ```text
//! planner ──► TrajectoryManager ──► Task / Contact ──► (Jacobian, op_cmd, rf_z_max)
//!                 ▲                      ▲
//!                 └──── RobotModel ──────┘
//! ```
//!
//! Per tick, for every task: [`Task::update_desired`] (via a manager), then
//! [`Task::update_jacobian`], then [`Task::update_cmd`].
//! [`TaskForceContainer::update`] runs the last two for all tasks at once.
//!
//! [`batch`] holds the structure-of-arrays equivalents for many robot
//! instances evaluated in parallel.

pub mod batch;
pub mod config;
pub mod contact;
pub mod container;
pub mod error;
pub mod manager;
pub mod model;
pub mod task;

pub use batch::{BatchPositionTrajectoryManager, BatchRobotModel, BatchTask};
pub use config::{TaskGains, WbcConfig};
pub use contact::{Contact, ContactKind};
pub use container::{
    BipedHandles, ContactId, QuadrupedHandles, TaskForceContainer, TaskForceContainerBuilder,
    TaskId,
};
pub use error::{ConfigError, WbcError};
pub use manager::{
    FloatingBaseTarget, FloatingBaseTrajectoryManager, PoseTrajectoryManager,
    PositionTrajectoryManager, ReactionForceManager, Segment, SwingFootTrajectoryManager,
    TrajectoryManager,
};
pub use model::{JointCommand, JointIndexMap, RobotModel};
pub use task::{QUAT_DIM, TASK_DIM, Task, TaskKind};
