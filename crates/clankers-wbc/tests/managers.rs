//! Integration test: trajectory managers driving tasks on a mock robot.
//!
//! Checks that each manager:
//! 1. Starts its segment from the measured robot state
//! 2. Writes time-domain setpoints (phase rates rescaled by the duration)
//! 3. Holds the exact end state once the segment is over
//! 4. Refuses to run before `initialize`

use approx::assert_relative_eq;
use clankers_test_utils::mocks::{
    BIPED_LFOOT, BIPED_RFOOT, BIPED_TORSO, QUADRUPED_BASE, QUADRUPED_FEET,
};
use clankers_test_utils::MockRobot;
use clankers_wbc::{
    FloatingBaseTarget, FloatingBaseTrajectoryManager, PoseTrajectoryManager,
    PositionTrajectoryManager, ReactionForceManager, SwingFootTrajectoryManager, Task,
    TaskForceContainer, TaskGains, TaskId, TaskKind, TrajectoryManager, WbcConfig, WbcError,
};
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

fn com_only(n_q_dot: usize) -> (TaskForceContainer, TaskId) {
    let mut b = TaskForceContainer::builder();
    let com = b.task(
        Task::new(TaskKind::Com, n_q_dot, &TaskGains::uniform(100.0, 10.0), 10.0).unwrap(),
    );
    (b.build(), com)
}

fn quadruped() -> (MockRobot, TaskForceContainer, clankers_wbc::QuadrupedHandles) {
    let robot = MockRobot::quadruped();
    let (container, handles) =
        TaskForceContainer::quadruped(&WbcConfig::default(), 18, QUADRUPED_BASE, QUADRUPED_FEET)
            .unwrap();
    (robot, container, handles)
}

// ---------------------------------------------------------------------------
// PositionTrajectoryManager
// ---------------------------------------------------------------------------

#[test]
fn position_midpoint_of_symmetric_segment() {
    let robot = MockRobot::new(12);
    let (mut container, com) = com_only(18);
    let mut manager = PositionTrajectoryManager::new(&container, com).unwrap();

    manager
        .initialize(&robot, 0.0, 0.75, &Vector3::new(0.25, 0.0, 0.05))
        .unwrap();
    manager.update(&mut container, 0.375).unwrap();

    let task = container.task(com).unwrap();
    assert_relative_eq!(task.pos_des()[0], 0.125, epsilon = 1e-12);
    assert_relative_eq!(task.pos_des()[1], 0.0, epsilon = 1e-12);
    assert_relative_eq!(task.pos_des()[2], 0.025, epsilon = 1e-12);
    // peak speed of a rest-to-rest cubic: 1.5 · distance / duration
    assert_relative_eq!(task.vel_des()[0], 1.5 * 0.25 / 0.75, epsilon = 1e-12);
    assert_relative_eq!(task.acc_des()[0], 0.0, epsilon = 1e-12);
}

#[test]
fn position_holds_exact_end_after_segment() {
    let robot = MockRobot::new(12).with_com(Vector3::new(0.1, -0.2, 0.3), Vector3::zeros());
    let (mut container, com) = com_only(18);
    let mut manager = PositionTrajectoryManager::new(&container, com).unwrap();
    let target = Vector3::new(0.4, 0.1, 0.32);

    manager.initialize(&robot, 0.0, 0.5, &target).unwrap();
    manager.update(&mut container, 0.6).unwrap();

    let task = container.task(com).unwrap();
    assert_eq!(task.pos_des().as_slice(), target.as_slice());
    assert_eq!(task.vel_des().as_slice(), &[0.0; 3]);
}

#[test]
fn position_starts_with_measured_velocity() {
    let robot = MockRobot::new(12).with_com(Vector3::zeros(), Vector3::new(0.2, -0.1, 0.05));
    let (mut container, com) = com_only(18);
    let mut manager = PositionTrajectoryManager::new(&container, com).unwrap();

    manager
        .initialize(&robot, 2.0, 0.4, &Vector3::new(0.1, 0.0, 0.0))
        .unwrap();
    manager.update(&mut container, 2.0).unwrap();

    let vel = container.task(com).unwrap().vel_des().clone();
    assert_relative_eq!(vel[0], 0.2, epsilon = 1e-12);
    assert_relative_eq!(vel[1], -0.1, epsilon = 1e-12);
    assert_relative_eq!(vel[2], 0.05, epsilon = 1e-12);
}

#[test]
fn update_before_initialize_is_a_precondition_error() {
    let (mut container, com) = com_only(18);
    let manager = PositionTrajectoryManager::new(&container, com).unwrap();
    assert!(!manager.is_initialized());
    let err = manager.update(&mut container, 0.0).unwrap_err();
    assert!(matches!(err, WbcError::NotInitialized));
    assert!(err.is_precondition());
}

#[test]
fn invalid_duration_leaves_manager_untouched() {
    let robot = MockRobot::new(12);
    let (container, com) = com_only(18);
    let mut manager = PositionTrajectoryManager::new(&container, com).unwrap();
    for duration in [0.0, -0.5] {
        let err = manager
            .initialize(&robot, 0.0, duration, &Vector3::zeros())
            .unwrap_err();
        assert!(matches!(err, WbcError::InvalidDuration(_)));
        assert!(err.is_invalid_argument());
    }
    assert!(!manager.is_initialized());
}

#[test]
fn reinitialize_replaces_segment() {
    let mut robot = MockRobot::new(12);
    let (mut container, com) = com_only(18);
    let mut manager = PositionTrajectoryManager::new(&container, com).unwrap();

    manager
        .initialize(&robot, 0.0, 1.0, &Vector3::new(1.0, 0.0, 0.0))
        .unwrap();
    manager.update(&mut container, 0.5).unwrap();
    robot.com_pos = Vector3::from_column_slice(container.task(com).unwrap().pos_des().as_slice());

    manager
        .initialize(&robot, 0.5, 1.0, &Vector3::new(0.0, 1.0, 0.0))
        .unwrap();
    let segment = *manager.segment().unwrap();
    assert_eq!(segment.start_time, 0.5);
    assert_eq!(segment.end_time(), 1.5);

    // the new segment starts where the old setpoint was
    manager.update(&mut container, 0.5).unwrap();
    assert_relative_eq!(container.task(com).unwrap().pos_des()[0], 0.5, epsilon = 1e-12);

    manager.update(&mut container, 1.5).unwrap();
    assert_eq!(container.task(com).unwrap().pos_des().as_slice(), &[0.0, 1.0, 0.0]);
}

#[test]
fn use_current_and_update_desired_write_zero_rates() {
    let robot = MockRobot::new(12).with_com(Vector3::new(0.0, 0.0, 0.31), Vector3::new(0.3, 0.0, 0.0));
    let (mut container, com) = com_only(18);
    let manager = PositionTrajectoryManager::new(&container, com).unwrap();

    manager.use_current(&mut container, &robot).unwrap();
    let task = container.task(com).unwrap();
    assert_eq!(task.pos_des().as_slice(), &[0.0, 0.0, 0.31]);
    assert_eq!(task.vel_des().as_slice(), &[0.0; 3]);

    manager
        .update_desired(&mut container, &Vector3::new(0.1, 0.0, 0.3))
        .unwrap();
    assert_eq!(container.task(com).unwrap().pos_des().as_slice(), &[0.1, 0.0, 0.3]);
    assert_eq!(container.task(com).unwrap().acc_des().as_slice(), &[0.0; 3]);
}

#[test]
fn position_manager_rejects_orientation_task() {
    let (_, container, handles) = quadruped();
    let err = PositionTrajectoryManager::new(&container, handles.base_ori).unwrap_err();
    assert!(err.is_invalid_argument());
}

#[test]
fn unknown_link_surfaces_at_initialize() {
    let robot = MockRobot::new(12);
    let mut b = TaskForceContainer::builder();
    let task = b.task(
        Task::new(
            TaskKind::link_position("tail"),
            18,
            &TaskGains::uniform(1.0, 1.0),
            1.0,
        )
        .unwrap(),
    );
    let container = b.build();
    let mut manager = PositionTrajectoryManager::new(&container, task).unwrap();
    assert!(matches!(
        manager.initialize(&robot, 0.0, 1.0, &Vector3::zeros()),
        Err(WbcError::UnknownTarget(_))
    ));
}

// ---------------------------------------------------------------------------
// FloatingBaseTrajectoryManager
// ---------------------------------------------------------------------------

#[test]
fn floating_base_reaches_com_and_orientation_targets() {
    let (robot, mut container, h) = quadruped();
    let mut manager = FloatingBaseTrajectoryManager::new(&container, h.com, h.base_ori).unwrap();
    let target = FloatingBaseTarget {
        com_pos: Vector3::new(0.05, 0.02, 0.28),
        base_ori: UnitQuaternion::from_euler_angles(0.0, 0.1, 0.3),
    };

    manager.initialize(&robot, 1.0, 0.6, &target).unwrap();

    manager.update(&mut container, 1.0).unwrap();
    let ori = container.task(h.base_ori).unwrap();
    assert_relative_eq!(ori.pos_des()[3], 1.0, epsilon = 1e-12);
    assert_relative_eq!(ori.vel_des().norm(), 0.0, epsilon = 1e-12);

    manager.update(&mut container, 1.3).unwrap();
    let mid = container.task(h.com).unwrap().pos_des().clone();
    assert_relative_eq!(mid[2], 0.29, epsilon = 1e-12);

    manager.update(&mut container, 2.0).unwrap();
    assert_eq!(
        container.task(h.com).unwrap().pos_des().as_slice(),
        target.com_pos.as_slice()
    );
    let q = container.task(h.base_ori).unwrap().pos_des().clone();
    let reached = UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(q[3], q[0], q[1], q[2]));
    assert!(reached.angle_to(&target.base_ori) < 1e-9);
}

#[test]
fn floating_base_needs_com_and_orientation_tasks() {
    let (_, container, h) = quadruped();
    assert!(FloatingBaseTrajectoryManager::new(&container, h.base_ori, h.com).is_err());
    assert!(FloatingBaseTrajectoryManager::new(&container, h.foot_pos[0], h.base_ori).is_err());
}

#[test]
fn floating_base_use_current_holds_measured_pose() {
    let (mut robot, mut container, h) = quadruped();
    let yaw = UnitQuaternion::from_euler_angles(0.0, 0.0, 0.4);
    robot.set_link_pose(QUADRUPED_BASE, Vector3::new(0.0, 0.0, 0.3), yaw);
    let manager = FloatingBaseTrajectoryManager::new(&container, h.com, h.base_ori).unwrap();

    manager.use_current(&mut container, &robot).unwrap();
    let q = container.task(h.base_ori).unwrap().pos_des().clone();
    assert_relative_eq!(q[2], yaw.coords[2], epsilon = 1e-12);
    assert_relative_eq!(q[3], yaw.coords[3], epsilon = 1e-12);
    assert_eq!(container.task(h.com).unwrap().pos_des().as_slice(), &[0.0, 0.0, 0.3]);
}

// ---------------------------------------------------------------------------
// SwingFootTrajectoryManager
// ---------------------------------------------------------------------------

#[test]
fn swing_peaks_above_higher_endpoint_at_mid_swing() {
    let (robot, mut container, h) = quadruped();
    let cfg = WbcConfig::default();
    let fl = h.foot_pos[0];
    let mut manager = SwingFootTrajectoryManager::new(&container, fl, cfg.swing_height).unwrap();
    let landing = Vector3::new(0.29, 0.13, 0.02);

    manager.initialize(&robot, 0.0, 0.3, &landing).unwrap();
    let swing = manager.trajectory().unwrap();
    assert_relative_eq!(swing.apex_height(), 0.02 + cfg.swing_height, epsilon = 1e-12);

    manager.update(&mut container, 0.0).unwrap();
    let task = container.task(fl).unwrap();
    assert_relative_eq!(task.vel_des()[0], 0.0, epsilon = 1e-12);
    assert_relative_eq!(task.vel_des()[1], 0.0, epsilon = 1e-12);

    manager.update(&mut container, 0.15).unwrap();
    let task = container.task(fl).unwrap();
    assert_relative_eq!(task.pos_des()[0], 0.24, epsilon = 1e-12);
    assert_relative_eq!(task.pos_des()[2], 0.07, epsilon = 1e-12);

    manager.update(&mut container, 0.5).unwrap();
    let task = container.task(fl).unwrap();
    assert_relative_eq!(task.pos_des()[0], 0.29, epsilon = 1e-12);
    assert_relative_eq!(task.pos_des()[2], 0.02, epsilon = 1e-12);
    assert_relative_eq!(task.vel_des()[0], 0.0, epsilon = 1e-12);
}

#[test]
fn swing_manager_validates_inputs() {
    let (_, container, h) = quadruped();
    assert!(SwingFootTrajectoryManager::new(&container, h.com, 0.05).is_err());
    assert!(SwingFootTrajectoryManager::new(&container, h.foot_pos[1], -0.01).is_err());
    assert!(SwingFootTrajectoryManager::new(&container, h.foot_pos[1], f64::NAN).is_err());
}

// ---------------------------------------------------------------------------
// PoseTrajectoryManager
// ---------------------------------------------------------------------------

#[test]
fn pose_manager_moves_a_flat_foot() {
    let robot = MockRobot::biped();
    let cfg = WbcConfig::biped();
    let (mut container, h) =
        TaskForceContainer::biped(&cfg, 18, BIPED_TORSO, BIPED_LFOOT, BIPED_RFOOT).unwrap();
    let mut manager = PoseTrajectoryManager::new(&container, h.rfoot_pos, h.rfoot_ori).unwrap();
    assert_eq!(manager.link(), BIPED_RFOOT);

    let target = Isometry3::from_parts(
        Translation3::new(0.2, -0.1, 0.0),
        UnitQuaternion::from_euler_angles(0.0, 0.0, -0.2),
    );
    manager.initialize(&robot, 0.0, 0.8, &target).unwrap();
    manager.update(&mut container, 0.8).unwrap();

    let pos = container.task(h.rfoot_pos).unwrap().pos_des().clone();
    assert_relative_eq!(pos[0], 0.2, epsilon = 1e-12);
    let q = container.task(h.rfoot_ori).unwrap().pos_des().clone();
    let reached = UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(q[3], q[0], q[1], q[2]));
    assert!(reached.angle_to(&target.rotation) < 1e-9);
}

#[test]
fn pose_manager_rejects_mismatched_links() {
    let (container, h) = TaskForceContainer::biped(
        &WbcConfig::biped(),
        18,
        BIPED_TORSO,
        BIPED_LFOOT,
        BIPED_RFOOT,
    )
    .unwrap();
    let err = PoseTrajectoryManager::new(&container, h.rfoot_pos, h.lfoot_ori).unwrap_err();
    assert!(err.is_invalid_argument());
    assert!(PoseTrajectoryManager::new(&container, h.com, h.torso_ori).is_err());
}

// ---------------------------------------------------------------------------
// ReactionForceManager
// ---------------------------------------------------------------------------

#[test]
fn touchdown_ramps_contact_force_limit() {
    let (_, mut container, h) = quadruped();
    let cfg = WbcConfig::default();
    let contact = h.foot_contacts[2];
    let mut manager = ReactionForceManager::new(contact);

    assert_eq!(container.contact(contact).unwrap().rf_z_max, cfg.initial_rf_z_max);
    manager
        .initialize(&container, 0.0, cfg.rf_z_max_time, cfg.rf_z_max)
        .unwrap();

    manager.update(&mut container, cfg.rf_z_max_time / 2.0).unwrap();
    let mid = container.contact(contact).unwrap().rf_z_max;
    assert!(mid > cfg.initial_rf_z_max && mid < cfg.rf_z_max);

    manager.update(&mut container, 1.0).unwrap();
    assert_eq!(container.contact(contact).unwrap().rf_z_max, cfg.rf_z_max);
    // other feet untouched
    assert_eq!(
        container.contact(h.foot_contacts[0]).unwrap().rf_z_max,
        cfg.initial_rf_z_max
    );
}
