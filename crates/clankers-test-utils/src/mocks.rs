//! Mock robot models for testing tasks and trajectory managers.
//!
//! [`MockRobot`] is a plain state container: tests set the COM and link
//! state they care about and read everything back through
//! [`RobotModel`]. [`MockBatchRobot`] stacks several of them behind
//! [`BatchRobotModel`].

use std::collections::HashMap;

use clankers_wbc::{BatchRobotModel, RobotModel, WbcError};
use nalgebra::{DMatrix, DVector, Isometry3, Translation3, UnitQuaternion, Vector3, Vector6};

use crate::rng::{random_matrix, seeded_rng};

/// Floating-base velocity count of every mock.
pub const MOCK_FLOATING_DOF: usize = 6;

/// Link names of [`MockRobot::quadruped`].
pub const QUADRUPED_FEET: [&str; 4] = ["FL_foot", "FR_foot", "RL_foot", "RR_foot"];
pub const QUADRUPED_BASE: &str = "trunk";

/// Link names of [`MockRobot::biped`].
pub const BIPED_TORSO: &str = "torso_link";
pub const BIPED_LFOOT: &str = "l_foot_contact";
pub const BIPED_RFOOT: &str = "r_foot_contact";

// ---------------------------------------------------------------------------
// MockLink
// ---------------------------------------------------------------------------

/// Stored state of one link.
#[derive(Debug, Clone, PartialEq)]
pub struct MockLink {
    pub iso: Isometry3<f64>,
    /// `[angular; linear]`.
    pub vel: Vector6<f64>,
    /// `6 × n_q_dot`, angular rows first.
    pub jacobian: DMatrix<f64>,
    pub jacobian_dot: DMatrix<f64>,
}

impl MockLink {
    fn at_rest(pos: Vector3<f64>, n_q_dot: usize) -> Self {
        Self {
            iso: Isometry3::from_parts(Translation3::from(pos), UnitQuaternion::identity()),
            vel: Vector6::zeros(),
            jacobian: DMatrix::zeros(6, n_q_dot),
            jacobian_dot: DMatrix::zeros(6, n_q_dot),
        }
    }
}

// ---------------------------------------------------------------------------
// MockRobot
// ---------------------------------------------------------------------------

/// Floating-base robot whose state is whatever the test sets.
#[derive(Debug, Clone, PartialEq)]
pub struct MockRobot {
    n_joints: usize,
    pub q: DVector<f64>,
    pub q_dot: DVector<f64>,
    pub com_pos: Vector3<f64>,
    pub com_vel: Vector3<f64>,
    pub com_jacobian: DMatrix<f64>,
    pub com_jacobian_dot: DMatrix<f64>,
    links: HashMap<String, MockLink>,
}

impl MockRobot {
    /// Robot at rest with `n_joints` actuated joints and no links.
    pub fn new(n_joints: usize) -> Self {
        let n_q_dot = MOCK_FLOATING_DOF + n_joints;
        let mut q = DVector::zeros(n_q_dot + 1);
        // base quaternion w
        q[6] = 1.0;
        Self {
            n_joints,
            q,
            q_dot: DVector::zeros(n_q_dot),
            com_pos: Vector3::zeros(),
            com_vel: Vector3::zeros(),
            com_jacobian: DMatrix::zeros(3, n_q_dot),
            com_jacobian_dot: DMatrix::zeros(3, n_q_dot),
            links: HashMap::new(),
        }
    }

    /// 12-joint quadruped standing with its COM at 0.3 m.
    pub fn quadruped() -> Self {
        let mut robot = Self::new(12).with_com(Vector3::new(0.0, 0.0, 0.3), Vector3::zeros());
        robot.add_link(QUADRUPED_BASE, Vector3::new(0.0, 0.0, 0.3));
        let feet = [(0.19, 0.13), (0.19, -0.13), (-0.19, 0.13), (-0.19, -0.13)];
        for (name, (x, y)) in QUADRUPED_FEET.iter().zip(feet) {
            robot.add_link(name, Vector3::new(x, y, 0.0));
        }
        robot
    }

    /// 12-joint biped standing with its COM at 0.9 m.
    pub fn biped() -> Self {
        let mut robot = Self::new(12).with_com(Vector3::new(0.0, 0.0, 0.9), Vector3::zeros());
        robot.add_link(BIPED_TORSO, Vector3::new(0.0, 0.0, 1.1));
        robot.add_link(BIPED_LFOOT, Vector3::new(0.0, 0.1, 0.0));
        robot.add_link(BIPED_RFOOT, Vector3::new(0.0, -0.1, 0.0));
        robot
    }

    pub fn with_com(mut self, pos: Vector3<f64>, vel: Vector3<f64>) -> Self {
        self.com_pos = pos;
        self.com_vel = vel;
        self
    }

    /// Add (or reset) a link at rest at `pos`.
    pub fn add_link(&mut self, name: &str, pos: Vector3<f64>) {
        let n_q_dot = self.n_q_dot();
        self.links
            .insert(name.to_owned(), MockLink::at_rest(pos, n_q_dot));
    }

    pub fn link(&self, name: &str) -> Option<&MockLink> {
        self.links.get(name)
    }

    /// Mutable link state; panics on an unknown link name.
    pub fn link_mut(&mut self, name: &str) -> &mut MockLink {
        self.links
            .get_mut(name)
            .unwrap_or_else(|| panic!("mock robot has no link {name}"))
    }

    pub fn set_link_pose(&mut self, name: &str, pos: Vector3<f64>, ori: UnitQuaternion<f64>) {
        self.link_mut(name).iso = Isometry3::from_parts(Translation3::from(pos), ori);
    }

    pub fn set_link_vel(&mut self, name: &str, ang: Vector3<f64>, lin: Vector3<f64>) {
        let vel = &mut self.link_mut(name).vel;
        vel.fixed_rows_mut::<3>(0).copy_from(&ang);
        vel.fixed_rows_mut::<3>(3).copy_from(&lin);
    }

    /// Fill `q_dot` and every Jacobian with seeded random values.
    pub fn randomize_jacobians(&mut self, seed: u64) {
        let mut rng = seeded_rng(seed);
        let n = self.n_q_dot();
        self.q_dot = DVector::from_iterator(n, random_matrix(&mut rng, n, 1).iter().copied());
        self.com_jacobian = random_matrix(&mut rng, 3, n);
        self.com_jacobian_dot = random_matrix(&mut rng, 3, n);
        let mut names: Vec<String> = self.links.keys().cloned().collect();
        names.sort();
        for name in names {
            let link = self.link_mut(&name);
            link.jacobian = random_matrix(&mut rng, 6, n);
            link.jacobian_dot = random_matrix(&mut rng, 6, n);
        }
    }

    fn lookup(&self, link: &str) -> Result<&MockLink, WbcError> {
        self.links
            .get(link)
            .ok_or_else(|| WbcError::UnknownTarget(format!("link {link}")))
    }
}

impl RobotModel for MockRobot {
    fn n_q(&self) -> usize {
        self.q.len()
    }

    fn n_q_dot(&self) -> usize {
        MOCK_FLOATING_DOF + self.n_joints
    }

    fn n_floating(&self) -> usize {
        MOCK_FLOATING_DOF
    }

    fn get_q(&self) -> DVector<f64> {
        self.q.clone()
    }

    fn get_q_dot(&self) -> DVector<f64> {
        self.q_dot.clone()
    }

    fn get_mass_matrix(&self) -> DMatrix<f64> {
        DMatrix::identity(self.n_q_dot(), self.n_q_dot())
    }

    fn get_gravity(&self) -> DVector<f64> {
        DVector::zeros(self.n_q_dot())
    }

    fn get_coriolis(&self) -> DVector<f64> {
        DVector::zeros(self.n_q_dot())
    }

    fn get_com_pos(&self) -> Vector3<f64> {
        self.com_pos
    }

    fn get_com_lin_vel(&self) -> Vector3<f64> {
        self.com_vel
    }

    fn get_com_lin_jacobian(&self) -> DMatrix<f64> {
        self.com_jacobian.clone()
    }

    fn get_com_lin_jacobian_dot(&self) -> DMatrix<f64> {
        self.com_jacobian_dot.clone()
    }

    fn get_link_iso(&self, link: &str) -> Result<Isometry3<f64>, WbcError> {
        Ok(self.lookup(link)?.iso)
    }

    fn get_link_vel(&self, link: &str) -> Result<Vector6<f64>, WbcError> {
        Ok(self.lookup(link)?.vel)
    }

    fn get_link_jacobian(&self, link: &str) -> Result<DMatrix<f64>, WbcError> {
        Ok(self.lookup(link)?.jacobian.clone())
    }

    fn get_link_jacobian_dot(&self, link: &str) -> Result<DMatrix<f64>, WbcError> {
        Ok(self.lookup(link)?.jacobian_dot.clone())
    }
}

// ---------------------------------------------------------------------------
// MockBatchRobot
// ---------------------------------------------------------------------------

/// Independent [`MockRobot`] instances stacked for batched evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct MockBatchRobot {
    pub instances: Vec<MockRobot>,
}

impl MockBatchRobot {
    /// All instances must share the same joint count.
    pub fn new(instances: Vec<MockRobot>) -> Self {
        if let Some(first) = instances.first() {
            assert!(
                instances.iter().all(|r| r.n_q_dot() == first.n_q_dot()),
                "mock batch instances differ in n_q_dot"
            );
        }
        Self { instances }
    }

    fn stack(&self, f: impl Fn(&MockRobot) -> Vec<f64>) -> Vec<f64> {
        self.instances.iter().flat_map(f).collect()
    }

    fn stack_links(
        &self,
        link: &str,
        f: impl Fn(&MockLink) -> Vec<f64>,
    ) -> Result<Vec<f64>, WbcError> {
        let mut out = Vec::new();
        for robot in &self.instances {
            out.extend(f(robot.lookup(link)?));
        }
        Ok(out)
    }
}

fn row_major(m: &DMatrix<f64>) -> Vec<f64> {
    m.transpose().as_slice().to_vec()
}

impl BatchRobotModel for MockBatchRobot {
    fn n_batch(&self) -> usize {
        self.instances.len()
    }

    fn n_q_dot(&self) -> usize {
        self.instances.first().map_or(0, |r| r.n_q_dot())
    }

    fn get_q_dot(&self) -> Vec<f64> {
        self.stack(|r| r.q_dot.as_slice().to_vec())
    }

    fn get_com_pos(&self) -> Vec<f64> {
        self.stack(|r| r.com_pos.as_slice().to_vec())
    }

    fn get_com_lin_vel(&self) -> Vec<f64> {
        self.stack(|r| r.com_vel.as_slice().to_vec())
    }

    fn get_com_lin_jacobian(&self) -> Vec<f64> {
        self.stack(|r| row_major(&r.com_jacobian))
    }

    fn get_com_lin_jacobian_dot(&self) -> Vec<f64> {
        self.stack(|r| row_major(&r.com_jacobian_dot))
    }

    fn get_link_pos(&self, link: &str) -> Result<Vec<f64>, WbcError> {
        self.stack_links(link, |l| l.iso.translation.vector.as_slice().to_vec())
    }

    fn get_link_quat(&self, link: &str) -> Result<Vec<f64>, WbcError> {
        // nalgebra stores quaternion coords as [i, j, k, w]
        self.stack_links(link, |l| l.iso.rotation.coords.as_slice().to_vec())
    }

    fn get_link_vel(&self, link: &str) -> Result<Vec<f64>, WbcError> {
        self.stack_links(link, |l| l.vel.as_slice().to_vec())
    }

    fn get_link_jacobian(&self, link: &str) -> Result<Vec<f64>, WbcError> {
        self.stack_links(link, |l| row_major(&l.jacobian))
    }

    fn get_link_jacobian_dot(&self, link: &str) -> Result<Vec<f64>, WbcError> {
        self.stack_links(link, |l| row_major(&l.jacobian_dot))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
