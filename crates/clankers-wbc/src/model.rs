//! Robot-model interface consumed by tasks and trajectory managers.
//!
//! The rigid-body dynamics provider lives outside this crate. Everything here
//! reads it through [`RobotModel`], which is refreshed by the caller once per
//! control tick before any task or manager touches it.
//!
//! Conventions: generalized velocities are ordered floating base first
//! (`n_floating` entries) then actuated joints. Link twists and Jacobians
//! stack the angular part on top of the linear part.

use std::collections::HashMap;

use nalgebra::{DMatrix, DVector, Isometry3, Vector3, Vector6};

use crate::error::WbcError;

/// Read access to the kinematic and dynamic state of one robot.
///
/// Link lookups take the link name and fail with
/// [`WbcError::UnknownTarget`] when the model has no such link.
pub trait RobotModel {
    /// Number of generalized coordinates.
    fn n_q(&self) -> usize;

    /// Number of generalized velocities.
    fn n_q_dot(&self) -> usize;

    /// Number of floating-base velocities (6, or 0 for a fixed base).
    fn n_floating(&self) -> usize;

    fn get_q(&self) -> DVector<f64>;
    fn get_q_dot(&self) -> DVector<f64>;

    /// Joint-space mass matrix, `n_q_dot × n_q_dot`.
    fn get_mass_matrix(&self) -> DMatrix<f64>;
    fn get_gravity(&self) -> DVector<f64>;
    fn get_coriolis(&self) -> DVector<f64>;

    fn get_com_pos(&self) -> Vector3<f64>;
    fn get_com_lin_vel(&self) -> Vector3<f64>;

    /// Linear COM Jacobian, `3 × n_q_dot`.
    fn get_com_lin_jacobian(&self) -> DMatrix<f64>;
    fn get_com_lin_jacobian_dot(&self) -> DMatrix<f64>;

    /// World pose of a link.
    fn get_link_iso(&self, link: &str) -> Result<Isometry3<f64>, WbcError>;

    /// World twist of a link, `[angular; linear]`.
    fn get_link_vel(&self, link: &str) -> Result<Vector6<f64>, WbcError>;

    /// Link Jacobian, `6 × n_q_dot`, angular rows first.
    fn get_link_jacobian(&self, link: &str) -> Result<DMatrix<f64>, WbcError>;
    fn get_link_jacobian_dot(&self, link: &str) -> Result<DMatrix<f64>, WbcError>;
}

/// Per-joint command produced by [`JointIndexMap::create_cmd`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointCommand {
    pub pos: f64,
    pub vel: f64,
    pub trq: f64,
}

/// Maps named actuated joints of a floating-base robot to indices in the
/// generalized velocity vector.
///
/// Only single-DOF joints behind a 6-DOF floating base are supported.
#[derive(Debug, Clone, PartialEq)]
pub struct JointIndexMap {
    n_floating: usize,
    names: Vec<String>,
    index: HashMap<String, usize>,
}

/// Floating-base DOF count the map supports.
const FLOATING_BASE_DOF: usize = 6;

impl JointIndexMap {
    /// Build from the floating-base DOF count and `(name, dof)` pairs in
    /// generalized-velocity order.
    ///
    /// # Errors
    ///
    /// [`WbcError::Unsupported`] for a fixed base or any multi-DOF joint,
    /// [`WbcError::InvalidArgument`] for duplicate joint names.
    pub fn new<S: Into<String>>(
        n_floating: usize,
        joints: impl IntoIterator<Item = (S, usize)>,
    ) -> Result<Self, WbcError> {
        if n_floating == 0 {
            return Err(WbcError::Unsupported("fixed-base robots".into()));
        }
        if n_floating != FLOATING_BASE_DOF {
            return Err(WbcError::Unsupported(format!(
                "floating base with {n_floating} DOF (expected {FLOATING_BASE_DOF})"
            )));
        }

        let mut names = Vec::new();
        let mut index = HashMap::new();
        for (name, dof) in joints {
            let name = name.into();
            if dof != 1 {
                return Err(WbcError::Unsupported(format!("joint {name} has {dof} DOF")));
            }
            if index.insert(name.clone(), names.len()).is_some() {
                return Err(WbcError::InvalidArgument(format!("duplicate joint {name}")));
            }
            names.push(name);
        }

        Ok(Self {
            n_floating,
            names,
            index,
        })
    }

    /// Build from a robot model and its actuated joint names.
    pub fn from_model<S: Into<String>>(
        robot: &dyn RobotModel,
        joints: impl IntoIterator<Item = S>,
    ) -> Result<Self, WbcError> {
        let map = Self::new(robot.n_floating(), joints.into_iter().map(|j| (j, 1)))?;
        WbcError::check_len(
            "actuated joints",
            robot.n_q_dot().saturating_sub(robot.n_floating()),
            map.n_actuated(),
        )?;
        Ok(map)
    }

    pub const fn n_floating(&self) -> usize {
        self.n_floating
    }

    pub fn n_actuated(&self) -> usize {
        self.names.len()
    }

    /// Joint names in generalized-velocity order.
    pub fn joint_names(&self) -> &[String] {
        &self.names
    }

    /// Index of a joint in the generalized velocity vector.
    pub fn q_idx(&self, joint: &str) -> Result<usize, WbcError> {
        self.index
            .get(joint)
            .map(|i| i + self.n_floating)
            .ok_or_else(|| WbcError::UnknownTarget(joint.into()))
    }

    pub fn q_indices(&self, joints: &[&str]) -> Result<Vec<usize>, WbcError> {
        joints.iter().map(|j| self.q_idx(j)).collect()
    }

    /// Pair actuated-joint command vectors with joint names.
    pub fn create_cmd(
        &self,
        joint_pos: &DVector<f64>,
        joint_vel: &DVector<f64>,
        joint_trq: &DVector<f64>,
    ) -> Result<Vec<(String, JointCommand)>, WbcError> {
        let n = self.n_actuated();
        WbcError::check_len("joint_pos", n, joint_pos.len())?;
        WbcError::check_len("joint_vel", n, joint_vel.len())?;
        WbcError::check_len("joint_trq", n, joint_trq.len())?;

        Ok(self
            .names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                (
                    name.clone(),
                    JointCommand {
                        pos: joint_pos[i],
                        vel: joint_vel[i],
                        trq: joint_trq[i],
                    },
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg_map() -> JointIndexMap {
        JointIndexMap::new(6, [("hip", 1), ("thigh", 1), ("calf", 1)]).unwrap()
    }

    #[test]
    fn indices_are_offset_by_floating_base() {
        let map = leg_map();
        assert_eq!(map.q_idx("hip").unwrap(), 6);
        assert_eq!(map.q_idx("calf").unwrap(), 8);
        assert_eq!(map.q_indices(&["calf", "hip"]).unwrap(), vec![8, 6]);
        assert_eq!(map.n_actuated(), 3);
    }

    #[test]
    fn unknown_joint_is_reported() {
        let err = leg_map().q_idx("ankle").unwrap_err();
        assert!(matches!(err, WbcError::UnknownTarget(ref j) if j == "ankle"));
    }

    #[test]
    fn fixed_base_is_unsupported() {
        let err = JointIndexMap::new(0, [("hip", 1)]).unwrap_err();
        assert!(matches!(err, WbcError::Unsupported(_)));
    }

    #[test]
    fn multi_dof_joint_is_unsupported() {
        let err = JointIndexMap::new(6, [("hip", 1), ("ball", 3)]).unwrap_err();
        assert!(err.to_string().contains("ball has 3 DOF"));
    }

    #[test]
    fn duplicate_joint_is_rejected() {
        let err = JointIndexMap::new(6, [("hip", 1), ("hip", 1)]).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn create_cmd_pairs_by_name() {
        let map = leg_map();
        let cmd = map
            .create_cmd(
                &DVector::from_vec(vec![0.1, 0.2, 0.3]),
                &DVector::zeros(3),
                &DVector::from_vec(vec![1.0, 2.0, 3.0]),
            )
            .unwrap();
        assert_eq!(cmd[1].0, "thigh");
        assert_eq!(
            cmd[1].1,
            JointCommand {
                pos: 0.2,
                vel: 0.0,
                trq: 2.0
            }
        );
        assert!(
            map.create_cmd(&DVector::zeros(2), &DVector::zeros(3), &DVector::zeros(3))
                .is_err()
        );
    }
}
