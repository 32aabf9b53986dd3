//! Ordered task and contact lists presented to the hierarchy solver.
//!
//! Order is solve priority and is fixed once [`TaskForceContainerBuilder::build`]
//! returns. Tasks and contacts are addressed by the handles the builder hands
//! out; managers store handles and borrow the container per call.

use tracing::info;

use crate::config::{TaskGains, WbcConfig};
use crate::contact::Contact;
use crate::error::WbcError;
use crate::model::RobotModel;
use crate::task::{Task, TaskKind};

/// Handle to a task inside a [`TaskForceContainer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(usize);

impl TaskId {
    /// Position in the solve order.
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Handle to a contact inside a [`TaskForceContainer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactId(usize);

impl ContactId {
    pub const fn index(self) -> usize {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects tasks and contacts in priority order.
#[derive(Debug, Default)]
pub struct TaskForceContainerBuilder {
    tasks: Vec<Task>,
    contacts: Vec<Contact>,
}

impl TaskForceContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task; earlier tasks have higher priority.
    pub fn task(&mut self, task: Task) -> TaskId {
        self.tasks.push(task);
        TaskId(self.tasks.len() - 1)
    }

    pub fn contact(&mut self, contact: Contact) -> ContactId {
        self.contacts.push(contact);
        ContactId(self.contacts.len() - 1)
    }

    pub fn build(self) -> TaskForceContainer {
        info!(
            tasks = self.tasks.len(),
            contacts = self.contacts.len(),
            "built task/force container"
        );
        TaskForceContainer {
            tasks: self.tasks,
            contacts: self.contacts,
        }
    }
}

// ---------------------------------------------------------------------------
// Container
// ---------------------------------------------------------------------------

/// The ordered task and contact lists.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskForceContainer {
    tasks: Vec<Task>,
    contacts: Vec<Contact>,
}

impl TaskForceContainer {
    pub fn builder() -> TaskForceContainerBuilder {
        TaskForceContainerBuilder::new()
    }

    /// Tasks in solve order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn task(&self, id: TaskId) -> Result<&Task, WbcError> {
        self.tasks
            .get(id.0)
            .ok_or_else(|| WbcError::UnknownTarget(format!("task #{}", id.0)))
    }

    pub fn task_mut(&mut self, id: TaskId) -> Result<&mut Task, WbcError> {
        self.tasks
            .get_mut(id.0)
            .ok_or_else(|| WbcError::UnknownTarget(format!("task #{}", id.0)))
    }

    pub fn contact(&self, id: ContactId) -> Result<&Contact, WbcError> {
        self.contacts
            .get(id.0)
            .ok_or_else(|| WbcError::UnknownTarget(format!("contact #{}", id.0)))
    }

    pub fn contact_mut(&mut self, id: ContactId) -> Result<&mut Contact, WbcError> {
        self.contacts
            .get_mut(id.0)
            .ok_or_else(|| WbcError::UnknownTarget(format!("contact #{}", id.0)))
    }

    /// First task controlling `kind`.
    pub fn find_task(&self, kind: &TaskKind) -> Option<TaskId> {
        self.tasks.iter().position(|t| t.kind() == kind).map(TaskId)
    }

    /// First contact on `link`.
    pub fn find_contact(&self, link: &str) -> Option<ContactId> {
        self.contacts
            .iter()
            .position(|c| c.link() == link)
            .map(ContactId)
    }

    /// Refresh every task Jacobian and contact Jacobian.
    ///
    /// Call after the managers have written this tick's setpoints.
    pub fn update_jacobians(&mut self, robot: &dyn RobotModel) -> Result<(), WbcError> {
        for task in &mut self.tasks {
            task.update_jacobian(robot)?;
        }
        for contact in &mut self.contacts {
            contact.update_contact(robot)?;
        }
        Ok(())
    }

    /// Compute every task command.
    pub fn update_cmds(&mut self, robot: &dyn RobotModel) -> Result<(), WbcError> {
        for task in &mut self.tasks {
            task.update_cmd(robot)?;
        }
        Ok(())
    }

    /// `update_jacobians` followed by `update_cmds`.
    pub fn update(&mut self, robot: &dyn RobotModel) -> Result<(), WbcError> {
        self.update_jacobians(robot)?;
        self.update_cmds(robot)
    }

    // -----------------------------------------------------------------------
    // Presets
    // -----------------------------------------------------------------------

    /// COM, base orientation and four point feet.
    ///
    /// Contacts start at `initial_rf_z_max` and are expected to be ramped in.
    pub fn quadruped(
        cfg: &WbcConfig,
        n_q_dot: usize,
        base: &str,
        feet: [&str; 4],
    ) -> Result<(Self, QuadrupedHandles), WbcError> {
        let mut b = Self::builder();
        let com = b.task(Task::new(TaskKind::Com, n_q_dot, &cfg.com, cfg.w_com)?);
        let base_ori = b.task(Task::new(
            TaskKind::link_orientation(base),
            n_q_dot,
            &cfg.base_ori,
            cfg.w_base_ori,
        )?);

        let mut foot_pos = Vec::with_capacity(4);
        for foot in feet {
            foot_pos.push(b.task(Task::new(
                TaskKind::link_position(foot),
                n_q_dot,
                &cfg.foot_pos,
                cfg.w_contact_foot,
            )?));
        }
        let mut foot_contacts = Vec::with_capacity(4);
        for foot in feet {
            foot_contacts.push(b.contact(Contact::point(
                foot,
                n_q_dot,
                cfg.friction_coeff,
                cfg.initial_rf_z_max,
            )?));
        }

        let handles = QuadrupedHandles {
            com,
            base_ori,
            foot_pos: [foot_pos[0], foot_pos[1], foot_pos[2], foot_pos[3]],
            foot_contacts: [
                foot_contacts[0],
                foot_contacts[1],
                foot_contacts[2],
                foot_contacts[3],
            ],
        };
        Ok((b.build(), handles))
    }

    /// COM, torso orientation and two flat feet (position + orientation).
    pub fn biped(
        cfg: &WbcConfig,
        n_q_dot: usize,
        torso: &str,
        lfoot: &str,
        rfoot: &str,
    ) -> Result<(Self, BipedHandles), WbcError> {
        let mut b = Self::builder();
        let foot_task =
            |kind: TaskKind, gains: &TaskGains| Task::new(kind, n_q_dot, gains, cfg.w_contact_foot);
        let sole = |link: &str| {
            Contact::surface(
                link,
                n_q_dot,
                cfg.foot_half_length,
                cfg.foot_half_width,
                cfg.friction_coeff,
                cfg.initial_rf_z_max,
            )
        };

        let com = b.task(Task::new(TaskKind::Com, n_q_dot, &cfg.com, cfg.w_com)?);
        let torso_ori = b.task(Task::new(
            TaskKind::link_orientation(torso),
            n_q_dot,
            &cfg.base_ori,
            cfg.w_base_ori,
        )?);
        let rfoot_pos = b.task(foot_task(TaskKind::link_position(rfoot), &cfg.foot_pos)?);
        let lfoot_pos = b.task(foot_task(TaskKind::link_position(lfoot), &cfg.foot_pos)?);
        let rfoot_ori = b.task(foot_task(TaskKind::link_orientation(rfoot), &cfg.foot_ori)?);
        let lfoot_ori = b.task(foot_task(TaskKind::link_orientation(lfoot), &cfg.foot_ori)?);
        let rfoot_contact = b.contact(sole(rfoot)?);
        let lfoot_contact = b.contact(sole(lfoot)?);

        let handles = BipedHandles {
            com,
            torso_ori,
            rfoot_pos,
            lfoot_pos,
            rfoot_ori,
            lfoot_ori,
            rfoot_contact,
            lfoot_contact,
        };
        Ok((b.build(), handles))
    }
}

/// Handles returned by [`TaskForceContainer::quadruped`], feet in the order given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadrupedHandles {
    pub com: TaskId,
    pub base_ori: TaskId,
    pub foot_pos: [TaskId; 4],
    pub foot_contacts: [ContactId; 4],
}

/// Handles returned by [`TaskForceContainer::biped`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BipedHandles {
    pub com: TaskId,
    pub torso_ori: TaskId,
    pub rfoot_pos: TaskId,
    pub lfoot_pos: TaskId,
    pub rfoot_ori: TaskId,
    pub lfoot_ori: TaskId,
    pub rfoot_contact: ContactId,
    pub lfoot_contact: ContactId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::ContactKind;

    const FEET: [&str; 4] = ["FL_foot", "FR_foot", "RL_foot", "RR_foot"];

    #[test]
    fn builder_preserves_order() {
        let gains = TaskGains::uniform(1.0, 0.1);
        let mut b = TaskForceContainer::builder();
        let a = b.task(Task::new(TaskKind::Com, 12, &gains, 1.0).unwrap());
        let c = b.task(Task::new(TaskKind::link_position("hand"), 12, &gains, 2.0).unwrap());
        let k = b.contact(Contact::point("foot", 12, 0.5, 100.0).unwrap());
        let container = b.build();

        assert_eq!(a.index(), 0);
        assert_eq!(c.index(), 1);
        assert_eq!(container.tasks().len(), 2);
        assert_eq!(container.tasks()[1].kind(), &TaskKind::link_position("hand"));
        assert_eq!(container.contact(k).unwrap().link(), "foot");
        assert_eq!(container.find_task(&TaskKind::Com), Some(a));
        assert_eq!(container.find_contact("foot"), Some(k));
        assert_eq!(container.find_contact("hand"), None);
    }

    #[test]
    fn foreign_handle_is_unknown_target() {
        let (quad, handles) =
            TaskForceContainer::quadruped(&WbcConfig::quadruped(), 18, "trunk", FEET).unwrap();
        let empty = TaskForceContainer::builder().build();
        assert!(quad.task(handles.com).is_ok());
        assert!(matches!(
            empty.task(handles.com),
            Err(WbcError::UnknownTarget(_))
        ));
    }

    #[test]
    fn quadruped_preset_layout() {
        let cfg = WbcConfig::quadruped();
        let (container, h) = TaskForceContainer::quadruped(&cfg, 18, "trunk", FEET).unwrap();
        assert_eq!(container.tasks().len(), 6);
        assert_eq!(container.contacts().len(), 4);
        assert_eq!(container.task(h.com).unwrap().w_hierarchy(), cfg.w_com);
        assert_eq!(
            container.task(h.base_ori).unwrap().kind(),
            &TaskKind::link_orientation("trunk")
        );
        let rr = container.task(h.foot_pos[3]).unwrap();
        assert_eq!(rr.kind(), &TaskKind::link_position("RR_foot"));
        assert_eq!(rr.kp().as_slice(), &cfg.foot_pos.kp);
        for id in h.foot_contacts {
            let contact = container.contact(id).unwrap();
            assert_eq!(contact.kind(), ContactKind::Point);
            assert_eq!(contact.rf_z_max, cfg.initial_rf_z_max);
        }
    }

    #[test]
    fn biped_preset_layout() {
        let cfg = WbcConfig::biped();
        let (mut container, h) =
            TaskForceContainer::biped(&cfg, 30, "torso", "l_foot", "r_foot").unwrap();
        let kinds: Vec<String> = container.tasks().iter().map(|t| t.kind().to_string()).collect();
        assert_eq!(
            kinds,
            [
                "com",
                "link_ori(torso)",
                "link_xyz(r_foot)",
                "link_xyz(l_foot)",
                "link_ori(r_foot)",
                "link_ori(l_foot)"
            ]
        );
        assert_eq!(container.contact(h.rfoot_contact).unwrap().dim(), 6);

        container.contact_mut(h.lfoot_contact).unwrap().rf_z_max = cfg.rf_z_max;
        assert_eq!(container.contacts()[1].rf_z_max, 2000.0);
    }
}
