use clankers_curves::SmoothChanging;
use tracing::{debug, trace};

use crate::container::{ContactId, TaskForceContainer};
use crate::error::WbcError;

/// Ramps one contact's `rf_z_max` with a cosine blend.
///
/// Used when a foot touches down (ramp up from near zero to the stance
/// limit) or before lift-off (ramp down), so the solver never sees a step
/// change in the admissible normal force.
#[derive(Debug, Clone)]
pub struct ReactionForceManager {
    contact: ContactId,
    active: Option<(f64, SmoothChanging)>,
}

impl ReactionForceManager {
    pub const fn new(contact: ContactId) -> Self {
        Self {
            contact,
            active: None,
        }
    }

    pub const fn contact(&self) -> ContactId {
        self.contact
    }

    /// Start a ramp from the contact's current `rf_z_max` to `target`.
    pub fn initialize(
        &mut self,
        container: &TaskForceContainer,
        start_time: f64,
        duration: f64,
        target: f64,
    ) -> Result<(), WbcError> {
        if !(target >= 0.0 && target.is_finite()) {
            return Err(WbcError::InvalidArgument(format!(
                "rf_z_max target {target} (must be >= 0)"
            )));
        }
        WbcError::check_duration(duration)?;
        let current = container.contact(self.contact)?.rf_z_max;
        let ramp = SmoothChanging::new(current, target, duration)?;
        debug!(
            contact = self.contact.index(),
            from = current,
            to = target,
            duration,
            "rf_z_max ramp initialized"
        );
        self.active = Some((start_time, ramp));
        Ok(())
    }

    /// Set `rf_z_max` directly.
    pub fn update_desired(
        &self,
        container: &mut TaskForceContainer,
        rf_z_max: f64,
    ) -> Result<(), WbcError> {
        container.contact_mut(self.contact)?.rf_z_max = rf_z_max;
        Ok(())
    }

    /// Write the ramp value at `current_time`.
    pub fn update(
        &self,
        container: &mut TaskForceContainer,
        current_time: f64,
    ) -> Result<(), WbcError> {
        let (start_time, ramp) = self.active.as_ref().ok_or(WbcError::NotInitialized)?;
        let value = ramp.evaluate(current_time - start_time);
        trace!(contact = self.contact.index(), rf_z_max = value, "rf_z_max ramp");
        container.contact_mut(self.contact)?.rf_z_max = value;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.active.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::Contact;

    fn one_contact() -> (TaskForceContainer, ContactId) {
        let mut b = TaskForceContainer::builder();
        let id = b.contact(Contact::point("FL_foot", 18, 0.5, 1e-3).unwrap());
        (b.build(), id)
    }

    #[test]
    fn ramps_up_to_target() {
        let (mut container, id) = one_contact();
        let mut manager = ReactionForceManager::new(id);
        manager.initialize(&container, 1.0, 0.2, 400.0).unwrap();

        manager.update(&mut container, 1.0).unwrap();
        assert!((container.contact(id).unwrap().rf_z_max - 1e-3).abs() < 1e-12);
        manager.update(&mut container, 1.1).unwrap();
        let mid = container.contact(id).unwrap().rf_z_max;
        assert!((mid - 0.5 * (400.0 + 1e-3)).abs() < 1e-9);
        manager.update(&mut container, 2.0).unwrap();
        assert_eq!(container.contact(id).unwrap().rf_z_max, 400.0);
    }

    #[test]
    fn update_before_initialize_fails() {
        let (mut container, id) = one_contact();
        let manager = ReactionForceManager::new(id);
        assert!(matches!(
            manager.update(&mut container, 0.0),
            Err(WbcError::NotInitialized)
        ));
    }

    #[test]
    fn rejects_bad_arguments() {
        let (mut container, id) = one_contact();
        let mut manager = ReactionForceManager::new(id);
        assert!(manager.initialize(&container, 0.0, 0.0, 400.0).is_err());
        assert!(manager.initialize(&container, 0.0, 0.2, -1.0).is_err());
        assert!(!manager.is_initialized());

        manager.update_desired(&mut container, 250.0).unwrap();
        assert_eq!(container.contacts()[0].rf_z_max, 250.0);
    }
}
