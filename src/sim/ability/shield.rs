//! Shield: absorbs the next collision while up

use super::{Ability, AbilityConfig, AbilityContext, AbilityEffect, AbilityId, Lifecycle, Modifiers};
use crate::error::ActivationError;

#[derive(Debug, Clone)]
pub struct Shield {
    lifecycle: Lifecycle,
    /// Hits absorbed this run
    absorbed: u32,
}

impl Shield {
    pub fn new(config: AbilityConfig) -> Self {
        Self {
            lifecycle: Lifecycle::new(config),
            absorbed: 0,
        }
    }

    pub fn absorbed(&self) -> u32 {
        self.absorbed
    }
}

impl Ability for Shield {
    fn id(&self) -> AbilityId {
        AbilityId::Shield
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    fn activate(&mut self, _ctx: &AbilityContext) -> Result<AbilityEffect, ActivationError> {
        self.lifecycle.can_activate()?;
        let duration = self.lifecycle.active_duration();
        self.lifecycle.begin(duration);
        log::info!("Shield up for {:.1}s", duration);
        Ok(AbilityEffect::Shield { duration })
    }

    fn modifiers(&self) -> Modifiers {
        Modifiers {
            shielded: self.lifecycle.is_active(),
            ..Modifiers::NEUTRAL
        }
    }

    /// A blocked hit ends the shield through the normal deactivate path
    fn absorb_hit(&mut self) -> bool {
        if !self.deactivate() {
            return false;
        }
        self.absorbed += 1;
        log::info!("Shield absorbed a hit");
        true
    }

    fn reset(&mut self) {
        self.lifecycle.reset();
        self.absorbed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ability::Phase;
    use crate::settings::AbilitySettings;

    #[test]
    fn test_absorb_consumes_shield() {
        let mut shield = Shield::new(AbilitySettings::default().shield);
        let ctx = AbilityContext::default();
        assert!(!shield.absorb_hit());

        shield.activate(&ctx).unwrap();
        assert!(shield.modifiers().shielded);
        assert!(shield.absorb_hit());
        assert_eq!(shield.lifecycle().phase(), Phase::Cooldown);
        assert!(!shield.modifiers().shielded);
        // Nothing left to absorb, and the countdown cannot deactivate twice
        assert!(!shield.absorb_hit());
        assert_eq!(shield.update(10.0, &ctx), None);
        assert_eq!(shield.absorbed(), 1);
    }

    #[test]
    fn test_upgrade_extends_duration_and_shortens_cooldown() {
        let mut shield = Shield::new(AbilitySettings::default().shield);
        assert!(shield.upgrade());
        assert_eq!(shield.lifecycle().active_duration(), 6.0);
        assert_eq!(shield.lifecycle().cooldown_duration(), 13.0);
    }
}
