//! Speed boost: charge-based run speed multiplier

use super::{Ability, AbilityConfig, AbilityContext, AbilityEffect, AbilityId, Lifecycle, Modifiers};
use crate::error::ActivationError;

#[derive(Debug, Clone)]
pub struct SpeedBoost {
    lifecycle: Lifecycle,
}

impl SpeedBoost {
    pub fn new(config: AbilityConfig) -> Self {
        Self {
            lifecycle: Lifecycle::new(config),
        }
    }

    pub fn multiplier(&self) -> f32 {
        self.lifecycle.magnitude()
    }
}

impl Ability for SpeedBoost {
    fn id(&self) -> AbilityId {
        AbilityId::SpeedBoost
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
        log::info!(
            "Speed boost x{:.1}, {} charges left",
            self.multiplier(),
            self.lifecycle.charges()
        );
        Ok(AbilityEffect::SpeedBoost {
            multiplier: self.multiplier(),
            duration,
            charges_left: self.lifecycle.charges(),
        })
    }

    fn modifiers(&self) -> Modifiers {
        if !self.lifecycle.is_active() {
            return Modifiers::NEUTRAL;
        }
        Modifiers {
            speed_multiplier: self.multiplier(),
            ..Modifiers::NEUTRAL
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ability::AbilityEvent;
    use crate::settings::AbilitySettings;

    #[test]
    fn test_charges_run_out_then_one_returns() {
        let config = AbilitySettings::default().speed_boost;
        let max = config.max_charges.unwrap();
        let interval = config.base_cooldown;
        let mut boost = SpeedBoost::new(config);
        let ctx = AbilityContext::default();

        for _ in 0..max {
            boost.activate(&ctx).unwrap();
            // Run the boost out before firing again
            let mut ended = false;
            for _ in 0..4 {
                ended |= boost.update(1.0, &ctx) == Some(AbilityEvent::Deactivated(AbilityId::SpeedBoost));
            }
            assert!(ended);
        }
        assert_eq!(boost.activate(&ctx), Err(ActivationError::NoCharges));

        let mut restored = None;
        let steps = (interval * 4.0) as usize;
        for _ in 0..steps {
            if let Some(event) = boost.update(0.25, &ctx) {
                restored = Some(event);
            }
        }
        assert_eq!(
            restored,
            Some(AbilityEvent::ChargeRestored {
                ability: AbilityId::SpeedBoost,
                charges: 1
            })
        );
        assert_eq!(boost.lifecycle().charges(), 1);
        assert!(boost.activate(&ctx).is_ok());
    }

    #[test]
    fn test_multiplier_only_while_active() {
        let mut boost = SpeedBoost::new(AbilitySettings::default().speed_boost);
        assert_eq!(boost.modifiers().speed_multiplier, 1.0);
        boost.activate(&AbilityContext::default()).unwrap();
        assert!((boost.modifiers().speed_multiplier - 1.8).abs() < 1e-6);
        boost.upgrade();
        assert!((boost.multiplier() - 2.0).abs() < 1e-6);
    }
}
