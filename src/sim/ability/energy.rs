//! Energy mode: earned by a clean coin streak, fires itself once per run
//!
//! The single charge is never regenerated; it is granted when the streak
//! reaches the threshold and spent immediately.

use super::{Ability, AbilityConfig, AbilityContext, AbilityEffect, AbilityId, Lifecycle, Modifiers};
use crate::error::ActivationError;

#[derive(Debug, Clone)]
pub struct EnergyMode {
    lifecycle: Lifecycle,
    threshold: u32,
    /// Coins since the last damage
    streak: u32,
    triggered: bool,
}

impl EnergyMode {
    pub fn new(config: AbilityConfig, threshold: u32) -> Self {
        let mut lifecycle = Lifecycle::new(config);
        lifecycle.drain_charges();
        Self {
            lifecycle,
            threshold,
            streak: 0,
            triggered: false,
        }
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn coins_to_activation(&self) -> u32 {
        self.threshold.saturating_sub(self.streak)
    }

    pub fn multiplier(&self) -> f32 {
        self.lifecycle.magnitude()
    }
}

impl Ability for EnergyMode {
    fn id(&self) -> AbilityId {
        AbilityId::EnergyMode
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
        self.triggered = true;
        log::info!("Energy mode for {:.1}s", duration);
        Ok(AbilityEffect::EnergyMode {
            multiplier: self.multiplier(),
            duration,
        })
    }

    fn modifiers(&self) -> Modifiers {
        if !self.lifecycle.is_active() {
            return Modifiers::NEUTRAL;
        }
        Modifiers {
            speed_multiplier: self.multiplier(),
            invincible: true,
            ..Modifiers::NEUTRAL
        }
    }

    fn on_coin_collected(&mut self, ctx: &AbilityContext) -> Option<AbilityEffect> {
        if self.lifecycle.is_active() {
            return None;
        }
        self.streak += 1;
        if self.triggered || self.streak < self.threshold {
            return None;
        }
        self.lifecycle.grant_charge();
        self.activate(ctx).ok()
    }

    fn on_damage(&mut self) {
        if !self.lifecycle.is_active() {
            self.streak = 0;
        }
    }

    /// Earned, not bought
    fn upgrade(&mut self) -> bool {
        false
    }

    fn reset(&mut self) {
        self.lifecycle.reset();
        self.lifecycle.drain_charges();
        self.streak = 0;
        self.triggered = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::AbilitySettings;

    fn energy() -> EnergyMode {
        let settings = AbilitySettings::default();
        EnergyMode::new(settings.energy_mode, settings.energy_coin_threshold)
    }

    #[test]
    fn test_cannot_fire_by_hand() {
        let mut e = energy();
        assert_eq!(e.activate(&AbilityContext::default()), Err(ActivationError::NoCharges));
    }

    #[test]
    fn test_triggers_once_on_clean_streak() {
        let mut e = energy();
        let ctx = AbilityContext::default();
        for _ in 0..49 {
            assert!(e.on_coin_collected(&ctx).is_none());
        }
        let effect = e.on_coin_collected(&ctx);
        assert_eq!(
            effect,
            Some(AbilityEffect::EnergyMode {
                multiplier: 2.0,
                duration: 5.0
            })
        );
        let m = e.modifiers();
        assert!(m.invincible);
        assert_eq!(m.speed_multiplier, 2.0);

        e.update(5.0, &ctx);
        assert!(!e.lifecycle().is_active());
        for _ in 0..100 {
            assert!(e.on_coin_collected(&ctx).is_none());
        }
    }

    #[test]
    fn test_damage_resets_streak() {
        let mut e = energy();
        let ctx = AbilityContext::default();
        for _ in 0..30 {
            e.on_coin_collected(&ctx);
        }
        e.on_damage();
        assert_eq!(e.coins_to_activation(), 50);
    }
}
