//! Shared ability lifecycle: Ready -> (Targeting) -> Active -> Cooldown -> Ready
//!
//! Every ability embeds one `Lifecycle` and layers its own effect on top.
//! Timers only move inside `tick`, so pausing the host pauses them too.

use serde::{Deserialize, Serialize};

use crate::error::ActivationError;

/// Tuning for one ability (seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityConfig {
    pub base_cooldown: f32,
    /// Cooldown shaved off per level above 1
    pub cooldown_discount: f32,
    pub min_cooldown: f32,
    pub duration: f32,
    /// Duration added per level above 1
    pub duration_per_level: f32,
    /// Ability-specific strength (multiplier, dilation factor, distance...)
    pub magnitude: f32,
    /// Magnitude change per level above 1 (may be negative)
    pub magnitude_per_level: f32,
    /// Lower bound (or upper, for growing magnitudes) of the magnitude
    pub magnitude_limit: f32,
    /// Charge-based abilities only
    pub max_charges: Option<u8>,
    pub charges_per_level: u8,
    pub charge_cap: u8,
    pub max_level: u8,
}

impl Default for AbilityConfig {
    fn default() -> Self {
        Self {
            base_cooldown: 10.0,
            cooldown_discount: 0.0,
            min_cooldown: 0.0,
            duration: 1.0,
            duration_per_level: 0.0,
            magnitude: 1.0,
            magnitude_per_level: 0.0,
            magnitude_limit: 1.0,
            max_charges: None,
            charges_per_level: 0,
            charge_cap: 0,
            max_level: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Phase {
    #[default]
    Ready,
    Targeting,
    Active,
    Cooldown,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Ready => "ready",
            Phase::Targeting => "targeting",
            Phase::Active => "active",
            Phase::Cooldown => "cooldown",
        }
    }
}

/// What a lifecycle tick asks of its owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleTick {
    Idle,
    /// Active duration ran out; the owner must deactivate now
    Expired,
    /// Cooldown finished this tick
    BecameReady,
    /// A charge came back this tick
    ChargeRestored,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lifecycle {
    pub config: AbilityConfig,
    phase: Phase,
    /// Active time left
    remaining: f32,
    cooldown: f32,
    charges: u8,
    /// Progress toward the next charge
    recharge: f32,
    level: u8,
    uses: u32,
}

impl Lifecycle {
    pub fn new(config: AbilityConfig) -> Self {
        let charges = config.max_charges.unwrap_or(0);
        Self {
            config,
            phase: Phase::Ready,
            remaining: 0.0,
            cooldown: 0.0,
            charges,
            recharge: 0.0,
            level: 1,
            uses: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn cooldown_remaining(&self) -> f32 {
        self.cooldown
    }

    pub fn charges(&self) -> u8 {
        self.charges
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn uses(&self) -> u32 {
        self.uses
    }

    pub fn is_charge_based(&self) -> bool {
        self.config.max_charges.is_some()
    }

    /// Charge ceiling at the current level
    pub fn max_charges(&self) -> u8 {
        match self.config.max_charges {
            Some(base) => {
                let extra = self.config.charges_per_level.saturating_mul(self.level.saturating_sub(1));
                let grown = base.saturating_add(extra);
                if self.config.charge_cap > 0 {
                    grown.min(self.config.charge_cap)
                } else {
                    grown
                }
            }
            None => 0,
        }
    }

    fn levels_gained(&self) -> f32 {
        (self.level.saturating_sub(1)) as f32
    }

    /// Cooldown (or recharge interval) at the current level
    pub fn cooldown_duration(&self) -> f32 {
        let c = &self.config;
        (c.base_cooldown - self.levels_gained() * c.cooldown_discount).max(c.min_cooldown)
    }

    pub fn active_duration(&self) -> f32 {
        self.config.duration + self.levels_gained() * self.config.duration_per_level
    }

    /// Magnitude at the current level, held at `magnitude_limit`
    pub fn magnitude(&self) -> f32 {
        let c = &self.config;
        let value = c.magnitude + self.levels_gained() * c.magnitude_per_level;
        if c.magnitude_per_level < 0.0 {
            value.max(c.magnitude_limit)
        } else if c.magnitude_per_level > 0.0 {
            value.min(c.magnitude_limit)
        } else {
            value
        }
    }

    /// Gate shared by every ability. Never mutates.
    pub fn can_activate(&self) -> Result<(), ActivationError> {
        match self.phase {
            Phase::Active | Phase::Targeting => return Err(ActivationError::AlreadyActive),
            _ => {}
        }
        if self.is_charge_based() {
            if self.charges == 0 {
                return Err(ActivationError::NoCharges);
            }
        } else if self.cooldown > 0.0 {
            return Err(ActivationError::OnCooldown);
        }
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.can_activate().is_ok()
    }

    pub fn begin_targeting(&mut self) -> Result<(), ActivationError> {
        self.can_activate()?;
        self.phase = Phase::Targeting;
        Ok(())
    }

    /// Leave targeting without spending anything
    pub fn cancel_targeting(&mut self) -> bool {
        if self.phase != Phase::Targeting {
            return false;
        }
        self.phase = Phase::Ready;
        true
    }

    /// Enter Active for `duration` seconds, spending a charge if charge-based.
    /// Callers check `can_activate` (or are in Targeting) first.
    pub fn begin(&mut self, duration: f32) {
        if self.is_charge_based() {
            self.charges = self.charges.saturating_sub(1);
        }
        self.phase = Phase::Active;
        self.remaining = duration.max(0.0);
        self.uses += 1;
    }

    /// Leave Active. Returns false when not Active, so repeated calls are
    /// harmless.
    pub fn finish(&mut self) -> bool {
        if self.phase != Phase::Active {
            return false;
        }
        self.remaining = 0.0;
        if self.is_charge_based() {
            self.phase = Phase::Ready;
        } else {
            self.cooldown = self.cooldown_duration();
            self.phase = if self.cooldown > 0.0 {
                Phase::Cooldown
            } else {
                Phase::Ready
            };
        }
        true
    }

    pub fn tick(&mut self, dt: f32) -> LifecycleTick {
        let mut result = LifecycleTick::Idle;
        match self.phase {
            Phase::Active => {
                self.remaining -= dt;
                if self.remaining <= 0.0 {
                    self.remaining = 0.0;
                    return LifecycleTick::Expired;
                }
                // Charges never regenerate while Active
                return LifecycleTick::Idle;
            }
            Phase::Cooldown => {
                self.cooldown -= dt;
                if self.cooldown <= 0.0 {
                    self.cooldown = 0.0;
                    self.phase = Phase::Ready;
                    result = LifecycleTick::BecameReady;
                }
            }
            Phase::Ready | Phase::Targeting => {}
        }

        if self.is_charge_based() {
            let max = self.max_charges();
            let interval = self.cooldown_duration();
            if self.charges < max && interval > 0.0 {
                self.recharge += dt;
                while self.recharge >= interval && self.charges < max {
                    self.recharge -= interval;
                    self.charges += 1;
                    result = LifecycleTick::ChargeRestored;
                }
            }
            if self.charges >= max {
                self.recharge = 0.0;
            }
        }
        result
    }

    /// Raise the level by one. False once capped.
    pub fn raise_level(&mut self) -> bool {
        if self.level >= self.config.max_level {
            return false;
        }
        self.level += 1;
        if self.is_charge_based() {
            // Upgrades refill to the new ceiling
            self.charges = self.max_charges();
            self.recharge = 0.0;
        }
        true
    }

    /// Force a charge in (auto-triggered abilities)
    pub fn grant_charge(&mut self) -> bool {
        if !self.is_charge_based() || self.charges >= self.max_charges() {
            return false;
        }
        self.charges += 1;
        true
    }

    /// Empty the charge pool (abilities whose charges are earned, not regenerated)
    pub fn drain_charges(&mut self) {
        self.charges = 0;
        self.recharge = 0.0;
    }

    /// Back to a fresh level-1 lifecycle
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cooldown_config() -> AbilityConfig {
        AbilityConfig {
            base_cooldown: 15.0,
            cooldown_discount: 2.0,
            min_cooldown: 5.0,
            duration: 5.0,
            ..Default::default()
        }
    }

    fn charge_config() -> AbilityConfig {
        AbilityConfig {
            base_cooldown: 18.0,
            duration: 4.0,
            max_charges: Some(2),
            charges_per_level: 1,
            charge_cap: 5,
            ..Default::default()
        }
    }

    #[test]
    fn test_cooldown_follows_level() {
        let mut l = Lifecycle::new(cooldown_config());
        assert_eq!(l.cooldown_duration(), 15.0);
        assert!(l.raise_level());
        assert!(l.raise_level());
        assert_eq!(l.cooldown_duration(), 11.0);
        while l.raise_level() {}
        assert_eq!(l.level(), 5);
        assert_eq!(l.cooldown_duration(), 7.0);
        assert!(!l.raise_level());
    }

    #[test]
    fn test_expiry_starts_cooldown_same_tick() {
        let mut l = Lifecycle::new(cooldown_config());
        l.can_activate().unwrap();
        l.begin(0.5);
        assert_eq!(l.tick(0.25), LifecycleTick::Idle);
        assert_eq!(l.tick(0.25), LifecycleTick::Expired);
        assert!(l.finish());
        assert_eq!(l.phase(), Phase::Cooldown);
        assert_eq!(l.cooldown_remaining(), 15.0);
        // Second finish is a no-op
        assert!(!l.finish());
        assert_eq!(l.can_activate(), Err(ActivationError::OnCooldown));
    }

    #[test]
    fn test_charges_deplete_and_recover_one_at_a_time() {
        let mut l = Lifecycle::new(charge_config());
        for _ in 0..2 {
            l.can_activate().unwrap();
            l.begin(1.0);
            assert_eq!(l.tick(1.0), LifecycleTick::Expired);
            l.finish();
        }
        assert_eq!(l.can_activate(), Err(ActivationError::NoCharges));
        assert_eq!(l.charges(), 0);

        // One full interval brings back exactly one charge
        for _ in 0..18 {
            l.tick(1.0);
        }
        assert_eq!(l.charges(), 1);
        l.tick(17.0);
        assert_eq!(l.charges(), 1);
        l.tick(1.0);
        assert_eq!(l.charges(), 2);
        l.tick(100.0);
        assert_eq!(l.charges(), 2);
    }

    #[test]
    fn test_upgrade_refills_to_new_ceiling() {
        let mut l = Lifecycle::new(charge_config());
        l.begin(1.0);
        l.finish();
        assert!(l.raise_level());
        assert_eq!(l.charges(), 3);
        for _ in 0..10 {
            l.raise_level();
        }
        assert_eq!(l.max_charges(), 5);
    }

    #[test]
    fn test_magnitude_is_bounded() {
        let l = Lifecycle {
            level: 5,
            ..Lifecycle::new(AbilityConfig {
                magnitude: 0.4,
                magnitude_per_level: -0.1,
                magnitude_limit: 0.1,
                ..Default::default()
            })
        };
        assert!((l.magnitude() - 0.1).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn test_rejected_activation_never_mutates(
            cooldown in 0.01f32..30.0,
            charge_based in any::<bool>(),
            repeats in 1usize..20,
        ) {
            let config = if charge_based { charge_config() } else { cooldown_config() };
            let mut l = Lifecycle::new(config);
            l.begin(5.0);
            if !charge_based {
                l.finish();
                l.cooldown = cooldown;
            }
            let before = l.clone();
            for _ in 0..repeats {
                prop_assert!(l.can_activate().is_err());
                prop_assert!(l.begin_targeting().is_err());
            }
            prop_assert_eq!(&before, &l);
        }
    }
}
