//! Time slow: dilates world time while active

use super::{Ability, AbilityConfig, AbilityContext, AbilityEffect, AbilityId, Lifecycle, Modifiers};
use crate::error::ActivationError;

#[derive(Debug, Clone)]
pub struct TimeSlow {
    lifecycle: Lifecycle,
}

impl TimeSlow {
    pub fn new(config: AbilityConfig) -> Self {
        Self {
            lifecycle: Lifecycle::new(config),
        }
    }

    /// World time multiplier while active (lower is slower)
    pub fn factor(&self) -> f32 {
        self.lifecycle.magnitude()
    }
}

impl Ability for TimeSlow {
    fn id(&self) -> AbilityId {
        AbilityId::TimeSlow
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
        log::info!("Time slow x{:.2} for {:.1}s", self.factor(), duration);
        Ok(AbilityEffect::TimeSlow {
            factor: self.factor(),
            duration,
        })
    }

    fn modifiers(&self) -> Modifiers {
        if !self.lifecycle.is_active() {
            return Modifiers::NEUTRAL;
        }
        Modifiers {
            time_dilation: self.factor(),
            ..Modifiers::NEUTRAL
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::AbilitySettings;

    #[test]
    fn test_factor_bottoms_out() {
        let mut slow = TimeSlow::new(AbilitySettings::default().time_slow);
        assert!((slow.factor() - 0.4).abs() < 1e-6);
        while slow.upgrade() {}
        assert!((slow.factor() - 0.2).abs() < 1e-6);
        assert!((slow.lifecycle().active_duration() - 6.2).abs() < 1e-5);
        assert_eq!(slow.lifecycle().cooldown_duration(), 13.0);
    }

    #[test]
    fn test_deactivate_fires_once() {
        let mut slow = TimeSlow::new(AbilitySettings::default().time_slow);
        let ctx = AbilityContext::default();
        slow.activate(&ctx).unwrap();
        let mut deactivations = 0;
        for _ in 0..40 {
            if slow.update(0.25, &ctx).is_some_and(|e| {
                e == crate::sim::ability::AbilityEvent::Deactivated(AbilityId::TimeSlow)
            }) {
                deactivations += 1;
            }
        }
        assert_eq!(deactivations, 1);
        assert!(!slow.deactivate());
        assert_eq!(slow.modifiers().time_dilation, 1.0);
    }
}
