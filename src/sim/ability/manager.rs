//! Owns every ability and aggregates their modifiers once per tick

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::{
    Ability, AbilityContext, AbilityEffect, AbilityEvent, AbilityId, AbilityStatus, Dash,
    EnergyMode, Grapple, Shield, SpeedBoost, Target, TimeSlow,
};
use crate::error::{Result, SimError};
use crate::settings::AbilitySettings;

/// Everything the rest of the tick needs to know about abilities
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModifierSnapshot {
    /// Product of every active speed bonus
    pub speed_multiplier: f32,
    /// Strongest (smallest) active dilation
    pub time_dilation_factor: f32,
    pub is_shielded: bool,
    pub is_invincible: bool,
}

impl Default for ModifierSnapshot {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            time_dilation_factor: 1.0,
            is_shielded: false,
            is_invincible: false,
        }
    }
}

pub struct AbilityManager {
    abilities: Vec<Box<dyn Ability>>,
}

impl std::fmt::Debug for AbilityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.abilities.iter().map(|a| a.status()))
            .finish()
    }
}

impl AbilityManager {
    pub fn new(settings: &AbilitySettings) -> Self {
        let abilities: Vec<Box<dyn Ability>> = vec![
            Box::new(Dash::new(settings.dash.clone())),
            Box::new(Shield::new(settings.shield.clone())),
            Box::new(SpeedBoost::new(settings.speed_boost.clone())),
            Box::new(TimeSlow::new(settings.time_slow.clone())),
            Box::new(Grapple::new(settings.grapple.clone())),
            Box::new(EnergyMode::new(
                settings.energy_mode.clone(),
                settings.energy_coin_threshold,
            )),
        ];
        Self { abilities }
    }

    fn get(&self, id: AbilityId) -> Option<&dyn Ability> {
        self.abilities.iter().find(|a| a.id() == id).map(|a| a.as_ref())
    }

    fn get_mut(&mut self, id: AbilityId) -> Option<&mut Box<dyn Ability>> {
        self.abilities.iter_mut().find(|a| a.id() == id)
    }

    pub fn ability(&self, id: AbilityId) -> Option<&dyn Ability> {
        self.get(id)
    }

    pub fn activate(&mut self, id: AbilityId, ctx: &AbilityContext) -> Result<AbilityEffect> {
        let ability = self
            .get_mut(id)
            .ok_or_else(|| SimError::InvalidAbilityId(id.as_str().to_string()))?;
        ability
            .activate(ctx)
            .map_err(|source| SimError::Activation { ability: id, source })
    }

    /// Activate by external name
    pub fn activate_named(&mut self, name: &str, ctx: &AbilityContext) -> Result<AbilityEffect> {
        let id: AbilityId = name.parse()?;
        self.activate(id, ctx)
    }

    pub fn cycle_target(&mut self, id: AbilityId, direction: i32) -> Result<Target> {
        let ability = self
            .get_mut(id)
            .ok_or_else(|| SimError::InvalidAbilityId(id.as_str().to_string()))?;
        ability
            .cycle_target(direction)
            .map_err(|reason| SimError::InvalidStateTransition { ability: id, reason })
    }

    pub fn confirm_target(&mut self, id: AbilityId, ctx: &AbilityContext) -> Result<AbilityEffect> {
        let ability = self
            .get_mut(id)
            .ok_or_else(|| SimError::InvalidAbilityId(id.as_str().to_string()))?;
        ability
            .confirm_target(ctx)
            .map_err(|reason| SimError::InvalidStateTransition { ability: id, reason })
    }

    pub fn cancel_target(&mut self, id: AbilityId) -> Result<()> {
        let ability = self
            .get_mut(id)
            .ok_or_else(|| SimError::InvalidAbilityId(id.as_str().to_string()))?;
        ability
            .cancel_target()
            .map_err(|reason| SimError::InvalidStateTransition { ability: id, reason })
    }

    pub fn upgrade(&mut self, id: AbilityId) -> bool {
        self.get_mut(id).is_some_and(|a| a.upgrade())
    }

    /// Tick every ability's countdowns
    pub fn update(&mut self, dt: f32, ctx: &AbilityContext) -> Vec<AbilityEvent> {
        let mut events = Vec::new();
        for ability in &mut self.abilities {
            if let Some(event) = ability.update(dt, ctx) {
                if let AbilityEvent::Deactivated(id) = event {
                    log::info!("{} deactivated, now {}", id, ability.lifecycle().phase().as_str());
                }
                events.push(event);
            }
        }
        events
    }

    /// Fold every active effect plus external invincibility sources
    pub fn snapshot(&self, extra_invincible: bool) -> ModifierSnapshot {
        self.abilities.iter().map(|a| a.modifiers()).fold(
            ModifierSnapshot {
                is_invincible: extra_invincible,
                ..Default::default()
            },
            |acc, m| ModifierSnapshot {
                speed_multiplier: acc.speed_multiplier * m.speed_multiplier,
                time_dilation_factor: acc.time_dilation_factor.min(m.time_dilation),
                is_shielded: acc.is_shielded || m.shielded,
                is_invincible: acc.is_invincible || m.invincible,
            },
        )
    }

    /// Let the first ability that can absorb a hit do so
    pub fn absorb_hit(&mut self) -> Option<AbilityId> {
        self.abilities
            .iter_mut()
            .find_map(|a| a.absorb_hit().then(|| a.id()))
    }

    pub fn on_coin_collected(&mut self, ctx: &AbilityContext) -> Vec<(AbilityId, AbilityEffect)> {
        self.abilities
            .iter_mut()
            .filter_map(|a| a.on_coin_collected(ctx).map(|e| (a.id(), e)))
            .collect()
    }

    pub fn on_damage(&mut self) {
        for ability in &mut self.abilities {
            ability.on_damage();
        }
    }

    /// Position forced on the player by an active ability (grapple pull)
    pub fn forced_position(&self) -> Option<Vec3> {
        self.abilities.iter().find_map(|a| a.forced_position())
    }

    pub fn statuses(&self) -> Vec<AbilityStatus> {
        self.abilities.iter().map(|a| a.status()).collect()
    }

    pub fn reset(&mut self) {
        for ability in &mut self.abilities {
            ability.reset();
        }
    }
}
