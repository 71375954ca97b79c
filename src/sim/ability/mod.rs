//! Player abilities
//!
//! Each ability implements [`Ability`] on top of a shared [`Lifecycle`].
//! The [`AbilityManager`] owns every instance and folds their effects into
//! one [`ModifierSnapshot`] per tick.

pub mod dash;
pub mod energy;
pub mod grapple;
pub mod lifecycle;
pub mod manager;
pub mod shield;
pub mod speed_boost;
pub mod targeting;
pub mod time_slow;

use std::str::FromStr;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{ActivationError, SimError, TransitionReason};

pub use dash::Dash;
pub use energy::EnergyMode;
pub use grapple::{Grapple, GrappleTrajectory};
pub use lifecycle::{AbilityConfig, Lifecycle, LifecycleTick, Phase};
pub use manager::{AbilityManager, ModifierSnapshot};
pub use shield::Shield;
pub use speed_boost::SpeedBoost;
pub use targeting::{RefreshOutcome, Target, TargetingSession};
pub use time_slow::TimeSlow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AbilityId {
    Dash,
    Shield,
    SpeedBoost,
    TimeSlow,
    Grapple,
    EnergyMode,
}

impl AbilityId {
    pub const ALL: [AbilityId; 6] = [
        AbilityId::Dash,
        AbilityId::Shield,
        AbilityId::SpeedBoost,
        AbilityId::TimeSlow,
        AbilityId::Grapple,
        AbilityId::EnergyMode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AbilityId::Dash => "dash",
            AbilityId::Shield => "shield",
            AbilityId::SpeedBoost => "speed_boost",
            AbilityId::TimeSlow => "time_slow",
            AbilityId::Grapple => "grapple",
            AbilityId::EnergyMode => "energy_mode",
        }
    }
}

impl FromStr for AbilityId {
    type Err = SimError;

    /// Case-insensitive; `-`, `_` and spaces are ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "dash" | "lightning" | "lightningdash" | "teleport" => Ok(AbilityId::Dash),
            "shield" => Ok(AbilityId::Shield),
            "speedboost" | "boost" => Ok(AbilityId::SpeedBoost),
            "timeslow" | "slowmo" => Ok(AbilityId::TimeSlow),
            "grapple" | "grapplinghook" => Ok(AbilityId::Grapple),
            "energymode" | "energy" => Ok(AbilityId::EnergyMode),
            _ => Err(SimError::InvalidAbilityId(s.to_string())),
        }
    }
}

impl std::fmt::Display for AbilityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-ability contribution to the tick's modifier snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Modifiers {
    pub speed_multiplier: f32,
    pub time_dilation: f32,
    pub shielded: bool,
    pub invincible: bool,
}

impl Modifiers {
    pub const NEUTRAL: Modifiers = Modifiers {
        speed_multiplier: 1.0,
        time_dilation: 1.0,
        shielded: false,
        invincible: false,
    };
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// World facts an ability may need when it fires
#[derive(Debug, Clone, Copy, Default)]
pub struct AbilityContext<'a> {
    pub player_pos: Vec3,
    /// Lock-on candidates (grapple anchors)
    pub targets: &'a [Target],
    /// Obstacle positions currently in play
    pub obstacles: &'a [Vec3],
}

/// What a successful activation or confirm hands back to the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AbilityEffect {
    Dash { from: Vec3, to: Vec3, invincible_for: f32 },
    Shield { duration: f32 },
    SpeedBoost { multiplier: f32, duration: f32, charges_left: u8 },
    TimeSlow { factor: f32, duration: f32 },
    TargetingStarted { candidates: usize },
    Grapple(GrappleTrajectory),
    EnergyMode { multiplier: f32, duration: f32 },
}

/// Lifecycle transitions reported from `update`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbilityEvent {
    Deactivated(AbilityId),
    Ready(AbilityId),
    ChargeRestored { ability: AbilityId, charges: u8 },
    TargetingCancelled(AbilityId),
    TargetSubstituted(AbilityId),
}

/// UI-facing view of one ability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityStatus {
    pub id: AbilityId,
    pub phase: Phase,
    pub ready: bool,
    pub remaining: f32,
    pub cooldown: f32,
    /// 1.0 right after deactivation, 0.0 when ready
    pub cooldown_fraction: f32,
    pub charges: Option<u8>,
    pub max_charges: Option<u8>,
    pub level: u8,
    pub uses: u32,
}

/// One player ability
pub trait Ability {
    fn id(&self) -> AbilityId;
    fn lifecycle(&self) -> &Lifecycle;
    fn lifecycle_mut(&mut self) -> &mut Lifecycle;

    /// Fire the ability. A rejection leaves every field untouched.
    fn activate(&mut self, ctx: &AbilityContext) -> Result<AbilityEffect, ActivationError>;

    /// Undo whatever the effect changed. Called once, from `deactivate`.
    fn on_deactivate(&mut self) {}

    /// End the Active phase and start Cooldown. Returns false (and does
    /// nothing) when not Active.
    fn deactivate(&mut self) -> bool {
        if !self.lifecycle().is_active() {
            return false;
        }
        self.on_deactivate();
        self.lifecycle_mut().finish()
    }

    /// Advance timers. Expiry deactivates from here and nowhere else.
    fn update(&mut self, dt: f32, _ctx: &AbilityContext) -> Option<AbilityEvent> {
        let id = self.id();
        match self.lifecycle_mut().tick(dt) {
            LifecycleTick::Expired => self.deactivate().then_some(AbilityEvent::Deactivated(id)),
            LifecycleTick::BecameReady => Some(AbilityEvent::Ready(id)),
            LifecycleTick::ChargeRestored => Some(AbilityEvent::ChargeRestored {
                ability: id,
                charges: self.lifecycle().charges(),
            }),
            LifecycleTick::Idle => None,
        }
    }

    fn is_ready(&self) -> bool {
        self.lifecycle().is_ready()
    }

    fn upgrade(&mut self) -> bool {
        self.lifecycle_mut().raise_level()
    }

    /// Contribution while Active
    fn modifiers(&self) -> Modifiers {
        Modifiers::NEUTRAL
    }

    fn status(&self) -> AbilityStatus {
        let l = self.lifecycle();
        let full = l.cooldown_duration();
        AbilityStatus {
            id: self.id(),
            phase: l.phase(),
            ready: l.is_ready(),
            remaining: l.remaining(),
            cooldown: l.cooldown_remaining(),
            cooldown_fraction: if full > 0.0 {
                (l.cooldown_remaining() / full).clamp(0.0, 1.0)
            } else {
                0.0
            },
            charges: l.is_charge_based().then(|| l.charges()),
            max_charges: l.is_charge_based().then(|| l.max_charges()),
            level: l.level(),
            uses: l.uses(),
        }
    }

    fn cycle_target(&mut self, _direction: i32) -> Result<Target, TransitionReason> {
        Err(TransitionReason::NotSupported)
    }

    fn confirm_target(&mut self, _ctx: &AbilityContext) -> Result<AbilityEffect, TransitionReason> {
        Err(TransitionReason::NotSupported)
    }

    fn cancel_target(&mut self) -> Result<(), TransitionReason> {
        Err(TransitionReason::NotSupported)
    }

    /// Position the ability is forcing on the player this tick
    fn forced_position(&self) -> Option<Vec3> {
        None
    }

    /// Absorb a collision. True when the hit was consumed.
    fn absorb_hit(&mut self) -> bool {
        false
    }

    fn on_coin_collected(&mut self, _ctx: &AbilityContext) -> Option<AbilityEffect> {
        None
    }

    fn on_damage(&mut self) {}

    fn reset(&mut self) {
        self.lifecycle_mut().reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ability_id_parsing() {
        for id in AbilityId::ALL {
            assert_eq!(id.as_str().parse::<AbilityId>().unwrap(), id);
        }
        assert_eq!("Speed-Boost".parse::<AbilityId>().unwrap(), AbilityId::SpeedBoost);
        assert_eq!("lightning".parse::<AbilityId>().unwrap(), AbilityId::Dash);
        assert_eq!(
            "jetpack".parse::<AbilityId>(),
            Err(SimError::InvalidAbilityId("jetpack".to_string()))
        );
    }
}
