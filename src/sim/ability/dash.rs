//! Lightning dash: teleport forward with a short invincibility window

use glam::Vec3;

use super::{Ability, AbilityConfig, AbilityContext, AbilityEffect, AbilityId, Lifecycle, Modifiers};
use crate::consts::LANE_WIDTH;
use crate::error::ActivationError;

/// Stop this far short of an obstacle in the dash path
pub const OBSTACLE_CLEARANCE: f32 = 3.0;

#[derive(Debug, Clone)]
pub struct Dash {
    lifecycle: Lifecycle,
}

impl Dash {
    pub fn new(config: AbilityConfig) -> Self {
        Self {
            lifecycle: Lifecycle::new(config),
        }
    }

    /// Dash length (magnitude)
    pub fn distance(&self) -> f32 {
        self.lifecycle.magnitude()
    }
}

/// Landing point of a dash from `from`, clipped before the first obstacle
/// in the player's lane
pub fn dash_destination(from: Vec3, distance: f32, obstacles: &[Vec3]) -> Vec3 {
    let full = from.z - distance;
    let blocker = obstacles
        .iter()
        .filter(|o| (o.x - from.x).abs() < LANE_WIDTH / 2.0)
        .filter(|o| o.z < from.z && o.z >= full - OBSTACLE_CLEARANCE)
        .map(|o| o.z)
        .fold(f32::NEG_INFINITY, f32::max);

    let z = if blocker.is_finite() {
        (blocker + OBSTACLE_CLEARANCE).min(from.z).max(full)
    } else {
        full
    };
    Vec3::new(from.x, from.y, z)
}

impl Ability for Dash {
    fn id(&self) -> AbilityId {
        AbilityId::Dash
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    fn activate(&mut self, ctx: &AbilityContext) -> Result<AbilityEffect, ActivationError> {
        self.lifecycle.can_activate()?;
        let from = ctx.player_pos;
        let to = dash_destination(from, self.distance(), ctx.obstacles);
        let duration = self.lifecycle.active_duration();
        self.lifecycle.begin(duration);
        log::info!("Dash {:.1} units", from.z - to.z);
        Ok(AbilityEffect::Dash {
            from,
            to,
            invincible_for: duration,
        })
    }

    fn modifiers(&self) -> Modifiers {
        Modifiers {
            invincible: self.lifecycle.is_active(),
            ..Modifiers::NEUTRAL
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::AbilitySettings;

    #[test]
    fn test_dash_full_distance_when_clear() {
        let to = dash_destination(Vec3::new(0.0, 1.0, -100.0), 50.0, &[Vec3::new(3.0, 0.0, -120.0)]);
        assert_eq!(to, Vec3::new(0.0, 1.0, -150.0));
    }

    #[test]
    fn test_dash_stops_before_obstacle() {
        let obstacles = [Vec3::new(0.0, 0.0, -130.0), Vec3::new(0.0, 0.0, -120.0)];
        let to = dash_destination(Vec3::new(0.0, 1.0, -100.0), 50.0, &obstacles);
        assert_eq!(to.z, -117.0);
    }

    #[test]
    fn test_dash_grants_invincibility_then_cools_down() {
        let mut dash = Dash::new(AbilitySettings::default().dash);
        let ctx = AbilityContext::default();
        let effect = dash.activate(&ctx).unwrap();
        assert!(matches!(effect, AbilityEffect::Dash { invincible_for, .. } if invincible_for == 1.0));
        assert!(dash.modifiers().invincible);
        assert_eq!(dash.activate(&ctx), Err(ActivationError::AlreadyActive));

        assert!(dash.update(1.0, &ctx).is_some());
        assert!(!dash.modifiers().invincible);
        assert_eq!(dash.activate(&ctx), Err(ActivationError::OnCooldown));
    }

    #[test]
    fn test_dash_upgrade_caps_at_ten() {
        let mut dash = Dash::new(AbilitySettings::default().dash);
        let mut upgrades = 0;
        while dash.upgrade() {
            upgrades += 1;
        }
        assert_eq!(upgrades, 9);
        assert_eq!(dash.lifecycle().cooldown_duration(), 11.0);
    }
}
