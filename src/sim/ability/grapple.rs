//! Grappling hook: lock onto an obstacle ahead and get pulled to it
//!
//! Activation opens a targeting session instead of firing. The session is
//! re-validated every tick; confirming computes the pull trajectory and
//! enters Active for the pull duration.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::targeting::{RefreshOutcome, Target, TargetingSession};
use super::{
    Ability, AbilityConfig, AbilityContext, AbilityEffect, AbilityEvent, AbilityId, Lifecycle,
    Modifiers, Phase,
};
use crate::error::{ActivationError, TransitionReason};
use crate::lane_for_x;

/// Candidates may sit at most this far behind the player
const SCAN_BEHIND_TOLERANCE: f32 = 2.0;
/// Confirming fails once the target is this far behind
const CONFIRM_BEHIND_LIMIT: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrappleTrajectory {
    pub start: Vec3,
    pub target: Vec3,
    pub lane: u8,
    /// Constant-speed equivalent (distance / duration)
    pub velocity: Vec3,
    pub duration: f32,
}

impl GrappleTrajectory {
    pub fn new(start: Vec3, target: Vec3, duration: f32) -> Self {
        let duration = duration.max(f32::EPSILON);
        Self {
            start,
            target,
            lane: lane_for_x(target.x),
            velocity: (target - start) / duration,
            duration,
        }
    }

    /// Eased position `elapsed` seconds into the pull
    pub fn position_at(&self, elapsed: f32) -> Vec3 {
        let t = (elapsed / self.duration).clamp(0.0, 1.0);
        self.start.lerp(self.target, ease_in_out_quad(t))
    }
}

#[inline]
pub fn ease_in_out_quad(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        -1.0 + (4.0 - 2.0 * t) * t
    }
}

fn ahead_of(player_pos: Vec3) -> impl Fn(&Target) -> bool {
    move |t: &Target| t.position.z <= player_pos.z + SCAN_BEHIND_TOLERANCE
}

#[derive(Debug, Clone)]
pub struct Grapple {
    lifecycle: Lifecycle,
    session: Option<TargetingSession>,
    trajectory: Option<GrappleTrajectory>,
}

impl Grapple {
    pub fn new(config: AbilityConfig) -> Self {
        Self {
            lifecycle: Lifecycle::new(config),
            session: None,
            trajectory: None,
        }
    }

    /// Scan radius (magnitude)
    pub fn scan_radius(&self) -> f32 {
        self.lifecycle.magnitude()
    }

    pub fn session(&self) -> Option<&TargetingSession> {
        self.session.as_ref()
    }

    pub fn trajectory(&self) -> Option<&GrappleTrajectory> {
        self.trajectory.as_ref()
    }

    fn end_targeting(&mut self) {
        self.session = None;
        self.lifecycle.cancel_targeting();
    }
}

impl Ability for Grapple {
    fn id(&self) -> AbilityId {
        AbilityId::Grapple
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    /// Opens targeting; the pull itself starts on confirm
    fn activate(&mut self, ctx: &AbilityContext) -> Result<AbilityEffect, ActivationError> {
        self.lifecycle.can_activate()?;
        let session = TargetingSession::start(
            ctx.player_pos,
            ctx.targets,
            self.scan_radius(),
            ahead_of(ctx.player_pos),
        )
        .ok_or(ActivationError::NoTargets)?;
        self.lifecycle.begin_targeting()?;
        let candidates = session.candidates().len();
        self.session = Some(session);
        log::info!("Grapple targeting, {} candidates", candidates);
        Ok(AbilityEffect::TargetingStarted { candidates })
    }

    fn update(&mut self, dt: f32, ctx: &AbilityContext) -> Option<AbilityEvent> {
        if self.lifecycle.phase() == Phase::Targeting {
            let outcome = match self.session.as_mut() {
                Some(session) => session.refresh(ctx.player_pos, ctx.targets, ahead_of(ctx.player_pos)),
                None => RefreshOutcome::Cancelled,
            };
            return match outcome {
                RefreshOutcome::Kept => None,
                RefreshOutcome::Substituted => Some(AbilityEvent::TargetSubstituted(AbilityId::Grapple)),
                RefreshOutcome::Cancelled => {
                    self.end_targeting();
                    log::debug!("Grapple targeting lost every candidate");
                    Some(AbilityEvent::TargetingCancelled(AbilityId::Grapple))
                }
            };
        }

        let id = self.id();
        match self.lifecycle.tick(dt) {
            super::LifecycleTick::Expired => self.deactivate().then_some(AbilityEvent::Deactivated(id)),
            super::LifecycleTick::BecameReady => Some(AbilityEvent::Ready(id)),
            _ => None,
        }
    }

    fn cycle_target(&mut self, direction: i32) -> Result<Target, TransitionReason> {
        if self.lifecycle.phase() != Phase::Targeting {
            return Err(TransitionReason::NotTargeting);
        }
        self.session
            .as_mut()
            .and_then(|s| s.cycle(direction).copied())
            .ok_or(TransitionReason::NoValidTarget)
    }

    fn confirm_target(&mut self, ctx: &AbilityContext) -> Result<AbilityEffect, TransitionReason> {
        if self.lifecycle.phase() != Phase::Targeting {
            return Err(TransitionReason::NotTargeting);
        }
        let target = *self
            .session
            .as_ref()
            .and_then(|s| s.selected())
            .ok_or(TransitionReason::NoValidTarget)?;
        if target.position.z > ctx.player_pos.z + CONFIRM_BEHIND_LIMIT {
            return Err(TransitionReason::TargetBehind);
        }

        let duration = self.lifecycle.active_duration();
        let trajectory = GrappleTrajectory::new(ctx.player_pos, target.position, duration);
        self.session = None;
        self.trajectory = Some(trajectory);
        self.lifecycle.begin(duration);
        log::info!(
            "Grapple to lane {} ({:.1} units)",
            trajectory.lane,
            ctx.player_pos.distance(target.position)
        );
        Ok(AbilityEffect::Grapple(trajectory))
    }

    fn cancel_target(&mut self) -> Result<(), TransitionReason> {
        if self.lifecycle.phase() != Phase::Targeting {
            return Err(TransitionReason::NotTargeting);
        }
        self.end_targeting();
        Ok(())
    }

    fn forced_position(&self) -> Option<Vec3> {
        if !self.lifecycle.is_active() {
            return None;
        }
        let t = self.trajectory?;
        Some(t.position_at(t.duration - self.lifecycle.remaining()))
    }

    fn modifiers(&self) -> Modifiers {
        Modifiers {
            invincible: self.lifecycle.is_active(),
            ..Modifiers::NEUTRAL
        }
    }

    fn on_deactivate(&mut self) {
        self.trajectory = None;
    }

    fn reset(&mut self) {
        self.lifecycle.reset();
        self.session = None;
        self.trajectory = None;
    }
}
