//! Jump safety
//!
//! Predicts where an airborne player will touch down and vetoes spawns that
//! would make the landing unavoidable. Landing grants a short invincibility
//! window. Near misses only raise advisory danger zones.
//!
//! Every timer here runs on a local clock advanced by `dt * time_scale`, so
//! fairness windows stretch with time dilation and stop when ticking stops.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::entity::ObstacleKind;
use super::pool::{Arena, Poolable};
use crate::error::{Result, SimError};
use crate::settings::SafetySettings;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandingPrediction {
    pub origin: Vec3,
    pub landing: Vec3,
    pub radius: f32,
    /// Safety-clock time of touchdown
    pub landing_time: f32,
    /// Airtime of one hop
    pub hang_time: f32,
    /// Ground covered by one hop
    pub stride: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DangerZone {
    pub position: Vec3,
    pub radius: f32,
    pub created: f32,
    pub ttl: f32,
}

impl Poolable for DangerZone {
    fn reset(&mut self) {
        *self = DangerZone::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnsafeReason {
    /// A sweeping obstacle can reach the landing zone before touchdown
    MovingObstacleInLandingZone,
    /// A static obstacle sits in the landing zone with no time to react
    TooCloseToLanding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnVerdict {
    Safe,
    Unsafe(UnsafeReason),
}

impl SpawnVerdict {
    pub fn is_safe(&self) -> bool {
        matches!(self, SpawnVerdict::Safe)
    }
}

/// Hang time of a ballistic jump
#[inline]
pub fn hang_time(v0: f32, gravity: f32) -> f32 {
    if gravity > 0.0 { 2.0 * v0 / gravity } else { 0.0 }
}

#[derive(Debug, Clone)]
pub struct JumpSafety {
    settings: SafetySettings,
    /// Local clock, scaled by time dilation
    clock: f32,
    prediction: Option<LandingPrediction>,
    invincibility: f32,
    zones: Arena<DangerZone>,
}

impl JumpSafety {
    pub fn new(settings: SafetySettings) -> Self {
        let zones = Arena::new(settings.max_danger_zones, DangerZone::default);
        Self {
            settings,
            clock: 0.0,
            prediction: None,
            invincibility: 0.0,
            zones,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.settings.clone());
    }

    pub fn prediction(&self) -> Option<&LandingPrediction> {
        self.prediction.as_ref()
    }

    pub fn is_invincible(&self) -> bool {
        self.invincibility > 0.0
    }

    pub fn invincibility_remaining(&self) -> f32 {
        self.invincibility
    }

    /// Seconds until the predicted touchdown, if airborne
    pub fn time_to_land(&self) -> Option<f32> {
        self.prediction.map(|p| p.landing_time - self.clock)
    }

    /// Record a takeoff. Replaces any earlier prediction and ends the
    /// landing grace window.
    pub fn on_jump(&mut self, pos: Vec3, v0: f32, horizontal_speed: f32) -> LandingPrediction {
        let t = hang_time(v0, self.settings.gravity);
        let prediction = LandingPrediction {
            origin: pos,
            landing: Vec3::new(pos.x, 0.0, pos.z - horizontal_speed * t),
            radius: self.settings.safety_radius,
            landing_time: self.clock + t,
            hang_time: t,
            stride: horizontal_speed * t,
        };
        self.prediction = Some(prediction);
        self.invincibility = 0.0;
        prediction
    }

    /// Touchdown. Without a prediction this does nothing.
    pub fn on_landing(&mut self) -> bool {
        if self.prediction.take().is_none() {
            return false;
        }
        self.invincibility = self.settings.landing_grace;
        true
    }

    /// Landing of the repeated hop cadence nearest to `z`, as
    /// `(landing_z, time_to_land)`. Hop `k` lands `k * stride` past the
    /// predicted landing; only hops touching down within `horizon` count.
    pub fn cadence_landing(&self, z: f32, horizon: f32) -> Option<(f32, f32)> {
        let p = self.prediction?;
        let time_to_land = p.landing_time - self.clock;
        if time_to_land >= horizon {
            return None;
        }
        if p.stride <= 0.0 || p.hang_time <= 0.0 {
            return Some((p.landing.z, time_to_land));
        }
        let last = ((horizon - time_to_land) / p.hang_time).floor();
        let k = ((p.landing.z - z) / p.stride).round().clamp(0.0, last);
        Some((p.landing.z - k * p.stride, time_to_land + k * p.hang_time))
    }

    /// Would an obstacle of `kind` at `pos` make a landing unfair.
    ///
    /// Static obstacles are judged against the imminent landing. Moving ones
    /// are judged against the hop cadence out to the moving horizon, which
    /// reaches as far as the spawn line for a player who keeps jumping.
    pub fn is_safe_to_spawn(&self, pos: Vec3, kind: ObstacleKind) -> SpawnVerdict {
        let Some(landing) = self.prediction else {
            return SpawnVerdict::Safe;
        };
        let lateral = (pos.x - landing.landing.x).abs();

        if kind.is_moving() {
            let reach = (lateral - kind.sweep_amplitude()).max(0.0);
            if reach >= landing.radius {
                return SpawnVerdict::Safe;
            }
            return match self.cadence_landing(pos.z, self.settings.moving_horizon) {
                Some((z, _)) if (pos.z - z).abs() < self.settings.zone_depth => {
                    SpawnVerdict::Unsafe(UnsafeReason::MovingObstacleInLandingZone)
                }
                _ => SpawnVerdict::Safe,
            };
        }

        let time_to_land = landing.landing_time - self.clock;
        let longitudinal = (pos.z - landing.landing.z).abs();
        if longitudinal < self.settings.zone_depth
            && lateral < landing.radius
            && time_to_land < self.settings.reaction_threshold
        {
            return SpawnVerdict::Unsafe(UnsafeReason::TooCloseToLanding);
        }
        SpawnVerdict::Safe
    }

    /// Flag the first obstacle closing on the landing zone. Advisory only.
    pub fn check_near_miss<I>(&mut self, is_jumping: bool, obstacles: I) -> Option<DangerZone>
    where
        I: IntoIterator<Item = Vec3>,
    {
        if !is_jumping {
            return None;
        }
        let landing = self.prediction?;
        let hit = obstacles.into_iter().find(|p| {
            (p.x - landing.landing.x).abs() < landing.radius + self.settings.near_miss_margin
                && (p.z - landing.landing.z).abs() < self.settings.near_miss_depth
        })?;
        Some(self.add_danger_zone(hit, landing.radius))
    }

    /// Insert a zone, evicting the oldest when full
    fn add_danger_zone(&mut self, position: Vec3, radius: f32) -> DangerZone {
        if self.zones.is_full() {
            let oldest = self
                .zones
                .iter_active()
                .min_by(|a, b| a.1.created.total_cmp(&b.1.created))
                .map(|(h, _)| h);
            if let Some(h) = oldest {
                self.zones.release(h);
            }
        }
        let zone = DangerZone {
            position,
            radius,
            created: self.clock,
            ttl: self.settings.danger_zone_ttl,
        };
        if let Some((_, slot)) = self.zones.acquire() {
            *slot = zone;
        }
        zone
    }

    pub fn danger_zones(&self) -> Vec<DangerZone> {
        self.zones.iter_active().map(|(_, z)| *z).collect()
    }

    /// Advance timers by `dt * time_scale`. A prediction that outlives its
    /// landing time by more than the stale margin is discarded.
    pub fn update(&mut self, dt: f32, time_scale: f32, is_jumping: bool) -> Result<()> {
        let scaled = dt * time_scale.max(0.0);
        self.clock += scaled;

        if self.invincibility > 0.0 {
            self.invincibility = (self.invincibility - scaled).max(0.0);
        }

        let now = self.clock;
        let expired: Vec<_> = self
            .zones
            .iter_active()
            .filter(|(_, z)| now - z.created >= z.ttl)
            .map(|(h, _)| h)
            .collect();
        for h in expired {
            self.zones.release(h);
        }

        if !is_jumping && self.prediction.is_some() {
            self.on_landing();
            return Ok(());
        }

        if let Some(p) = self.prediction {
            let overdue = now - p.landing_time;
            if overdue > self.settings.stale_margin {
                self.prediction = None;
                return Err(SimError::StalePrediction { overdue });
            }
        }
        Ok(())
    }
}
