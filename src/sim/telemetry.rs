//! Throttled UI telemetry

use serde::{Deserialize, Serialize};

use super::ability::AbilityStatus;
use super::difficulty::{DifficultyState, IntensityTier};
use super::safety::DangerZone;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Simulation time the snapshot was taken
    pub time: f32,
    pub tier: IntensityTier,
    pub intensity_tier_label: String,
    pub intensity: f32,
    pub wave: u32,
    pub distance: f32,
    pub safe_zone: bool,
    pub boss_warning: bool,
    pub boss_active: bool,
    pub danger_zones: Vec<DangerZone>,
    pub abilities: Vec<AbilityStatus>,
}

impl TelemetrySnapshot {
    pub fn build(
        time: f32,
        difficulty: &DifficultyState,
        danger_zones: Vec<DangerZone>,
        abilities: Vec<AbilityStatus>,
    ) -> Self {
        Self {
            time,
            tier: difficulty.tier,
            intensity_tier_label: difficulty.tier.label().to_string(),
            intensity: difficulty.intensity,
            wave: difficulty.wave,
            distance: difficulty.distance,
            safe_zone: difficulty.safe_zone_active,
            boss_warning: difficulty.boss_warning,
            boss_active: difficulty.boss_active,
            danger_zones,
            abilities,
        }
    }
}

/// Emits at most once per interval of simulation time
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryThrottle {
    interval: f32,
    elapsed: f32,
}

impl TelemetryThrottle {
    /// The first `due` call after construction fires immediately
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            elapsed: interval,
        }
    }

    pub fn due(&mut self, dt: f32) -> bool {
        self.elapsed += dt;
        if self.elapsed >= self.interval {
            self.elapsed = 0.0;
            true
        } else {
            false
        }
    }
}
