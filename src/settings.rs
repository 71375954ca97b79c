//! Simulation tuning
//!
//! Every constant the simulation reads at runtime lives here so a run can be
//! re-tuned from JSON without a rebuild. Missing fields fall back to the
//! defaults, which are the shipped game balance.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{GRAVITY, GROUND_RECYCLE_DISTANCE, GROUND_SEGMENT_LENGTH, RELEASE_DISTANCE};
use crate::sim::ability::AbilityConfig;
use crate::sim::entity::EntityKind;
use crate::sim::pool::RecycleSpan;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("settings I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),
}

/// Pool capacities and recycling distances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    pub obstacles: usize,
    pub coins: usize,
    pub power_ups: usize,
    pub segments: usize,
    pub segment_length: f32,
    /// Segments this far behind the player move to the front
    pub segment_recycle_distance: f32,
    /// Random extra gap when a segment is moved
    pub segment_jitter: f32,
    /// Obstacles/coins/power-ups this far behind the player are released
    pub release_distance: f32,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            obstacles: 20,
            coins: 30,
            power_ups: 8,
            segments: 10,
            segment_length: GROUND_SEGMENT_LENGTH,
            segment_recycle_distance: GROUND_RECYCLE_DISTANCE,
            segment_jitter: 0.0,
            release_distance: RELEASE_DISTANCE,
        }
    }
}

impl PoolSettings {
    /// Recycling rule for world segments
    pub fn segment_span(&self) -> RecycleSpan {
        RecycleSpan {
            distance: self.segment_recycle_distance,
            spacing: self.segment_length,
            jitter: self.segment_jitter,
        }
    }

    pub fn capacity(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Obstacle => self.obstacles,
            EntityKind::Coin => self.coins,
            EntityKind::PowerUp => self.power_ups,
            EntityKind::Segment => self.segments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultySettings {
    /// Seconds per calm -> intense -> calm cycle
    pub wave_duration: f32,
    pub boss_interval: f32,
    pub boss_warning_distance: f32,
    pub boss_length: f32,
    /// Safe zone granted for finishing a boss section (seconds)
    pub boss_safe_zone: f32,
}

impl Default for DifficultySettings {
    fn default() -> Self {
        Self {
            wave_duration: 15.0,
            boss_interval: 2000.0,
            boss_warning_distance: 200.0,
            boss_length: 300.0,
            boss_safe_zone: 10.0,
        }
    }
}

/// Spawn cadence (seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnSettings {
    pub obstacle_initial: f32,
    pub obstacle_base: f32,
    /// Base interval during the opening grace window
    pub obstacle_grace_base: f32,
    pub grace_window: f32,
    pub obstacle_jitter: f32,
    pub obstacle_intensity_scale: f32,
    pub coin_initial: f32,
    pub coin_base: f32,
    pub coin_jitter: f32,
    /// Extra coin spacing when calm
    pub coin_calm_widening: f32,
    pub power_up_initial: f32,
    pub power_up_base: f32,
    pub power_up_jitter: f32,
    pub power_up_intensity_scale: f32,
    /// Interval widening per unit of combo bonus
    pub skill_widening: f32,
}

impl Default for SpawnSettings {
    fn default() -> Self {
        Self {
            obstacle_initial: 2.2,
            obstacle_base: 1.8,
            obstacle_grace_base: 1.2,
            grace_window: 0.8,
            obstacle_jitter: 1.0,
            obstacle_intensity_scale: 0.5,
            coin_initial: 1.8,
            coin_base: 1.5,
            coin_jitter: 1.0,
            coin_calm_widening: 0.3,
            power_up_initial: 8.0,
            power_up_base: 6.0,
            power_up_jitter: 4.0,
            power_up_intensity_scale: 0.25,
            skill_widening: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetySettings {
    pub gravity: f32,
    pub safety_radius: f32,
    /// Longitudinal half-depth of the landing zone
    pub zone_depth: f32,
    /// Static obstacles need at least this long before touchdown
    pub reaction_threshold: f32,
    /// How far ahead (seconds) the hop cadence is projected for moving
    /// obstacles. Covers the spawn lead at run speed.
    pub moving_horizon: f32,
    /// Invincibility after touchdown
    pub landing_grace: f32,
    pub danger_zone_ttl: f32,
    pub max_danger_zones: usize,
    pub near_miss_margin: f32,
    pub near_miss_depth: f32,
    /// A prediction this far past its landing time is stale
    pub stale_margin: f32,
}

impl Default for SafetySettings {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            safety_radius: 2.0,
            zone_depth: 10.0,
            reaction_threshold: 0.5,
            moving_horizon: 8.0,
            landing_grace: 0.5,
            danger_zone_ttl: 2.0,
            max_danger_zones: 3,
            near_miss_margin: 2.0,
            near_miss_depth: 8.0,
            stale_margin: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilitySettings {
    pub dash: AbilityConfig,
    pub shield: AbilityConfig,
    pub speed_boost: AbilityConfig,
    pub time_slow: AbilityConfig,
    pub grapple: AbilityConfig,
    pub energy_mode: AbilityConfig,
    /// Coins without damage that earn energy mode
    pub energy_coin_threshold: u32,
}

impl Default for AbilitySettings {
    fn default() -> Self {
        Self {
            dash: AbilityConfig {
                base_cooldown: 20.0,
                cooldown_discount: 1.0,
                min_cooldown: 5.0,
                duration: 1.0,
                magnitude: 50.0,
                magnitude_limit: 50.0,
                max_level: 10,
                ..Default::default()
            },
            shield: AbilityConfig {
                base_cooldown: 15.0,
                cooldown_discount: 2.0,
                min_cooldown: 5.0,
                duration: 5.0,
                duration_per_level: 1.0,
                max_level: 5,
                ..Default::default()
            },
            speed_boost: AbilityConfig {
                base_cooldown: 18.0,
                duration: 4.0,
                magnitude: 1.8,
                magnitude_per_level: 0.2,
                magnitude_limit: 2.6,
                max_charges: Some(2),
                charges_per_level: 1,
                charge_cap: 5,
                max_level: 5,
                ..Default::default()
            },
            time_slow: AbilityConfig {
                base_cooldown: 25.0,
                cooldown_discount: 3.0,
                min_cooldown: 5.0,
                duration: 3.0,
                duration_per_level: 0.8,
                magnitude: 0.4,
                magnitude_per_level: -0.05,
                magnitude_limit: 0.1,
                max_level: 5,
                ..Default::default()
            },
            grapple: AbilityConfig {
                base_cooldown: 8.0,
                cooldown_discount: 0.5,
                min_cooldown: 4.0,
                duration: 0.6,
                magnitude: 120.0,
                magnitude_limit: 120.0,
                max_level: 5,
                ..Default::default()
            },
            energy_mode: AbilityConfig {
                base_cooldown: 0.0,
                duration: 5.0,
                magnitude: 2.0,
                magnitude_limit: 2.0,
                max_charges: Some(1),
                charge_cap: 1,
                max_level: 1,
                ..Default::default()
            },
            energy_coin_threshold: 50,
        }
    }
}

/// All simulation tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub pools: PoolSettings,
    pub difficulty: DifficultySettings,
    pub spawning: SpawnSettings,
    pub safety: SafetySettings,
    pub abilities: AbilitySettings,
    /// Seconds between telemetry snapshots
    pub telemetry_interval: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pools: PoolSettings::default(),
            difficulty: DifficultySettings::default(),
            spawning: SpawnSettings::default(),
            safety: SafetySettings::default(),
            abilities: AbilitySettings::default(),
            telemetry_interval: crate::consts::STATE_UPDATE_INTERVAL,
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        std::fs::write(path, self.to_json()?)?;
        log::info!("Settings saved");
        Ok(())
    }

    /// Load from `path`, falling back to defaults on any failure
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::info!("Using default settings ({e})");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{ "pools": { "obstacles": 5 }, "telemetry_interval": 0.25 }"#;
        let settings = Settings::from_json(json).unwrap();
        assert_eq!(settings.pools.obstacles, 5);
        assert_eq!(settings.pools.coins, 30);
        assert_eq!(settings.telemetry_interval, 0.25);
        assert_eq!(settings.abilities, AbilitySettings::default());
    }

    #[test]
    fn test_json_round_trip() {
        let settings = Settings::default();
        let json = settings.to_json().unwrap();
        assert_eq!(Settings::from_json(&json).unwrap(), settings);
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(matches!(Settings::from_json("{ nope"), Err(SettingsError::Json(_))));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let settings = Settings::load_or_default("/nonexistent/cyber-runner/settings.json");
        assert_eq!(settings, Settings::default());
    }
}
