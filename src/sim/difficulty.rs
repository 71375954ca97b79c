//! Difficulty curve
//!
//! Intensity is a short sine wave (calm -> intense -> calm every wave) lifted
//! by a slow logarithmic ramp over distance. Everything downstream reads the
//! resulting `DifficultyState`; nothing writes it except the manager.

use serde::{Deserialize, Serialize};

use super::entity::ObstacleKind;
use crate::settings::DifficultySettings;

/// Pure intensity function, always in [0, 1]
pub fn intensity(distance: f32, wave_time: f32, wave_duration: f32) -> f32 {
    let distance = if distance.is_finite() { distance.max(0.0) } else { 0.0 };
    let progress = if wave_duration > 0.0 && wave_time.is_finite() {
        wave_time.rem_euclid(wave_duration) / wave_duration
    } else {
        0.0
    };
    let wave = 0.3 + (progress * std::f32::consts::PI).sin() * 0.6;
    let ramp = ((distance / 1000.0 + 1.0).log10() / 5.0).min(1.0);
    (wave + ramp * 0.3).clamp(0.0, 1.0)
}

/// Named intensity band (telemetry only, never drives gameplay)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum IntensityTier {
    #[default]
    Easy,
    EasyPlus,
    Normal,
    Hard,
    Extreme,
}

impl IntensityTier {
    pub fn from_intensity(intensity: f32) -> Self {
        if intensity < 0.40 {
            IntensityTier::Easy
        } else if intensity < 0.55 {
            IntensityTier::EasyPlus
        } else if intensity < 0.70 {
            IntensityTier::Normal
        } else if intensity < 0.85 {
            IntensityTier::Hard
        } else {
            IntensityTier::Extreme
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            IntensityTier::Easy => "EASY",
            IntensityTier::EasyPlus => "EASY+",
            IntensityTier::Normal => "NORMAL",
            IntensityTier::Hard => "HARD",
            IntensityTier::Extreme => "EXTREME",
        }
    }
}

/// Obstacle catalog bands, unlocked by cumulative distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum ObstacleTier {
    #[default]
    Early,
    Mid,
    Late,
}

const EARLY_KINDS: &[ObstacleKind] = &[
    ObstacleKind::Box,
    ObstacleKind::Spike,
    ObstacleKind::Barrier,
    ObstacleKind::EnergyBarrier,
    ObstacleKind::TallWall,
    ObstacleKind::BarHigh,
    ObstacleKind::Scooter,
    ObstacleKind::RoadDivider,
];

const MID_KINDS: &[ObstacleKind] = &[
    ObstacleKind::Box,
    ObstacleKind::Spike,
    ObstacleKind::Barrier,
    ObstacleKind::EnergyBarrier,
    ObstacleKind::TallWall,
    ObstacleKind::BarHigh,
    ObstacleKind::Scooter,
    ObstacleKind::RoadDivider,
    ObstacleKind::Wall,
    ObstacleKind::LaserGrid,
    ObstacleKind::MovingBarrier,
    ObstacleKind::DroneTurret,
    ObstacleKind::BarLow,
    ObstacleKind::PlasmaGate,
    ObstacleKind::Dumpster,
];

const LATE_KINDS: &[ObstacleKind] = &[
    ObstacleKind::Box,
    ObstacleKind::Spike,
    ObstacleKind::Barrier,
    ObstacleKind::EnergyBarrier,
    ObstacleKind::TallWall,
    ObstacleKind::BarHigh,
    ObstacleKind::Scooter,
    ObstacleKind::RoadDivider,
    ObstacleKind::Wall,
    ObstacleKind::LaserGrid,
    ObstacleKind::MovingBarrier,
    ObstacleKind::DroneTurret,
    ObstacleKind::BarLow,
    ObstacleKind::PlasmaGate,
    ObstacleKind::Dumpster,
    ObstacleKind::Drone,
    ObstacleKind::RotatingLaser,
];

impl ObstacleTier {
    pub fn from_distance(distance: f32) -> Self {
        let progress = (distance / 3000.0).min(1.0);
        if progress < 0.3 {
            ObstacleTier::Early
        } else if progress < 0.7 {
            ObstacleTier::Mid
        } else {
            ObstacleTier::Late
        }
    }

    /// Obstacle kinds eligible in this band (each band contains the previous)
    pub fn kinds(self) -> &'static [ObstacleKind] {
        match self {
            ObstacleTier::Early => EARLY_KINDS,
            ObstacleTier::Mid => MID_KINDS,
            ObstacleTier::Late => LATE_KINDS,
        }
    }
}

/// Snapshot of the difficulty curve, read by patterns and the scheduler
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DifficultyState {
    pub distance: f32,
    pub wave_time: f32,
    /// 1-based wave counter
    pub wave: u32,
    pub intensity: f32,
    pub tier: IntensityTier,
    pub obstacle_tier: ObstacleTier,
    /// Extra challenge for players holding a combo, in [0, 0.5]
    pub combo_bonus: f32,
    pub safe_zone_active: bool,
    /// Seconds left in the safe zone
    pub safe_zone_remaining: f32,
    pub next_boss_at: f32,
    pub boss_warning: bool,
    pub boss_active: bool,
}

/// Noteworthy transitions from one update
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DifficultyEvent {
    TierChanged(IntensityTier),
    SafeZoneStarted(f32),
    SafeZoneEnded,
    BossWarning,
    BossStarted,
    /// Player ran past the section without it being completed
    BossSkipped,
}

#[derive(Debug, Clone)]
pub struct DifficultyManager {
    settings: DifficultySettings,
    state: DifficultyState,
}

impl DifficultyManager {
    pub fn new(settings: DifficultySettings) -> Self {
        let mut manager = Self {
            settings,
            state: DifficultyState::default(),
        };
        manager.reset();
        manager
    }

    pub fn reset(&mut self) {
        self.state = DifficultyState {
            wave: 1,
            intensity: intensity(0.0, 0.0, self.settings.wave_duration),
            next_boss_at: self.settings.boss_interval,
            ..Default::default()
        };
        self.state.tier = IntensityTier::from_intensity(self.state.intensity);
    }

    pub fn state(&self) -> &DifficultyState {
        &self.state
    }

    /// Advance the wave clock and recompute derived fields
    pub fn update(&mut self, dt: f32, distance: f32, combo_multiplier: f32) -> Vec<DifficultyEvent> {
        let mut events = Vec::new();
        let s = &mut self.state;
        let wave_duration = self.settings.wave_duration;

        s.distance = distance.max(0.0);
        s.wave_time += dt;
        s.wave = if wave_duration > 0.0 {
            (s.wave_time / wave_duration) as u32 + 1
        } else {
            1
        };
        s.intensity = intensity(s.distance, s.wave_time, wave_duration);
        s.combo_bonus = (combo_multiplier * 0.2).clamp(0.0, 0.5);
        s.obstacle_tier = ObstacleTier::from_distance(s.distance);

        let tier = IntensityTier::from_intensity(s.intensity);
        if tier != s.tier {
            s.tier = tier;
            events.push(DifficultyEvent::TierChanged(tier));
        }

        if s.safe_zone_active {
            s.safe_zone_remaining -= dt;
            if s.safe_zone_remaining <= 0.0 {
                s.safe_zone_active = false;
                s.safe_zone_remaining = 0.0;
                log::info!("Safe zone ended at {:.0}m", s.distance);
                events.push(DifficultyEvent::SafeZoneEnded);
            }
        }

        let boss_end = s.next_boss_at + self.settings.boss_length;
        if s.distance >= boss_end {
            s.next_boss_at += self.settings.boss_interval;
            events.push(DifficultyEvent::BossSkipped);
        }
        let warning = s.distance >= s.next_boss_at - self.settings.boss_warning_distance
            && s.distance < s.next_boss_at;
        let active = s.distance >= s.next_boss_at
            && s.distance < s.next_boss_at + self.settings.boss_length;
        if warning && !s.boss_warning {
            events.push(DifficultyEvent::BossWarning);
        }
        if active && !s.boss_active {
            log::info!("Boss section at {:.0}m", s.next_boss_at);
            events.push(DifficultyEvent::BossStarted);
        }
        s.boss_warning = warning;
        s.boss_active = active;

        events
    }

    /// Suppress obstacle emission for `seconds` of simulation time
    pub fn trigger_safe_zone(&mut self, seconds: f32) {
        let seconds = seconds.max(0.0);
        self.state.safe_zone_active = seconds > 0.0;
        self.state.safe_zone_remaining = seconds;
        log::info!("Safe zone for {:.1}s", seconds);
    }

    /// The player beat the current boss section
    pub fn complete_boss_section(&mut self) {
        self.state.next_boss_at += self.settings.boss_interval;
        self.state.boss_active = false;
        self.state.boss_warning = false;
        self.trigger_safe_zone(self.settings.boss_safe_zone);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_tier_scenarios() {
        // Start of a wave is the trough
        let calm = intensity(0.0, 0.0, 15.0);
        assert!((calm - 0.3).abs() < 1e-5);
        assert_eq!(IntensityTier::from_intensity(calm), IntensityTier::Easy);

        // Half-way through a wave is the peak
        let peak = intensity(50_000.0, 7.5, 15.0);
        assert_eq!(peak, 1.0);
        assert_eq!(IntensityTier::from_intensity(peak), IntensityTier::Extreme);
        assert_eq!(IntensityTier::Extreme.label(), "EXTREME");
    }

    #[test]
    fn test_obstacle_tiers_grow_monotonically() {
        for pair in [ObstacleTier::Early, ObstacleTier::Mid, ObstacleTier::Late].windows(2) {
            let smaller = pair[0].kinds();
            let larger = pair[1].kinds();
            assert!(smaller.iter().all(|k| larger.contains(k)));
            assert!(larger.len() > smaller.len());
        }
        assert_eq!(ObstacleTier::from_distance(0.0), ObstacleTier::Early);
        assert_eq!(ObstacleTier::from_distance(1500.0), ObstacleTier::Mid);
        assert_eq!(ObstacleTier::from_distance(9000.0), ObstacleTier::Late);
    }

    #[test]
    fn test_safe_zone_counts_down_in_seconds() {
        let mut manager = DifficultyManager::new(DifficultySettings::default());
        manager.trigger_safe_zone(1.0);
        assert!(manager.state().safe_zone_active);
        manager.update(0.6, 10.0, 1.0);
        assert!(manager.state().safe_zone_active);
        let events = manager.update(0.6, 20.0, 1.0);
        assert!(!manager.state().safe_zone_active);
        assert!(events.contains(&DifficultyEvent::SafeZoneEnded));
    }

    #[test]
    fn test_boss_section_flags() {
        let mut manager = DifficultyManager::new(DifficultySettings::default());
        manager.update(0.016, 1850.0, 1.0);
        assert!(manager.state().boss_warning);
        assert!(!manager.state().boss_active);

        let events = manager.update(0.016, 2100.0, 1.0);
        assert!(events.contains(&DifficultyEvent::BossStarted));
        assert!(manager.state().boss_active);

        manager.complete_boss_section();
        assert_eq!(manager.state().next_boss_at, 4000.0);
        assert!(manager.state().safe_zone_active);
        manager.update(0.016, 2150.0, 1.0);
        assert!(!manager.state().boss_active);
    }

    #[test]
    fn test_combo_bonus_is_capped() {
        let mut manager = DifficultyManager::new(DifficultySettings::default());
        manager.update(0.016, 0.0, 10.0);
        assert_eq!(manager.state().combo_bonus, 0.5);
    }

    proptest! {
        #[test]
        fn test_intensity_in_unit_range(
            distance in 0.0f32..1.0e9,
            wave_time in -1.0e6f32..1.0e6,
        ) {
            let i = intensity(distance, wave_time, 15.0);
            prop_assert!((0.0..=1.0).contains(&i));
        }
    }
}
