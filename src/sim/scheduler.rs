//! Timed spawn scheduler
//!
//! Obstacles, coins and power-ups each run their own accumulator against a
//! randomized interval. When the accumulator crosses the interval a pattern
//! is chosen, expanded into descriptors and the timer rearms.

use rand::Rng;

use super::difficulty::DifficultyState;
use super::entity::EntityKind;
use super::patterns::{self, PatternArchetype, SpawnClass, SpawnDescriptor};
use crate::settings::SpawnSettings;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpawnTimer {
    pub accumulator: f32,
    pub interval: f32,
}

impl SpawnTimer {
    fn new(interval: f32) -> Self {
        Self {
            accumulator: 0.0,
            interval,
        }
    }

    /// Advance; true when the interval elapsed (caller rearms)
    fn advance(&mut self, dt: f32) -> bool {
        self.accumulator += dt;
        self.accumulator >= self.interval
    }

    fn rearm(&mut self, interval: f32) {
        self.accumulator = 0.0;
        self.interval = interval;
    }
}

/// One emitted pattern
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub class: SpawnClass,
    pub archetype: PatternArchetype,
    pub descriptors: Vec<SpawnDescriptor>,
}

#[derive(Debug, Clone)]
pub struct SpawnScheduler {
    settings: SpawnSettings,
    obstacle: SpawnTimer,
    coin: SpawnTimer,
    power_up: SpawnTimer,
    /// Time since the run started (opening grace window)
    elapsed: f32,
}

impl SpawnScheduler {
    pub fn new(settings: SpawnSettings) -> Self {
        Self {
            obstacle: SpawnTimer::new(settings.obstacle_initial),
            coin: SpawnTimer::new(settings.coin_initial),
            power_up: SpawnTimer::new(settings.power_up_initial),
            elapsed: 0.0,
            settings,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.settings.clone());
    }

    pub fn timer(&self, class: SpawnClass) -> SpawnTimer {
        match class {
            SpawnClass::Obstacle => self.obstacle,
            SpawnClass::Coin => self.coin,
            SpawnClass::PowerUp => self.power_up,
        }
    }

    /// Fresh randomized interval for a stream
    pub fn next_interval<R: Rng + ?Sized>(
        &self,
        class: SpawnClass,
        difficulty: &DifficultyState,
        rng: &mut R,
    ) -> f32 {
        let s = &self.settings;
        let i = difficulty.intensity.clamp(0.0, 1.0);
        let r: f32 = rng.random();
        let interval = match class {
            SpawnClass::Obstacle => {
                let base = if self.elapsed < s.grace_window {
                    s.obstacle_grace_base
                } else {
                    s.obstacle_base
                };
                (base + r * s.obstacle_jitter) / (1.0 + i * s.obstacle_intensity_scale)
            }
            SpawnClass::Coin => {
                (s.coin_base + r * s.coin_jitter) * (1.0 + (1.0 - i) * s.coin_calm_widening)
            }
            SpawnClass::PowerUp => {
                (s.power_up_base + r * s.power_up_jitter) / (1.0 + i * s.power_up_intensity_scale)
            }
        };
        interval * (1.0 + difficulty.combo_bonus * s.skill_widening)
    }

    /// Advance all three streams by `dt` (already time-dilated)
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        dt: f32,
        difficulty: &DifficultyState,
        rng: &mut R,
    ) -> Vec<SpawnRequest> {
        self.elapsed += dt;
        let mut out = Vec::new();

        for class in SpawnClass::ALL {
            if class == SpawnClass::Obstacle && difficulty.safe_zone_active {
                self.obstacle.accumulator = 0.0;
                continue;
            }
            let fired = match class {
                SpawnClass::Obstacle => self.obstacle.advance(dt),
                SpawnClass::Coin => self.coin.advance(dt),
                SpawnClass::PowerUp => self.power_up.advance(dt),
            };
            if !fired {
                continue;
            }

            let archetype = patterns::select_pattern(class, difficulty.intensity, rng);
            let mut descriptors = patterns::generate(archetype, difficulty, rng);
            if difficulty.safe_zone_active {
                descriptors.retain(|d| d.kind != EntityKind::Obstacle);
            }
            let interval = self.next_interval(class, difficulty, rng);
            match class {
                SpawnClass::Obstacle => self.obstacle.rearm(interval),
                SpawnClass::Coin => self.coin.rearm(interval),
                SpawnClass::PowerUp => self.power_up.rearm(interval),
            }

            log::debug!(
                "{} pattern {:?}: {} descriptors, next in {:.2}s",
                class.as_str(),
                archetype,
                descriptors.len(),
                interval
            );
            out.push(SpawnRequest {
                class,
                archetype,
                descriptors,
            });
        }
        out
    }
}
