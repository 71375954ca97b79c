//! Simulation root
//!
//! `RunnerState` owns every subsystem and the single RNG. Nothing here is
//! global: a new run is `reset()`, which rebuilds everything from the seed.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::ability::{AbilityContext, AbilityEffect, AbilityId, AbilityManager, Target};
use super::difficulty::DifficultyManager;
use super::entity::{EntityKind, EntityView, Payload, PooledEntity};
use super::pool::{EntityHandle, EntityPool};
use super::safety::JumpSafety;
use super::scheduler::SpawnScheduler;
use super::telemetry::{TelemetrySnapshot, TelemetryThrottle};
use crate::settings::Settings;

/// What a host-reported collision amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitOutcome {
    /// Player was invincible (ability or landing grace)
    Ignored,
    /// A shield took the hit and dropped
    Absorbed,
    /// Player takes damage
    Hit,
}

/// Result of picking something up
#[derive(Debug, Clone, PartialEq)]
pub struct Pickup {
    pub payload: Payload,
    /// Abilities the pickup set off (power-ups, energy mode)
    pub triggered: Vec<(AbilityId, AbilityEffect)>,
}

/// Run counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub spawned: u32,
    pub dropped: u32,
    pub vetoed: u32,
    pub coins: u32,
    pub hits: u32,
    pub absorbed: u32,
}

/// Re-roll a world segment's look
pub fn regenerate_segment<R: Rng + ?Sized>(entity: &mut PooledEntity, rng: &mut R) {
    entity.variant_seed = rng.random();
    entity.payload = Payload::Segment {
        height: rng.random_range(8.0..40.0),
        variant: rng.random_range(0..4),
    };
}

pub struct RunnerState {
    pub seed: u64,
    pub rng: Pcg32,
    pub settings: Settings,
    /// Simulation clock (seconds)
    pub clock: f32,
    pub time_ticks: u64,
    pub pool: EntityPool,
    pub difficulty: DifficultyManager,
    pub scheduler: SpawnScheduler,
    pub safety: JumpSafety,
    pub abilities: AbilityManager,
    pub throttle: TelemetryThrottle,
    /// Airborne flag from the previous tick (landing detection)
    pub was_jumping: bool,
    /// Player position from the latest tick
    pub player_pos: Vec3,
    pub stats: RunStats,
}

impl RunnerState {
    pub fn new(seed: u64, settings: Settings) -> Self {
        let mut state = Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            clock: 0.0,
            time_ticks: 0,
            pool: EntityPool::new(&settings.pools),
            difficulty: DifficultyManager::new(settings.difficulty.clone()),
            scheduler: SpawnScheduler::new(settings.spawning.clone()),
            safety: JumpSafety::new(settings.safety.clone()),
            abilities: AbilityManager::new(&settings.abilities),
            throttle: TelemetryThrottle::new(settings.telemetry_interval),
            was_jumping: false,
            player_pos: Vec3::ZERO,
            stats: RunStats::default(),
            settings,
        };
        state.lay_segments();
        log::info!("Run started with seed {}", seed);
        state
    }

    /// Fresh run with the same seed and settings
    pub fn reset(&mut self) {
        *self = Self::new(self.seed, self.settings.clone());
    }

    /// Fill the segment pool back to front from z = 0
    fn lay_segments(&mut self) {
        let length = self.settings.pools.segment_length;
        for i in 0..self.pool.capacity(EntityKind::Segment) {
            let Ok(handle) = self.pool.acquire(EntityKind::Segment) else {
                break;
            };
            if let Some(segment) = self.pool.get_mut(handle) {
                segment.place(Vec3::new(0.0, 0.0, -(i as f32) * length));
                regenerate_segment(segment, &mut self.rng);
            }
        }
    }

    /// Obstacle positions currently in play
    pub fn obstacle_positions(&self) -> Vec<Vec3> {
        self.pool
            .iter_kind(EntityKind::Obstacle)
            .map(|(_, e)| e.position)
            .collect()
    }

    /// Lock-on candidates for targeting abilities
    pub fn grapple_targets(&self) -> Vec<Target> {
        self.pool
            .iter_kind(EntityKind::Obstacle)
            .map(|(handle, e)| Target {
                handle,
                position: e.position,
            })
            .collect()
    }

    /// Pick up a coin or power-up. Stale handles and other kinds yield `None`.
    pub fn collect(&mut self, handle: EntityHandle) -> Option<Pickup> {
        if !matches!(handle.kind, EntityKind::Coin | EntityKind::PowerUp) {
            return None;
        }
        let payload = self.pool.get(handle)?.payload;
        self.pool.release(handle);

        let targets = self.grapple_targets();
        let obstacles = self.obstacle_positions();
        let ctx = AbilityContext {
            player_pos: self.player_pos,
            targets: &targets,
            obstacles: &obstacles,
        };
        let triggered = match payload {
            Payload::Coin { .. } => {
                self.stats.coins += 1;
                self.abilities.on_coin_collected(&ctx)
            }
            Payload::PowerUp { kind } => match kind.ability() {
                Some(id) => match self.abilities.activate(id, &ctx) {
                    Ok(effect) => vec![(id, effect)],
                    Err(e) => {
                        log::debug!("{:?} pickup had no effect: {}", kind, e);
                        Vec::new()
                    }
                },
                None => Vec::new(),
            },
            _ => Vec::new(),
        };
        Some(Pickup { payload, triggered })
    }

    /// Resolve a collision the host detected against an obstacle
    pub fn on_obstacle_hit(&mut self, handle: EntityHandle) -> HitOutcome {
        let snapshot = self.abilities.snapshot(self.safety.is_invincible());
        if snapshot.is_invincible {
            return HitOutcome::Ignored;
        }
        if self.abilities.absorb_hit().is_some() {
            self.stats.absorbed += 1;
            self.pool.release(handle);
            return HitOutcome::Absorbed;
        }
        self.stats.hits += 1;
        self.abilities.on_damage();
        HitOutcome::Hit
    }

    pub fn complete_boss_section(&mut self) {
        self.difficulty.complete_boss_section();
    }

    pub fn trigger_safe_zone(&mut self, seconds: f32) {
        self.difficulty.trigger_safe_zone(seconds);
    }

    /// Everything the renderer needs this frame
    pub fn active_entities(&self) -> Vec<EntityView> {
        self.pool.views()
    }

    /// Unthrottled telemetry
    pub fn telemetry(&self) -> TelemetrySnapshot {
        TelemetrySnapshot::build(
            self.clock,
            self.difficulty.state(),
            self.safety.danger_zones(),
            self.abilities.statuses(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::PowerUpKind;
    use crate::sim::patterns::SpawnDescriptor;

    #[test]
    fn test_new_run_lays_segments() {
        let state = RunnerState::new(1, Settings::default());
        assert_eq!(state.pool.active_count(EntityKind::Segment), 10);
        assert!(
            state
                .active_entities()
                .iter()
                .all(|v| matches!(v.payload, Payload::Segment { .. }))
        );
    }

    #[test]
    fn test_collect_releases_coin() {
        let mut state = RunnerState::new(1, Settings::default());
        let handle = state
            .pool
            .realize(&SpawnDescriptor::coin(1, 10.0, 1.0, 2), 0.0, 0)
            .unwrap();
        let pickup = state.collect(handle).unwrap();
        assert_eq!(pickup.payload, Payload::Coin { value: 2 });
        assert!(state.collect(handle).is_none());
        assert_eq!(state.stats.coins, 1);
    }

    #[test]
    fn test_power_up_activates_its_ability() {
        let mut state = RunnerState::new(1, Settings::default());
        let shield = state
            .pool
            .realize(&SpawnDescriptor::power_up(1, 10.0, PowerUpKind::Shield), 0.0, 0)
            .unwrap();
        let pickup = state.collect(shield).unwrap();
        assert_eq!(pickup.triggered.len(), 1);
        assert_eq!(pickup.triggered[0].0, AbilityId::Shield);
        assert!(state.abilities.snapshot(false).is_shielded);

        let lightning = state
            .pool
            .realize(&SpawnDescriptor::power_up(0, 12.0, PowerUpKind::Lightning), 0.0, 0)
            .unwrap();
        let pickup = state.collect(lightning).unwrap();
        assert_eq!(pickup.triggered[0].0, AbilityId::Dash);
        assert!(state.abilities.snapshot(false).is_invincible);

        // Score pickups leave the abilities alone
        let magnet = state
            .pool
            .realize(&SpawnDescriptor::power_up(2, 14.0, PowerUpKind::Magnet), 0.0, 0)
            .unwrap();
        assert!(state.collect(magnet).unwrap().triggered.is_empty());
        assert_eq!(state.stats.coins, 0);
    }

    #[test]
    fn test_hit_outcomes() {
        let mut state = RunnerState::new(1, Settings::default());
        let ctx = AbilityContext::default();
        let fake = EntityHandle {
            kind: EntityKind::Obstacle,
            slot: crate::sim::pool::SlotHandle {
                index: 0,
                generation: 0,
            },
        };
        assert_eq!(state.on_obstacle_hit(fake), HitOutcome::Hit);

        state.abilities.activate(AbilityId::Shield, &ctx).unwrap();
        assert_eq!(state.on_obstacle_hit(fake), HitOutcome::Absorbed);
        assert_eq!(state.on_obstacle_hit(fake), HitOutcome::Hit);

        state.abilities.activate(AbilityId::Dash, &ctx).unwrap();
        assert_eq!(state.on_obstacle_hit(fake), HitOutcome::Ignored);
        assert_eq!(state.stats.hits, 2);
        assert_eq!(state.stats.absorbed, 1);
    }

    #[test]
    fn test_reset_rebuilds_everything() {
        let mut state = RunnerState::new(9, Settings::default());
        state.abilities.activate(AbilityId::Shield, &AbilityContext::default()).unwrap();
        state.clock = 42.0;
        state.trigger_safe_zone(5.0);
        state.reset();
        assert_eq!(state.clock, 0.0);
        assert!(!state.difficulty.state().safe_zone_active);
        assert!(state.abilities.statuses().iter().all(|s| s.uses == 0));
        let fresh = RunnerState::new(9, Settings::default());
        assert_eq!(state.active_entities(), fresh.active_entities());
    }
}
