//! Fixed timestep simulation tick
//!
//! Advances every subsystem in a fixed order so a seed plus an input stream
//! always reproduces the same run:
//! 1. ability requests, countdowns and the modifier snapshot
//! 2. jump safety, on a clock scaled by the snapshot's time dilation
//! 3. difficulty and spawn scheduling, on dilated time
//! 4. entity motion, release and segment recycling
//!
//! Collision stays with the host, which reads the returned snapshot.

use glam::Vec3;
use rand::Rng;

use super::ability::{
    AbilityContext, AbilityEffect, AbilityEvent, AbilityId, ModifierSnapshot, Target,
};
use super::difficulty::DifficultyEvent;
use super::entity::{EntityKind, EntityView};
use super::patterns::SpawnDescriptor;
use super::pool::EntityHandle;
use super::safety::{DangerZone, LandingPrediction, SpawnVerdict, UnsafeReason};
use super::state::{RunnerState, regenerate_segment};
use super::telemetry::TelemetrySnapshot;
use crate::consts::MAX_TICK_DT;
use crate::error::SimError;
use crate::lane_x;

/// Jump takeoff reported by the host's physics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpTakeoff {
    /// Initial vertical velocity
    pub v0: f32,
    /// Forward speed while airborne
    pub horizontal_speed: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AbilityRequest {
    Activate(AbilityId),
    /// Activation by external name ("dash", "time-slow", ...)
    ActivateNamed(String),
    CycleTarget(AbilityId, i32),
    ConfirmTarget(AbilityId),
    CancelTarget(AbilityId),
    Upgrade(AbilityId),
}

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    pub player_pos: Vec3,
    pub is_jumping: bool,
    pub is_sliding: bool,
    /// Lane the host considers current; `player_pos` stays authoritative
    pub lane: u8,
    /// Set on the tick the player leaves the ground
    pub jump: Option<JumpTakeoff>,
    /// Distance run so far
    pub distance: f32,
    pub combo_multiplier: f32,
    pub ability_requests: Vec<AbilityRequest>,
}

/// Everything that happened during a tick, in order
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    AbilityActivated { ability: AbilityId, effect: AbilityEffect },
    AbilityUpgraded(AbilityId),
    TargetSelected { ability: AbilityId, target: Target },
    TargetingCancelled(AbilityId),
    /// Request that could not be honored; the run continues
    Rejected(SimError),
    Ability(AbilityEvent),
    JumpPredicted(LandingPrediction),
    Landed,
    /// Watchdog dropped a prediction that never landed
    PredictionDiscarded(SimError),
    NearMiss(DangerZone),
    Difficulty(DifficultyEvent),
    Spawned(EntityHandle),
    SpawnVetoed { lane: u8, reason: UnsafeReason },
    SpawnDropped(SimError),
    SegmentsRecycled(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickOutput {
    /// Modifiers for motion and collision
    pub modifiers: ModifierSnapshot,
    /// Landing-grace time left (already folded into `modifiers`)
    pub invincibility_window: f32,
    /// Position an ability is pulling the player to
    pub forced_position: Option<Vec3>,
    pub entities: Vec<EntityView>,
    pub events: Vec<SimEvent>,
    /// Present only when the throttle interval elapsed
    pub telemetry: Option<TelemetrySnapshot>,
}

/// What became of one spawn descriptor
#[derive(Debug, Clone, PartialEq)]
pub enum SpawnOutcome {
    Spawned(EntityHandle),
    Vetoed(UnsafeReason),
    Dropped(SimError),
}

/// Check one descriptor against the landing zone and realize it
pub fn admit(state: &mut RunnerState, desc: &SpawnDescriptor, player_z: f32) -> SpawnOutcome {
    if let Some(kind) = desc.payload.obstacle_kind() {
        let pos = Vec3::new(lane_x(desc.lane), desc.height, player_z - desc.offset);
        if let SpawnVerdict::Unsafe(reason) = state.safety.is_safe_to_spawn(pos, kind) {
            state.stats.vetoed += 1;
            log::debug!("Vetoed {:?} in lane {}: {:?}", kind, desc.lane, reason);
            return SpawnOutcome::Vetoed(reason);
        }
    }

    let variant_seed = state.rng.random();
    match state.pool.realize(desc, player_z, variant_seed) {
        Ok(handle) => {
            state.stats.spawned += 1;
            SpawnOutcome::Spawned(handle)
        }
        Err(e) => {
            state.stats.dropped += 1;
            log::debug!("{}", e);
            SpawnOutcome::Dropped(e)
        }
    }
}

fn handle_request(
    state: &mut RunnerState,
    request: &AbilityRequest,
    ctx: &AbilityContext,
    events: &mut Vec<SimEvent>,
) {
    let abilities = &mut state.abilities;
    let result = match request {
        AbilityRequest::Activate(id) => abilities
            .activate(*id, ctx)
            .map(|effect| SimEvent::AbilityActivated { ability: *id, effect }),
        AbilityRequest::ActivateNamed(name) => name.parse::<AbilityId>().and_then(|id| {
            abilities
                .activate(id, ctx)
                .map(|effect| SimEvent::AbilityActivated { ability: id, effect })
        }),
        AbilityRequest::CycleTarget(id, direction) => abilities
            .cycle_target(*id, *direction)
            .map(|target| SimEvent::TargetSelected { ability: *id, target }),
        AbilityRequest::ConfirmTarget(id) => abilities
            .confirm_target(*id, ctx)
            .map(|effect| SimEvent::AbilityActivated { ability: *id, effect }),
        AbilityRequest::CancelTarget(id) => abilities
            .cancel_target(*id)
            .map(|()| SimEvent::TargetingCancelled(*id)),
        AbilityRequest::Upgrade(id) => {
            if abilities.upgrade(*id) {
                log::info!("{} upgraded", id);
                Ok(SimEvent::AbilityUpgraded(*id))
            } else {
                return;
            }
        }
    };

    match result {
        Ok(event) => events.push(event),
        Err(e) => {
            log::debug!("Ability request rejected: {}", e);
            events.push(SimEvent::Rejected(e));
        }
    }
}

/// Advance the run by one timestep
pub fn tick(state: &mut RunnerState, input: &TickInput, dt: f32) -> TickOutput {
    let dt = if dt.is_finite() {
        dt.clamp(0.0, MAX_TICK_DT)
    } else {
        0.0
    };
    state.clock += dt;
    state.time_ticks += 1;
    state.player_pos = input.player_pos;
    let player_z = input.player_pos.z;
    let mut events = Vec::new();

    // 1. Abilities run on real time
    let targets = state.grapple_targets();
    let obstacles = state.obstacle_positions();
    let ctx = AbilityContext {
        player_pos: input.player_pos,
        targets: &targets,
        obstacles: &obstacles,
    };
    for request in &input.ability_requests {
        handle_request(state, request, &ctx, &mut events);
    }
    events.extend(state.abilities.update(dt, &ctx).into_iter().map(SimEvent::Ability));
    let time_scale = state.abilities.snapshot(false).time_dilation_factor;

    // 2. Jump safety
    if let Some(jump) = input.jump {
        let prediction = state
            .safety
            .on_jump(input.player_pos, jump.v0, jump.horizontal_speed);
        events.push(SimEvent::JumpPredicted(prediction));
    } else if state.was_jumping && !input.is_jumping && state.safety.on_landing() {
        events.push(SimEvent::Landed);
    }
    if let Err(e) = state.safety.update(dt, time_scale, input.is_jumping) {
        log::warn!("{}", e);
        events.push(SimEvent::PredictionDiscarded(e));
    }
    if let Some(zone) = state
        .safety
        .check_near_miss(input.is_jumping || input.is_sliding, obstacles.iter().copied())
    {
        events.push(SimEvent::NearMiss(zone));
    }
    state.was_jumping = input.is_jumping;

    // 3. Difficulty and spawning on dilated time
    let world_dt = dt * time_scale;
    for event in state
        .difficulty
        .update(world_dt, input.distance, input.combo_multiplier)
    {
        match event {
            DifficultyEvent::TierChanged(tier) => log::info!("Intensity now {}", tier.label()),
            DifficultyEvent::BossWarning => log::info!("Boss section ahead"),
            _ => {}
        }
        events.push(SimEvent::Difficulty(event));
    }

    let requests = state
        .scheduler
        .tick(world_dt, state.difficulty.state(), &mut state.rng);
    for request in &requests {
        for desc in &request.descriptors {
            events.push(match admit(state, desc, player_z) {
                SpawnOutcome::Spawned(handle) => SimEvent::Spawned(handle),
                SpawnOutcome::Vetoed(reason) => SimEvent::SpawnVetoed {
                    lane: desc.lane,
                    reason,
                },
                SpawnOutcome::Dropped(e) => SimEvent::SpawnDropped(e),
            });
        }
    }

    // 4. Motion and recycling
    state.pool.animate(world_dt);
    let pools = &state.settings.pools;
    state.pool.release_behind(player_z, pools.release_distance);
    let recycled = state.pool.recycle_behind(
        EntityKind::Segment,
        player_z,
        pools.segment_span(),
        &mut state.rng,
        regenerate_segment,
    );
    if recycled > 0 {
        events.push(SimEvent::SegmentsRecycled(recycled));
    }

    let telemetry = state.throttle.due(dt).then(|| state.telemetry());

    TickOutput {
        modifiers: state.abilities.snapshot(state.safety.is_invincible()),
        invincibility_window: state.safety.invincibility_remaining(),
        forced_position: state.abilities.forced_position(),
        entities: state.active_entities(),
        events,
        telemetry,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActivationError;
    use crate::settings::Settings;
    use crate::sim::entity::ObstacleKind;

    const DT: f32 = 1.0 / 60.0;

    /// Player running straight down the center lane
    fn running(frame: u32) -> TickInput {
        let z = -(frame as f32) * 15.0 * DT;
        TickInput {
            player_pos: Vec3::new(0.0, 0.0, z),
            lane: 1,
            distance: -z,
            combo_multiplier: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_same_seed_same_run() {
        let mut a = RunnerState::new(1234, Settings::default());
        let mut b = RunnerState::new(1234, Settings::default());
        for frame in 0..1200 {
            let input = running(frame);
            let out_a = tick(&mut a, &input, DT);
            let out_b = tick(&mut b, &input, DT);
            assert_eq!(out_a, out_b, "diverged at frame {frame}");
        }
        assert!(a.stats.spawned > 0);
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = RunnerState::new(1, Settings::default());
        let mut b = RunnerState::new(2, Settings::default());
        for frame in 0..600 {
            tick(&mut a, &running(frame), DT);
            tick(&mut b, &running(frame), DT);
        }
        assert_ne!(a.active_entities(), b.active_entities());
    }

    #[test]
    fn test_dt_is_clamped() {
        let mut state = RunnerState::new(1, Settings::default());
        tick(&mut state, &running(0), 10.0);
        assert!((state.clock - MAX_TICK_DT).abs() < 1e-6);
        tick(&mut state, &running(0), f32::NAN);
        assert!((state.clock - MAX_TICK_DT).abs() < 1e-6);
    }

    #[test]
    fn test_time_slow_dilates_world_clock() {
        let mut state = RunnerState::new(1, Settings::default());
        let mut input = running(0);
        input.ability_requests = vec![AbilityRequest::ActivateNamed("time-slow".into())];
        let out = tick(&mut state, &input, 0.05);
        assert!((out.modifiers.time_dilation_factor - 0.4).abs() < 1e-6);
        assert!((state.difficulty.state().wave_time - 0.02).abs() < 1e-6);
        // Ability timers themselves run on real time
        let status = state
            .abilities
            .statuses()
            .into_iter()
            .find(|s| s.id == AbilityId::TimeSlow)
            .unwrap();
        assert!((status.remaining - 2.95).abs() < 1e-5);
    }

    #[test]
    fn test_rejected_requests_become_events() {
        let mut state = RunnerState::new(1, Settings::default());
        let mut input = running(0);
        input.ability_requests = vec![
            AbilityRequest::ActivateNamed("jetpack".into()),
            AbilityRequest::Activate(AbilityId::Shield),
            AbilityRequest::Activate(AbilityId::Shield),
            AbilityRequest::ConfirmTarget(AbilityId::Grapple),
        ];
        let out = tick(&mut state, &input, DT);
        let rejected: Vec<_> = out
            .events
            .iter()
            .filter_map(|e| match e {
                SimEvent::Rejected(err) => Some(err.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(rejected.len(), 3);
        assert_eq!(rejected[0], SimError::InvalidAbilityId("jetpack".into()));
        assert_eq!(
            rejected[1],
            SimError::Activation {
                ability: AbilityId::Shield,
                source: ActivationError::AlreadyActive
            }
        );
        assert!(matches!(rejected[2], SimError::InvalidStateTransition { .. }));
        assert!(out.modifiers.is_shielded);
    }

    #[test]
    fn test_exhausted_pool_drops_spawns() {
        let mut settings = Settings::default();
        settings.pools.obstacles = 0;
        let mut state = RunnerState::new(3, settings);
        let mut dropped = 0;
        for frame in 0..600 {
            let out = tick(&mut state, &running(frame), DT);
            dropped += out
                .events
                .iter()
                .filter(|e| {
                    matches!(e, SimEvent::SpawnDropped(SimError::PoolExhausted(EntityKind::Obstacle)))
                })
                .count();
        }
        assert!(dropped > 0);
        assert_eq!(state.pool.active_count(EntityKind::Obstacle), 0);
    }

    #[test]
    fn test_landing_zone_vetoes_obstacle() {
        let mut state = RunnerState::new(1, Settings::default());
        // Short hop that lands 24 units ahead in 0.4s
        state.safety.on_jump(Vec3::ZERO, 12.0, 60.0);
        let near = SpawnDescriptor::obstacle(1, 24.0, ObstacleKind::Box, 0.0);
        assert!(matches!(admit(&mut state, &near, 0.0), SpawnOutcome::Vetoed(_)));

        let other_lane = SpawnDescriptor::obstacle(0, 24.0, ObstacleKind::Box, 0.0);
        assert!(matches!(admit(&mut state, &other_lane, 0.0), SpawnOutcome::Spawned(_)));

        let coin = SpawnDescriptor::coin(1, 24.0, 1.0, 1);
        assert!(matches!(admit(&mut state, &coin, 0.0), SpawnOutcome::Spawned(_)));
        assert_eq!(state.stats.vetoed, 1);
    }

    /// Late-run player hopping down the center lane without pause
    fn hopping(frame: u32) -> TickInput {
        let mut input = running(frame);
        input.distance += 2500.0;
        input.is_jumping = true;
        if frame % 30 == 0 {
            input.jump = Some(JumpTakeoff {
                v0: 15.0,
                horizontal_speed: 15.0,
            });
        }
        input
    }

    #[test]
    fn test_scheduled_spawn_vetoed_while_hopping() {
        let mut state = RunnerState::new(77, Settings::default());
        let mut vetoed = None;
        for frame in 0..3600 {
            let out = tick(&mut state, &hopping(frame), DT);
            vetoed = out.events.iter().find_map(|e| match e {
                SimEvent::SpawnVetoed { reason, .. } => Some(*reason),
                _ => None,
            });
            if vetoed.is_some() {
                break;
            }
        }
        assert_eq!(vetoed, Some(UnsafeReason::MovingObstacleInLandingZone));
        assert!(state.stats.vetoed >= 1);

        // Same stretch on the ground: nothing to protect
        let mut grounded = RunnerState::new(77, Settings::default());
        for frame in 0..3600 {
            let mut input = running(frame);
            input.distance += 2500.0;
            tick(&mut grounded, &input, DT);
        }
        assert_eq!(grounded.stats.vetoed, 0);
        assert!(grounded.stats.spawned > 0);
    }

    #[test]
    fn test_jump_and_landing_grace() {
        let mut state = RunnerState::new(1, Settings::default());
        let mut input = running(0);
        input.is_jumping = true;
        input.jump = Some(JumpTakeoff {
            v0: 15.0,
            horizontal_speed: 15.0,
        });
        let out = tick(&mut state, &input, DT);
        assert!(out.events.iter().any(|e| matches!(e, SimEvent::JumpPredicted(_))));

        input.jump = None;
        for _ in 0..10 {
            tick(&mut state, &input, DT);
        }
        input.is_jumping = false;
        let out = tick(&mut state, &input, DT);
        assert!(out.events.contains(&SimEvent::Landed));
        assert!(out.modifiers.is_invincible);
        assert!(out.invincibility_window > 0.0);
    }

    #[test]
    fn test_stuck_jump_is_discarded() {
        let mut state = RunnerState::new(1, Settings::default());
        let mut input = running(0);
        input.is_jumping = true;
        input.jump = Some(JumpTakeoff {
            v0: 15.0,
            horizontal_speed: 15.0,
        });
        tick(&mut state, &input, DT);
        input.jump = None;

        let mut discarded = 0;
        for _ in 0..120 {
            let out = tick(&mut state, &input, DT);
            discarded += out
                .events
                .iter()
                .filter(|e| matches!(e, SimEvent::PredictionDiscarded(_)))
                .count();
        }
        assert_eq!(discarded, 1);
        assert!(state.safety.prediction().is_none());
    }

    #[test]
    fn test_segments_follow_the_player() {
        let mut state = RunnerState::new(5, Settings::default());
        let mut recycled = 0;
        for frame in 0..1800 {
            let out = tick(&mut state, &running(frame), DT);
            for e in &out.events {
                if let SimEvent::SegmentsRecycled(n) = e {
                    recycled += n;
                }
            }
        }
        let player_z = running(1799).player_pos.z;
        assert!(recycled > 0);
        assert_eq!(state.pool.active_count(EntityKind::Segment), 10);
        assert!(
            state
                .pool
                .iter_kind(EntityKind::Segment)
                .all(|(_, s)| s.anchor.z <= player_z + 50.0 + 1e-3)
        );
    }

    #[test]
    fn test_telemetry_is_throttled() {
        let mut state = RunnerState::new(1, Settings::default());
        let snapshots = (0..120)
            .filter(|&frame| tick(&mut state, &running(frame), DT).telemetry.is_some())
            .count();
        assert!((18..=22).contains(&snapshots), "got {snapshots}");
    }
}
