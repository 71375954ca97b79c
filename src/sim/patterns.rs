//! Spawn pattern archetypes
//!
//! A pattern is a pure function of the difficulty snapshot and the RNG: it
//! returns descriptors and never touches the pool. Offsets are measured
//! ahead of the player, so descriptors stay valid until the pool realizes
//! them against the current player z.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::difficulty::DifficultyState;
use super::entity::{EntityKind, ObstacleKind, Payload, PowerUpKind};
use crate::consts::{LANE_COUNT, SPAWN_DISTANCE};

/// The three independently scheduled spawn streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnClass {
    Obstacle,
    Coin,
    PowerUp,
}

impl SpawnClass {
    pub const ALL: [SpawnClass; 3] = [SpawnClass::Obstacle, SpawnClass::Coin, SpawnClass::PowerUp];

    pub fn as_str(&self) -> &'static str {
        match self {
            SpawnClass::Obstacle => "obstacle",
            SpawnClass::Coin => "coin",
            SpawnClass::PowerUp => "power-up",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternArchetype {
    Single,
    Double,
    /// Diagonal walk across the lanes
    Alternating,
    /// Walls in every lane but one
    Tunnel,
    /// Phase-shifted moving barriers down the center
    Wave,
    /// Coins guarded by obstacles
    RiskReward,
    CoinLine,
    CoinZigzag,
    /// Coins along a jump arc
    CoinArc,
    PowerUp,
}

/// Sub-shapes of the risk/reward archetype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskRewardShape {
    Gauntlet,
    Squeeze,
    Weave,
    JumpChallenge,
    SlideChallenge,
}

impl RiskRewardShape {
    pub const ALL: [RiskRewardShape; 5] = [
        RiskRewardShape::Gauntlet,
        RiskRewardShape::Squeeze,
        RiskRewardShape::Weave,
        RiskRewardShape::JumpChallenge,
        RiskRewardShape::SlideChallenge,
    ];
}

/// One entity to be realized by the pool
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnDescriptor {
    pub kind: EntityKind,
    pub lane: u8,
    /// Distance ahead of the player
    pub offset: f32,
    /// Resting height
    pub height: f32,
    pub payload: Payload,
}

impl SpawnDescriptor {
    pub fn obstacle(lane: u8, offset: f32, kind: ObstacleKind, phase: f32) -> Self {
        Self {
            kind: EntityKind::Obstacle,
            lane,
            offset,
            height: kind.base_y(),
            payload: Payload::Obstacle { kind, phase },
        }
    }

    pub fn coin(lane: u8, offset: f32, height: f32, value: u32) -> Self {
        Self {
            kind: EntityKind::Coin,
            lane,
            offset,
            height,
            payload: Payload::Coin { value },
        }
    }

    pub fn power_up(lane: u8, offset: f32, kind: PowerUpKind) -> Self {
        Self {
            kind: EntityKind::PowerUp,
            lane,
            offset,
            height: 1.0,
            payload: Payload::PowerUp { kind },
        }
    }
}

/// Archetypes available for a stream at this intensity, with weights.
/// Each band is a superset of the band below it.
pub fn available_archetypes(class: SpawnClass, intensity: f32) -> Vec<(PatternArchetype, u32)> {
    use PatternArchetype::*;
    match class {
        SpawnClass::Obstacle => {
            if intensity < 0.3 {
                vec![(Single, 1), (Double, 1)]
            } else if intensity < 0.6 {
                vec![(Single, 1), (Double, 1), (Alternating, 1), (Tunnel, 1)]
            } else {
                vec![
                    (Single, 1),
                    (Double, 1),
                    (Alternating, 1),
                    (Tunnel, 1),
                    (Wave, 1),
                    (RiskReward, 1),
                ]
            }
        }
        SpawnClass::Coin => {
            if intensity < 0.4 {
                vec![(CoinLine, 3), (CoinZigzag, 2)]
            } else if intensity < 0.7 {
                vec![(CoinLine, 1), (CoinZigzag, 1), (CoinArc, 1), (RiskReward, 1)]
            } else {
                vec![(CoinLine, 1), (CoinZigzag, 1), (CoinArc, 3), (RiskReward, 3)]
            }
        }
        SpawnClass::PowerUp => vec![(PowerUp, 1)],
    }
}

/// Cumulative-weight pick; `None` only for an empty or zero-weight table
pub fn weighted_pick<T: Copy, R: Rng + ?Sized>(items: &[(T, u32)], rng: &mut R) -> Option<T> {
    let total: u32 = items.iter().map(|(_, w)| *w).sum();
    if total == 0 {
        return None;
    }
    let mut roll = rng.random_range(0..total);
    for (item, weight) in items {
        if roll < *weight {
            return Some(*item);
        }
        roll -= weight;
    }
    None
}

pub fn select_pattern<R: Rng + ?Sized>(
    class: SpawnClass,
    intensity: f32,
    rng: &mut R,
) -> PatternArchetype {
    weighted_pick(&available_archetypes(class, intensity), rng).unwrap_or(match class {
        SpawnClass::Obstacle => PatternArchetype::Single,
        SpawnClass::Coin => PatternArchetype::CoinLine,
        SpawnClass::PowerUp => PatternArchetype::PowerUp,
    })
}

fn random_lane<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    rng.random_range(0..LANE_COUNT as u8)
}

fn random_obstacle<R: Rng + ?Sized>(difficulty: &DifficultyState, rng: &mut R) -> ObstacleKind {
    let kinds = difficulty.obstacle_tier.kinds();
    kinds[rng.random_range(0..kinds.len())]
}

/// Expand an archetype into descriptors
pub fn generate<R: Rng + ?Sized>(
    archetype: PatternArchetype,
    difficulty: &DifficultyState,
    rng: &mut R,
) -> Vec<SpawnDescriptor> {
    let i = difficulty.intensity.clamp(0.0, 1.0);
    let base = SPAWN_DISTANCE;

    match archetype {
        PatternArchetype::Single => {
            vec![SpawnDescriptor::obstacle(
                random_lane(rng),
                base,
                random_obstacle(difficulty, rng),
                0.0,
            )]
        }
        PatternArchetype::Double => {
            let first = random_lane(rng);
            let second = (first + rng.random_range(1..LANE_COUNT as u8)) % LANE_COUNT as u8;
            vec![
                SpawnDescriptor::obstacle(first, base, random_obstacle(difficulty, rng), 0.0),
                SpawnDescriptor::obstacle(second, base + 3.0, random_obstacle(difficulty, rng), 0.0),
            ]
        }
        PatternArchetype::Alternating => {
            let start = random_lane(rng);
            let count = (3.0 + i * 3.0).floor() as usize;
            (0..count)
                .map(|n| {
                    let lane = ((start as usize + n) % LANE_COUNT) as u8;
                    SpawnDescriptor::obstacle(lane, base + n as f32 * 8.0, ObstacleKind::Box, 0.0)
                })
                .collect()
        }
        PatternArchetype::Tunnel => {
            let safe_lane = random_lane(rng);
            let mut out = Vec::with_capacity(6);
            for row in 0..3 {
                for lane in (0..LANE_COUNT as u8).filter(|&l| l != safe_lane) {
                    out.push(SpawnDescriptor::obstacle(
                        lane,
                        base + row as f32 * 10.0,
                        ObstacleKind::Wall,
                        0.0,
                    ));
                }
            }
            out
        }
        PatternArchetype::Wave => {
            let count = (4.0 + i * 2.0).floor() as usize;
            (0..count)
                .map(|n| {
                    SpawnDescriptor::obstacle(
                        1,
                        base + n as f32 * 15.0,
                        ObstacleKind::MovingBarrier,
                        n as f32 * std::f32::consts::FRAC_PI_2,
                    )
                })
                .collect()
        }
        PatternArchetype::RiskReward => {
            let shape = RiskRewardShape::ALL[rng.random_range(0..RiskRewardShape::ALL.len())];
            risk_reward(shape, random_lane(rng))
        }
        PatternArchetype::CoinLine | PatternArchetype::CoinZigzag | PatternArchetype::CoinArc => {
            let count = ((3.0 * (0.8 + i * 0.6)).floor() as usize).max(1);
            let value = 1 + (i * 2.0).floor() as u32;
            let lane = random_lane(rng);
            (0..count)
                .map(|n| {
                    let offset = base + n as f32 * 2.0;
                    match archetype {
                        PatternArchetype::CoinZigzag => SpawnDescriptor::coin(
                            ((lane as usize + n) % LANE_COUNT) as u8,
                            offset,
                            1.0,
                            value,
                        ),
                        PatternArchetype::CoinArc => {
                            let t = (n as f32 + 0.5) / count as f32;
                            let height = 1.0 + (t * std::f32::consts::PI).sin() * 2.5;
                            SpawnDescriptor::coin(lane, offset, height, value)
                        }
                        _ => SpawnDescriptor::coin(lane, offset, 1.0, value),
                    }
                })
                .collect()
        }
        PatternArchetype::PowerUp => {
            let roll = rng.random_range(0..100);
            vec![SpawnDescriptor::power_up(
                random_lane(rng),
                base,
                PowerUpKind::from_roll(roll),
            )]
        }
    }
}

/// Coins behind obstacles. The guarded lane can always be entered.
pub fn risk_reward(shape: RiskRewardShape, lane: u8) -> Vec<SpawnDescriptor> {
    let base = SPAWN_DISTANCE;
    let lane = lane.min(LANE_COUNT as u8 - 1);
    let coin = |lane: u8, d: f32, value: u32| SpawnDescriptor::coin(lane, base + d, 1.0, value);
    let obstacle = |lane: u8, d: f32, kind: ObstacleKind| SpawnDescriptor::obstacle(lane, base + d, kind, 0.0);

    match shape {
        RiskRewardShape::Gauntlet => vec![
            coin(lane, 5.0, 3),
            coin(lane, 8.0, 3),
            coin(lane, 11.0, 3),
            obstacle(lane, 2.0, ObstacleKind::Spike),
            obstacle(lane, 14.0, ObstacleKind::Spike),
        ],
        RiskRewardShape::Squeeze => vec![
            coin(1, 5.0, 5),
            coin(1, 8.0, 5),
            obstacle(0, 6.0, ObstacleKind::Wall),
            obstacle(2, 7.0, ObstacleKind::Wall),
        ],
        RiskRewardShape::Weave => vec![
            coin(0, 3.0, 2),
            coin(1, 6.0, 2),
            coin(2, 9.0, 2),
            coin(1, 12.0, 2),
            coin(0, 15.0, 2),
            obstacle(1, 4.0, ObstacleKind::Box),
            obstacle(0, 7.0, ObstacleKind::Box),
            obstacle(2, 10.0, ObstacleKind::Box),
            obstacle(1, 13.0, ObstacleKind::Box),
        ],
        RiskRewardShape::JumpChallenge => vec![
            SpawnDescriptor::coin(lane, base + 5.0, 2.5, 3),
            SpawnDescriptor::coin(lane, base + 8.0, 2.5, 3),
            SpawnDescriptor::coin(lane, base + 11.0, 2.5, 3),
            obstacle(lane, 3.0, ObstacleKind::Spike),
        ],
        RiskRewardShape::SlideChallenge => vec![
            SpawnDescriptor::coin(lane, base + 5.0, 0.3, 3),
            SpawnDescriptor::coin(lane, base + 7.0, 0.3, 3),
            SpawnDescriptor::coin(lane, base + 9.0, 0.3, 3),
            obstacle(lane, 6.0, ObstacleKind::Barrier),
            obstacle(lane, 10.0, ObstacleKind::Barrier),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::difficulty::ObstacleTier;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn difficulty(intensity: f32) -> DifficultyState {
        DifficultyState {
            intensity,
            obstacle_tier: ObstacleTier::Late,
            ..Default::default()
        }
    }

    #[test]
    fn test_tunnel_always_leaves_a_lane() {
        let mut rng = Pcg32::seed_from_u64(42);
        for _ in 0..200 {
            let out = generate(PatternArchetype::Tunnel, &difficulty(0.5), &mut rng);
            assert_eq!(out.len(), 6);
            let blocked: Vec<u8> = out.iter().map(|d| d.lane).collect();
            let clear = (0..LANE_COUNT as u8).filter(|l| !blocked.contains(l)).count();
            assert_eq!(clear, 1);
        }
    }

    #[test]
    fn test_available_set_widens_with_intensity() {
        for class in SpawnClass::ALL {
            let mut prev: Vec<PatternArchetype> = Vec::new();
            for step in 0..=20 {
                let set: Vec<PatternArchetype> = available_archetypes(class, step as f32 / 20.0)
                    .into_iter()
                    .map(|(a, _)| a)
                    .collect();
                assert!(prev.iter().all(|a| set.contains(a)), "{class:?} shrank at step {step}");
                prev = set;
            }
        }
    }

    #[test]
    fn test_low_intensity_only_simple_obstacles() {
        let mut rng = Pcg32::seed_from_u64(1);
        for _ in 0..100 {
            let a = select_pattern(SpawnClass::Obstacle, 0.1, &mut rng);
            assert!(matches!(a, PatternArchetype::Single | PatternArchetype::Double));
        }
    }

    #[test]
    fn test_double_uses_distinct_lanes() {
        let mut rng = Pcg32::seed_from_u64(9);
        for _ in 0..100 {
            let out = generate(PatternArchetype::Double, &difficulty(0.2), &mut rng);
            assert_ne!(out[0].lane, out[1].lane);
            assert_eq!(out[1].offset - out[0].offset, 3.0);
        }
    }

    #[test]
    fn test_wave_scales_with_intensity() {
        let mut rng = Pcg32::seed_from_u64(3);
        assert_eq!(generate(PatternArchetype::Wave, &difficulty(0.0), &mut rng).len(), 4);
        assert_eq!(generate(PatternArchetype::Wave, &difficulty(1.0), &mut rng).len(), 6);
    }

    #[test]
    fn test_generation_is_seed_deterministic() {
        let mut a = Pcg32::seed_from_u64(77);
        let mut b = Pcg32::seed_from_u64(77);
        for archetype in [
            PatternArchetype::Single,
            PatternArchetype::RiskReward,
            PatternArchetype::CoinArc,
            PatternArchetype::PowerUp,
        ] {
            assert_eq!(
                generate(archetype, &difficulty(0.8), &mut a),
                generate(archetype, &difficulty(0.8), &mut b)
            );
        }
    }
}
