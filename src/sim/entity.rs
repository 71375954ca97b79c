//! Pooled entity types
//!
//! Entities are never created or destroyed during play. Each one lives in a
//! fixed slot of its kind's pool and is reinitialized in place.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::ability::AbilityId;

/// Which pool an entity belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Obstacle,
    Coin,
    PowerUp,
    Segment,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Obstacle,
        EntityKind::Coin,
        EntityKind::PowerUp,
        EntityKind::Segment,
    ];

    /// Dense index for per-kind tables
    #[inline]
    pub fn index(self) -> usize {
        match self {
            EntityKind::Obstacle => 0,
            EntityKind::Coin => 1,
            EntityKind::PowerUp => 2,
            EntityKind::Segment => 3,
        }
    }
}

/// Obstacle subtypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ObstacleKind {
    #[default]
    Box,
    Spike,
    Barrier,
    Wall,
    Drone,
    LaserGrid,
    MovingBarrier,
    RotatingLaser,
    EnergyBarrier,
    DroneTurret,
    PlasmaGate,
    TallWall,
    BarHigh,
    BarLow,
    Scooter,
    Dumpster,
    RoadDivider,
}

impl ObstacleKind {
    /// Obstacles whose hitbox sweeps sideways over time
    pub fn is_moving(self) -> bool {
        matches!(self, ObstacleKind::MovingBarrier | ObstacleKind::RotatingLaser)
    }

    /// How far the hitbox can reach sideways from its anchor
    pub fn sweep_amplitude(self) -> f32 {
        match self {
            ObstacleKind::MovingBarrier => 1.5,
            ObstacleKind::RotatingLaser => 1.0,
            _ => 0.0,
        }
    }

    /// Collision height used by the host's hitbox checks
    pub fn height(self) -> f32 {
        match self {
            ObstacleKind::Box => 1.5,
            ObstacleKind::Spike => 1.2,
            ObstacleKind::Barrier | ObstacleKind::Wall => 1.8,
            ObstacleKind::EnergyBarrier => 1.35,
            ObstacleKind::DroneTurret => 1.4,
            ObstacleKind::PlasmaGate => 1.25,
            ObstacleKind::MovingBarrier => 2.0,
            ObstacleKind::RotatingLaser => 3.0,
            ObstacleKind::TallWall => 3.5,
            _ => 1.5,
        }
    }

    /// Can the player slide underneath
    pub fn can_slide_under(self) -> bool {
        matches!(
            self,
            ObstacleKind::Barrier
                | ObstacleKind::Wall
                | ObstacleKind::EnergyBarrier
                | ObstacleKind::DroneTurret
                | ObstacleKind::PlasmaGate
                | ObstacleKind::BarHigh
                | ObstacleKind::BarLow
        )
    }

    /// Can the player jump over
    pub fn can_jump_over(self) -> bool {
        !matches!(
            self,
            ObstacleKind::TallWall | ObstacleKind::BarHigh | ObstacleKind::Wall
        )
    }

    /// Resting height of the obstacle's anchor above the ground
    pub fn base_y(self) -> f32 {
        match self {
            ObstacleKind::Box => 0.75,
            ObstacleKind::Spike => 0.6,
            ObstacleKind::Barrier => 1.8,
            ObstacleKind::Drone => 1.5,
            _ => 0.0,
        }
    }
}

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PowerUpKind {
    #[default]
    Shield,
    Multiplier,
    Magnet,
    Health,
    TimeSlow,
    Lightning,
}

impl PowerUpKind {
    /// Roll weights (percent)
    pub const WEIGHTS: [(PowerUpKind, u32); 6] = [
        (PowerUpKind::Shield, 15),
        (PowerUpKind::Multiplier, 10),
        (PowerUpKind::Magnet, 10),
        (PowerUpKind::Health, 10),
        (PowerUpKind::TimeSlow, 25),
        (PowerUpKind::Lightning, 30),
    ];

    /// Map a roll in [0, 100) onto the weight table
    pub fn from_roll(roll: u32) -> Self {
        let mut acc = 0;
        for (kind, weight) in Self::WEIGHTS {
            acc += weight;
            if roll < acc {
                return kind;
            }
        }
        PowerUpKind::Lightning
    }

    /// Ability this pickup fires. Score and health pickups belong to the host.
    pub fn ability(self) -> Option<AbilityId> {
        match self {
            PowerUpKind::Shield => Some(AbilityId::Shield),
            PowerUpKind::TimeSlow => Some(AbilityId::TimeSlow),
            PowerUpKind::Lightning => Some(AbilityId::Dash),
            PowerUpKind::Multiplier | PowerUpKind::Magnet | PowerUpKind::Health => None,
        }
    }
}

/// Kind-specific data carried by a slot
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Payload {
    #[default]
    Empty,
    Obstacle {
        kind: ObstacleKind,
        /// Motion phase offset (moving barriers)
        phase: f32,
    },
    Coin {
        value: u32,
    },
    PowerUp {
        kind: PowerUpKind,
    },
    Segment {
        /// Procedural height of the roadside geometry
        height: f32,
        /// Material/visual variant index
        variant: u8,
    },
}

impl Payload {
    pub fn obstacle_kind(&self) -> Option<ObstacleKind> {
        match self {
            Payload::Obstacle { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// One pooled slot's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PooledEntity {
    pub kind: EntityKind,
    pub active: bool,
    /// Anchor position (lane center, resting height, longitudinal z)
    pub anchor: Vec3,
    /// Current position after motion is applied
    pub position: Vec3,
    pub payload: Payload,
    /// Seed for visual variety, re-rolled on every reuse
    pub variant_seed: u32,
    /// Animation clock (seconds since realized)
    pub anim_time: f32,
}

impl PooledEntity {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            active: false,
            anchor: Vec3::ZERO,
            position: Vec3::ZERO,
            payload: Payload::Empty,
            variant_seed: 0,
            anim_time: 0.0,
        }
    }

    /// Clear everything mutable except the kind tag
    pub fn reset(&mut self) {
        *self = Self::new(self.kind);
    }

    /// Place at an anchor and snap the live position to it
    pub fn place(&mut self, anchor: Vec3) {
        self.anchor = anchor;
        self.position = anchor;
    }

    /// Advance animation and derive the live position from the anchor
    pub fn animate(&mut self, dt: f32) {
        self.anim_time += dt;
        let t = self.anim_time;
        self.position = self.anchor;
        match self.payload {
            Payload::Obstacle { kind, phase } => match kind {
                ObstacleKind::MovingBarrier => {
                    self.position.x += ((t + phase) * 2.0).sin() * kind.sweep_amplitude();
                }
                ObstacleKind::Drone => {
                    self.position.y += (t * 2.0 + phase).sin() * 0.3;
                }
                _ => {}
            },
            Payload::Coin { .. } => {
                self.position.y += (t * 3.0).sin() * 0.2;
            }
            _ => {}
        }
    }
}

/// Read-only view handed to rendering/collision collaborators
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    pub handle: super::pool::EntityHandle,
    pub kind: EntityKind,
    pub position: Vec3,
    pub payload: Payload,
    pub variant_seed: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_powerup_roll_covers_table() {
        assert_eq!(PowerUpKind::from_roll(0), PowerUpKind::Shield);
        assert_eq!(PowerUpKind::from_roll(14), PowerUpKind::Shield);
        assert_eq!(PowerUpKind::from_roll(15), PowerUpKind::Multiplier);
        assert_eq!(PowerUpKind::from_roll(45), PowerUpKind::TimeSlow);
        assert_eq!(PowerUpKind::from_roll(69), PowerUpKind::TimeSlow);
        assert_eq!(PowerUpKind::from_roll(70), PowerUpKind::Lightning);
        assert_eq!(PowerUpKind::from_roll(99), PowerUpKind::Lightning);
        let total: u32 = PowerUpKind::WEIGHTS.iter().map(|(_, w)| w).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn test_moving_barrier_sweeps_around_anchor() {
        let mut e = PooledEntity::new(EntityKind::Obstacle);
        e.payload = Payload::Obstacle {
            kind: ObstacleKind::MovingBarrier,
            phase: 0.0,
        };
        e.place(Vec3::new(0.0, 0.0, -50.0));
        for _ in 0..200 {
            e.animate(1.0 / 60.0);
            assert!(e.position.x.abs() <= 1.5 + 1e-4);
            assert_eq!(e.position.z, -50.0);
        }
    }

    #[test]
    fn test_reset_keeps_kind() {
        let mut e = PooledEntity::new(EntityKind::Coin);
        e.active = true;
        e.payload = Payload::Coin { value: 3 };
        e.reset();
        assert_eq!(e.kind, EntityKind::Coin);
        assert!(!e.active);
        assert_eq!(e.payload, Payload::Empty);
    }
}
