//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Caller-supplied, clamped timestep only
//! - Seeded RNG only, owned by `RunnerState`
//! - Stable iteration order (pool slot order)
//! - No rendering or platform dependencies

pub mod ability;
pub mod difficulty;
pub mod entity;
pub mod patterns;
pub mod pool;
pub mod safety;
pub mod scheduler;
pub mod state;
pub mod telemetry;
pub mod tick;

pub use ability::{AbilityId, AbilityManager, ModifierSnapshot};
pub use difficulty::{DifficultyManager, DifficultyState, IntensityTier};
pub use entity::{EntityKind, EntityView, ObstacleKind, Payload, PowerUpKind};
pub use pool::{EntityHandle, EntityPool};
pub use safety::{JumpSafety, LandingPrediction, SpawnVerdict};
pub use scheduler::SpawnScheduler;
pub use state::{HitOutcome, RunnerState};
pub use telemetry::TelemetrySnapshot;
pub use tick::{AbilityRequest, JumpTakeoff, SimEvent, TickInput, TickOutput, tick};
