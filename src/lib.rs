//! Cyber Runner - gameplay simulation core for a lane-based endless runner
//!
//! Core modules:
//! - `sim`: Deterministic simulation (pooling, spawning, jump safety, abilities)
//! - `settings`: Data-driven tuning, loadable from JSON
//! - `error`: Non-fatal error taxonomy shared by every subsystem
//!
//! Rendering, input, audio and persistence live outside this crate and talk
//! to it through `sim::tick` and the snapshots it returns.

pub mod error;
pub mod settings;
pub mod sim;

pub use error::{ActivationError, SimError, TransitionReason};
pub use settings::Settings;

use glam::Vec3;

/// Game configuration constants
pub mod consts {
    /// Largest delta a single tick will integrate (seconds)
    pub const MAX_TICK_DT: f32 = 0.05;

    /// Lateral world position of each lane (left, center, right)
    pub const LANE_POSITIONS: [f32; 3] = [-3.0, 0.0, 3.0];
    pub const LANE_COUNT: usize = LANE_POSITIONS.len();
    pub const LANE_WIDTH: f32 = 3.0;

    /// Patterns are emitted this far ahead of the player
    pub const SPAWN_DISTANCE: f32 = 120.0;

    /// Player physics
    pub const GRAVITY: f32 = 60.0;
    pub const JUMP_VELOCITY: f32 = 15.0;
    /// Forward speed in units per 1/60 s frame
    pub const BASE_SPEED: f32 = 0.25;

    /// Ground segments
    pub const GROUND_SEGMENT_LENGTH: f32 = 30.0;
    pub const GROUND_RECYCLE_DISTANCE: f32 = 50.0;

    /// Entities this far behind the player go back to the pool
    pub const RELEASE_DISTANCE: f32 = 20.0;

    /// UI telemetry refresh interval (seconds)
    pub const STATE_UPDATE_INTERVAL: f32 = 0.1;
}

/// World x coordinate of a lane index (out-of-range lanes clamp to the edge)
#[inline]
pub fn lane_x(lane: u8) -> f32 {
    let idx = (lane as usize).min(consts::LANE_COUNT - 1);
    consts::LANE_POSITIONS[idx]
}

/// Nearest lane index for a world x coordinate
#[inline]
pub fn lane_for_x(x: f32) -> u8 {
    if x < -consts::LANE_WIDTH / 2.0 {
        0
    } else if x > consts::LANE_WIDTH / 2.0 {
        2
    } else {
        1
    }
}

/// Distance on the ground plane (ignores height)
#[inline]
pub fn ground_distance(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    (dx * dx + dz * dz).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_round_trip() {
        for lane in 0..consts::LANE_COUNT as u8 {
            assert_eq!(lane_for_x(lane_x(lane)), lane);
        }
        // Out of range clamps to the right edge
        assert_eq!(lane_x(7), 3.0);
    }

    #[test]
    fn test_ground_distance_ignores_height() {
        let a = Vec3::new(0.0, 10.0, 0.0);
        let b = Vec3::new(3.0, 0.0, -4.0);
        assert!((ground_distance(a, b) - 5.0).abs() < 1e-5);
    }
}
