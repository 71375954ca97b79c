//! Cyber Runner headless driver
//!
//! Runs the simulation against a scripted autopilot so balance changes can be
//! checked from the terminal: `cyber-runner --seed 7 --settings tuned.json`.

#[cfg(not(target_arch = "wasm32"))]
mod autopilot {
    use cyber_runner::consts::{BASE_SPEED, GRAVITY, JUMP_VELOCITY};
    use cyber_runner::sim::{
        AbilityId, AbilityRequest, EntityKind, EntityView, HitOutcome, JumpTakeoff, RunnerState,
        TickInput, TickOutput,
    };
    use cyber_runner::{lane_for_x, lane_x};
    use glam::Vec3;

    /// Fixed simulation step
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Obstacles closer than this get dodged
    const LOOKAHEAD: f32 = 12.0;
    const HIT_RADIUS: f32 = 1.0;
    const PICKUP_RADIUS: f32 = 1.5;

    /// Minimal stand-in for the host's player controller
    pub struct Autopilot {
        pub pos: Vec3,
        vy: f32,
        pub distance: f32,
        pub combo: f32,
        pub hits: u32,
        frame: u64,
    }

    impl Default for Autopilot {
        fn default() -> Self {
            Self {
                pos: Vec3::ZERO,
                vy: 0.0,
                distance: 0.0,
                combo: 1.0,
                hits: 0,
                frame: 0,
            }
        }
    }

    impl Autopilot {
        fn airborne(&self) -> bool {
            self.pos.y > 0.0 || self.vy > 0.0
        }

        /// Build this frame's input from what the last frame rendered
        pub fn input(&mut self, entities: &[EntityView]) -> TickInput {
            self.frame += 1;
            let lane = lane_for_x(self.pos.x);
            let mut input = TickInput {
                player_pos: self.pos,
                is_jumping: self.airborne(),
                lane,
                distance: self.distance,
                combo_multiplier: self.combo,
                ..Default::default()
            };

            let threat = entities.iter().find(|e| {
                e.kind == EntityKind::Obstacle
                    && lane_for_x(e.position.x) == lane
                    && e.position.z < self.pos.z
                    && self.pos.z - e.position.z < LOOKAHEAD
            });
            if let Some(obstacle) = threat {
                let jumpable = obstacle
                    .payload
                    .obstacle_kind()
                    .is_some_and(|k| k.can_jump_over());
                if jumpable && !self.airborne() {
                    self.vy = JUMP_VELOCITY;
                    input.is_jumping = true;
                    input.jump = Some(JumpTakeoff {
                        v0: JUMP_VELOCITY,
                        horizontal_speed: BASE_SPEED * 60.0,
                    });
                } else if !jumpable {
                    let target = if lane == 1 { 0 } else { 1 };
                    self.pos.x = lane_x(target);
                }
            }

            // Exercise the ability framework on a fixed rhythm
            match self.frame % 1200 {
                300 => input.ability_requests.push(AbilityRequest::Activate(AbilityId::Shield)),
                600 => input
                    .ability_requests
                    .push(AbilityRequest::ActivateNamed("speed-boost".to_string())),
                900 => input.ability_requests.push(AbilityRequest::Activate(AbilityId::TimeSlow)),
                _ => {}
            }
            input
        }

        /// Integrate the player and resolve contacts against the output
        pub fn apply(&mut self, state: &mut RunnerState, output: &TickOutput) {
            let speed = BASE_SPEED * 60.0 * output.modifiers.speed_multiplier;
            let step = speed * SIM_DT * output.modifiers.time_dilation_factor;
            self.pos.z -= step;
            self.distance += step;
            if let Some(forced) = output.forced_position {
                self.pos = forced;
            }

            if self.airborne() {
                self.vy -= GRAVITY * SIM_DT;
                self.pos.y = (self.pos.y + self.vy * SIM_DT).max(0.0);
                if self.pos.y == 0.0 {
                    self.vy = 0.0;
                }
            }

            for entity in &output.entities {
                let delta = entity.position - self.pos;
                if delta.x.abs() > PICKUP_RADIUS || delta.z.abs() > PICKUP_RADIUS {
                    continue;
                }
                match entity.kind {
                    EntityKind::Coin | EntityKind::PowerUp => {
                        if state.collect(entity.handle).is_some() {
                            self.combo = (self.combo + 0.1).min(5.0);
                        }
                    }
                    EntityKind::Obstacle
                        if delta.x.abs() < HIT_RADIUS && delta.z.abs() < HIT_RADIUS =>
                    {
                        let clears = entity
                            .payload
                            .obstacle_kind()
                            .is_some_and(|k| self.pos.y > k.height());
                        if clears {
                            continue;
                        }
                        if state.on_obstacle_hit(entity.handle) == HitOutcome::Hit {
                            self.hits += 1;
                            self.combo = 1.0;
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[derive(clap::Parser, Debug)]
#[command(name = "cyber-runner")]
#[command(about = "Run the simulation headless against a scripted autopilot")]
struct Args {
    /// Run seed
    #[arg(long, short, default_value_t = 42)]
    seed: u64,

    /// Settings JSON (defaults when missing or invalid)
    #[arg(long)]
    settings: Option<std::path::PathBuf>,

    /// Simulated seconds to run
    #[arg(long, default_value_t = 120.0)]
    seconds: f32,
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use autopilot::{Autopilot, SIM_DT};
    use clap::Parser;
    use cyber_runner::Settings;
    use cyber_runner::sim::{RunnerState, SimEvent, tick};

    env_logger::init();
    log::info!("Cyber Runner (headless) starting...");

    let args = Args::parse();
    let settings = match &args.settings {
        Some(path) => Settings::load_or_default(path),
        None => Settings::default(),
    };

    let mut state = RunnerState::new(args.seed, settings);
    let mut pilot = Autopilot::default();
    let mut entities = state.active_entities();
    let frames = (args.seconds.max(0.0) / SIM_DT) as u64;
    let mut snapshots = 0u32;

    for _ in 0..frames {
        let input = pilot.input(&entities);
        let output = tick(&mut state, &input, SIM_DT);

        for event in &output.events {
            match event {
                SimEvent::Rejected(e) => log::warn!("{}", e),
                SimEvent::NearMiss(zone) => log::debug!("Near miss at {:?}", zone.position),
                _ => {}
            }
        }
        if let Some(telemetry) = &output.telemetry {
            snapshots += 1;
            if snapshots % 50 == 0 {
                match serde_json::to_string(telemetry) {
                    Ok(json) => log::info!("{}", json),
                    Err(e) => log::warn!("Telemetry serialization failed: {}", e),
                }
            }
        }

        pilot.apply(&mut state, &output);
        entities = output.entities;
    }

    log::info!(
        "Run over: {:.0} units, {} hits, stats {:?}",
        pilot.distance,
        pilot.hits,
        state.stats
    );
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Hosts embed the library directly on the web
}
