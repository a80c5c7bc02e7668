//! Roll Arena headless runner
//!
//! Builds a seeded level and plays it with an autopilot against a toy
//! physics world, logging everything the simulation emits. Useful for
//! tuning files and for eyeballing the state machine without a renderer.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use glam::{Vec2, Vec3};

use roll_arena::Settings;
use roll_arena::consts::*;
use roll_arena::sim::level::GROUND_HALF_EXTENT;
use roll_arena::sim::{
    BodyCommand, BodySpec, ContactEvent, EntityId, GameEvent, GameState, PickupKind, Tag,
    TickInput, build_level, fixed_update, update,
};

#[derive(Debug, Parser)]
#[command(name = "roll-arena", about = "Play a seeded Roll Arena level headless")]
struct Args {
    /// Settings JSON file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Level seed
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Give up after this many simulated seconds
    #[arg(long, default_value_t = 120.0)]
    seconds: f32,
}

/// Render frame rate the runner pretends to have
const FRAME_DT: f32 = 1.0 / 60.0;
const GRAVITY: f32 = -9.81;
/// Linear drag per second for rolling bodies
const DRAG: f32 = 0.8;
const ENEMY_SPEED: f32 = 2.5;
/// Seconds between autopilot jumps
const JUMP_EVERY: f32 = 3.0;

/// Minimal stand-in for the physics engine
struct Body {
    tag: Tag,
    position: Vec3,
    velocity: Vec3,
    radius: f32,
    trigger: bool,
    enabled: bool,
    destination: Option<Vec3>,
}

struct HeadlessWorld {
    bodies: BTreeMap<EntityId, Body>,
    ground: EntityId,
    /// Pairs currently overlapping, (receiver, other)
    touching: BTreeSet<(EntityId, EntityId)>,
}

impl HeadlessWorld {
    fn new(specs: &[BodySpec], ground: EntityId) -> Self {
        let bodies = specs
            .iter()
            .filter(|s| s.id != ground)
            .map(|s| {
                (
                    s.id,
                    Body {
                        tag: s.tag,
                        position: s.position,
                        velocity: Vec3::ZERO,
                        radius: s.radius,
                        trigger: s.trigger,
                        enabled: true,
                        destination: None,
                    },
                )
            })
            .collect();
        Self {
            bodies,
            ground,
            touching: BTreeSet::new(),
        }
    }

    fn apply(&mut self, command: BodyCommand) {
        match command {
            BodyCommand::Force { body, force } => {
                if let Some(b) = self.bodies.get_mut(&body) {
                    b.velocity += force * SIM_DT;
                }
            }
            BodyCommand::Impulse { body, impulse } => {
                if let Some(b) = self.bodies.get_mut(&body) {
                    b.velocity += impulse;
                }
            }
            BodyCommand::Disable { body } => {
                if let Some(b) = self.bodies.get_mut(&body) {
                    b.enabled = false;
                }
            }
            BodyCommand::Destroy { body } => {
                self.bodies.remove(&body);
            }
            BodyCommand::Teleport { body, position } => {
                if let Some(b) = self.bodies.get_mut(&body) {
                    b.position = position;
                    b.velocity = Vec3::ZERO;
                }
            }
            BodyCommand::SetDestination { body, target } => {
                if let Some(b) = self.bodies.get_mut(&body) {
                    b.destination = Some(target);
                }
            }
        }
    }

    /// Integrate one step and report contact changes
    fn step(&mut self, dt: f32) -> Vec<ContactEvent> {
        for body in self.bodies.values_mut().filter(|b| b.enabled && !b.trigger) {
            match body.tag {
                Tag::Player => {
                    body.velocity.y += GRAVITY * dt;
                    body.velocity *= 1.0 - DRAG * dt;
                    body.position += body.velocity * dt;
                    if body.position.y < body.radius {
                        body.position.y = body.radius;
                        body.velocity.y = body.velocity.y.max(0.0);
                    }
                }
                Tag::Enemy => {
                    if let Some(target) = body.destination {
                        let to = Vec3::new(target.x - body.position.x, 0.0, target.z - body.position.z);
                        body.position += to.clamp_length_max(ENEMY_SPEED * dt);
                    }
                }
                _ => {}
            }
        }

        let mut now = BTreeSet::new();
        let movers: Vec<_> = self
            .bodies
            .iter()
            .filter(|(_, b)| b.enabled && matches!(b.tag, Tag::Player | Tag::Enemy))
            .map(|(id, b)| (*id, b.tag, b.position, b.radius))
            .collect();

        for &(id, tag, position, radius) in &movers {
            let on_ground = tag == Tag::Player
                && position.y <= radius + 0.01
                && position.x.abs() <= GROUND_HALF_EXTENT
                && position.z.abs() <= GROUND_HALF_EXTENT;
            if on_ground {
                now.insert((id, self.ground));
            }
            for (other_id, other) in &self.bodies {
                if *other_id == id || !other.enabled {
                    continue;
                }
                if position.distance(other.position) < radius + other.radius {
                    now.insert((id, *other_id));
                }
            }
        }

        let mut events = Vec::new();
        for &(receiver, other) in now.difference(&self.touching) {
            let (tag, trigger) = self.describe(other);
            events.push(if trigger {
                ContactEvent::trigger(receiver, tag, other)
            } else {
                ContactEvent::begin(receiver, tag, other)
            });
        }
        for &(receiver, other) in self.touching.difference(&now) {
            let (tag, trigger) = self.describe(other);
            if !trigger {
                events.push(ContactEvent::end(receiver, tag, other));
            }
        }
        self.touching = now;
        events
    }

    fn describe(&self, id: EntityId) -> (Tag, bool) {
        if id == self.ground {
            return (Tag::Ground, false);
        }
        self.bodies
            .get(&id)
            .map(|b| (b.tag, b.trigger))
            .unwrap_or((Tag::Untagged, false))
    }

    fn position(&self, id: EntityId) -> Option<Vec3> {
        self.bodies.get(&id).filter(|b| b.enabled).map(|b| b.position)
    }
}

/// Steer toward the nearest pickup that still counts
fn autopilot(state: &GameState, elapsed: f32) -> TickInput {
    let Some(player) = state.player.position else {
        return TickInput::default();
    };
    let target = state
        .pickups
        .iter()
        .filter(|p| p.active && p.kind == PickupKind::Count)
        .min_by(|a, b| {
            a.position
                .distance_squared(player)
                .total_cmp(&b.position.distance_squared(player))
        });

    let basis = state.camera.move_basis();
    let movement = target
        .map(|p| {
            let dir = roll_arena::flatten_horizontal(p.position - player);
            Vec2::new(dir.dot(basis.right), dir.dot(basis.forward))
        })
        .unwrap_or(Vec2::ZERO);

    TickInput {
        movement,
        look: Vec2::new(0.25, 0.0),
        jump: (elapsed % JUMP_EVERY) < FRAME_DT,
    }
}

/// Stand-in for the HUD and audio: log what the simulation surfaced
fn log_events(state: &mut GameState) {
    for event in state.drain_events() {
        match event {
            GameEvent::CountChanged(n) => log::info!("Count: {}", n),
            GameEvent::ShowWin => log::info!("You Win!"),
            GameEvent::ShowLose => log::info!("You Lose!"),
            other => log::debug!("{:?}", other),
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };

    let level = build_level(settings, args.seed);
    let mut world = HeadlessWorld::new(&level.bodies, level.ground);
    let mut state = level.state;
    let player = state.player.id;
    if let Some(p) = world.position(player) {
        state.sync_body(player, p);
    }

    log::info!("Roll Arena (headless) seed {}", args.seed);

    let mut accumulator = 0.0;
    let mut elapsed = 0.0;
    let mut contacts: Vec<ContactEvent> = Vec::new();

    while elapsed < args.seconds && state.player.state.outcome().is_none() {
        let mut input = autopilot(&state, elapsed);
        update(&mut state, &input, FRAME_DT);
        accumulator += FRAME_DT;
        elapsed += FRAME_DT;

        let mut substeps = 0;
        while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            fixed_update(&mut state, &input, &contacts);
            for command in state.drain_commands() {
                world.apply(command);
            }
            contacts = world.step(SIM_DT);

            let ids: Vec<EntityId> = world.bodies.keys().copied().collect();
            for id in ids {
                if let Some(p) = world.position(id) {
                    state.sync_body(id, p);
                }
            }

            accumulator -= SIM_DT;
            substeps += 1;
            // Clear one-shot inputs after processing
            input.jump = false;
        }

        log_events(&mut state);
    }

    // Contacts from the last physics step
    fixed_update(&mut state, &TickInput::default(), &contacts);
    log_events(&mut state);

    match state.player.state.outcome() {
        Some(outcome) => log::info!("Run over after {:.1}s: {:?}", elapsed, outcome),
        None => log::info!(
            "Stopped after {:.1}s with {} of {} pickups",
            elapsed,
            state.player.state.pickup_count(),
            state.player.state.win_threshold()
        ),
    }
    Ok(())
}
