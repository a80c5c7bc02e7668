//! Frame update and fixed timestep physics step
//!
//! Each frame runs `update` once with the frame delta, then `fixed_update`
//! zero or more times at `SIM_DT`. Contacts reported by the physics world for
//! the step it just simulated are handed to `fixed_update`.

use glam::Vec2;

use super::collision::{ContactEvent, route_batch};
use super::modifier::Stat;
use super::state::{BodyCommand, GameEvent, GameState};

/// Input commands for a frame
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Strafe (x) and forward (y), each in [-1, 1]
    pub movement: Vec2,
    /// Look delta for the orbit camera
    pub look: Vec2,
    /// Jump pressed (one-shot)
    pub jump: bool,
}

/// Variable-rate phase: camera, boost timers, hazard cosmetics, enemy targets
pub fn update(state: &mut GameState, input: &TickInput, dt: f32) {
    let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

    state.camera.apply_look(input.look);
    state.camera.update(state.player.position);

    // Dead players have no pending boosts left to expire
    if state.player.state.is_alive() {
        for expired in state.player.stats.tick(dt) {
            let m = &expired.modifier;
            if m.stat == Stat::Speed {
                log::info!("Speed returned to: {}", expired.restored);
                state.events.push(GameEvent::SpeedChanged(expired.restored));
            }
            state.events.push(GameEvent::BoostExpired {
                handle: m.handle,
                restored: expired.restored,
            });
        }
    }

    for hazard in &mut state.hazards {
        hazard.update(dt);
    }

    let target = state.player.position;
    for enemy in &mut state.enemies {
        if let Some(target) = enemy.pursue(target) {
            state.commands.push(BodyCommand::SetDestination {
                body: enemy.id,
                target,
            });
        }
    }
}

/// Fixed-rate phase: deliver the last step's contacts, then request forces
/// for the next one.
pub fn fixed_update(state: &mut GameState, input: &TickInput, contacts: &[ContactEvent]) {
    state.time_ticks += 1;

    route_batch(state, contacts);

    if !state.player.state.in_play() {
        return;
    }

    let body = state.player.id;
    let basis = state.camera.move_basis();
    let speed = state.player.effective_speed();
    if let Some(force) = state
        .player
        .locomotion
        .drive_force(&basis, input.movement, speed)
    {
        state.commands.push(BodyCommand::Force { body, force });
    }

    if input.jump {
        let jump_force = state.player.jump_force();
        match state.player.locomotion.try_jump(jump_force) {
            Some(impulse) => state.commands.push(BodyCommand::Impulse { body, impulse }),
            None => log::debug!("Jump ignored, not grounded"),
        }
    }
}
