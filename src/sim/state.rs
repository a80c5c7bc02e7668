//! Game state and core simulation types
//!
//! The physics world owns bodies; this module owns everything gameplay
//! decides about them. Requests to the physics world go out through
//! `GameState::commands`, notifications for UI/audio through
//! `GameState::events`. Neither is ever read back by the simulation.

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::camera::OrbitCamera;
use super::enemy::Enemy;
use super::hazard::{HazardController, HazardId, PartDescriptor};
use super::locomotion::Locomotion;
use super::modifier::{ModifierDuration, ModifierHandle, ModifierKind, Stat, StatModifierEngine};
use crate::settings::Settings;

/// Identifier shared with the physics world for a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Configuration carried by a speed pickup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedBoost {
    pub kind: ModifierKind,
    pub magnitude: f32,
    pub permanent: bool,
    /// Seconds, ignored when permanent
    pub duration: f32,
    /// Clip to play where the pickup was collected
    #[serde(default)]
    pub sound: Option<String>,
}

impl SpeedBoost {
    pub fn additive(magnitude: f32, duration: Option<f32>) -> Self {
        Self::new(ModifierKind::Additive, magnitude, duration)
    }

    pub fn multiplier(magnitude: f32, duration: Option<f32>) -> Self {
        Self::new(ModifierKind::Multiplicative, magnitude, duration)
    }

    /// `None` duration means permanent
    fn new(kind: ModifierKind, magnitude: f32, duration: Option<f32>) -> Self {
        Self {
            kind,
            magnitude,
            permanent: duration.is_none(),
            duration: duration.unwrap_or(0.0),
            sound: None,
        }
    }

    pub fn with_sound(mut self, clip: impl Into<String>) -> Self {
        self.sound = Some(clip.into());
        self
    }

    pub fn duration_mode(&self) -> ModifierDuration {
        if self.permanent {
            ModifierDuration::Permanent
        } else {
            ModifierDuration::Timed(self.duration)
        }
    }
}

/// Pickup types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PickupKind {
    /// +1 to the pickup count
    Count,
    /// Applies a stat modifier to the player
    Speed(SpeedBoost),
    /// Only enemies take these; sends the enemy back to its respawn point
    EnemyReset,
}

/// A pickup entity (trigger volume)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pickup {
    pub id: EntityId,
    pub kind: PickupKind,
    pub position: Vec3,
    /// Cleared once collected; inactive pickups ignore further triggers
    pub active: bool,
}

/// Why the player died
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    Hazard(HazardId),
    Enemy(EntityId),
}

/// Final result of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Won,
    Lost(DeathCause),
}

/// Where the player sits in the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerPhase {
    Grounded,
    Airborne,
    Dead,
    Won,
}

/// Result of counting one pickup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collected {
    pub count: u32,
    /// This pickup reached the win threshold
    pub won: bool,
}

/// Count, life and outcome of the player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    pickup_count: u32,
    alive: bool,
    outcome: Option<Outcome>,
    win_threshold: u32,
}

impl PlayerState {
    pub fn new(win_threshold: u32) -> Self {
        Self {
            pickup_count: 0,
            alive: true,
            outcome: None,
            win_threshold: win_threshold.max(1),
        }
    }

    pub fn pickup_count(&self) -> u32 {
        self.pickup_count
    }

    pub fn win_threshold(&self) -> u32 {
        self.win_threshold
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn has_won(&self) -> bool {
        self.outcome == Some(Outcome::Won)
    }

    pub fn has_lost(&self) -> bool {
        matches!(self.outcome, Some(Outcome::Lost(_)))
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Alive and no outcome yet: the only state that accepts transitions
    pub fn in_play(&self) -> bool {
        self.alive && self.outcome.is_none()
    }

    /// Count one pickup and check the win condition in the same step
    pub fn collect(&mut self) -> Option<Collected> {
        if !self.in_play() {
            return None;
        }
        self.pickup_count += 1;
        let won = self.pickup_count >= self.win_threshold;
        if won {
            self.outcome = Some(Outcome::Won);
        }
        Some(Collected {
            count: self.pickup_count,
            won,
        })
    }

    /// Returns false if the player was already out of play
    pub fn kill(&mut self, cause: DeathCause) -> bool {
        if !self.in_play() {
            return false;
        }
        self.alive = false;
        self.outcome = Some(Outcome::Lost(cause));
        true
    }
}

/// The player ball
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: EntityId,
    /// Last position reported by the physics world, `None` once destroyed
    pub position: Option<Vec3>,
    pub state: PlayerState,
    pub locomotion: Locomotion,
    pub stats: StatModifierEngine,
}

impl Player {
    pub fn new(id: EntityId, settings: &Settings) -> Self {
        let stats = StatModifierEngine::new(settings.revert_policy)
            .with_base(Stat::Speed, settings.player.base_speed)
            .with_base(Stat::JumpForce, settings.player.jump_force);
        Self {
            id,
            position: None,
            state: PlayerState::new(settings.player.win_threshold),
            locomotion: Locomotion::new(),
            stats,
        }
    }

    pub fn phase(&self) -> PlayerPhase {
        match self.state.outcome() {
            Some(Outcome::Won) => PlayerPhase::Won,
            Some(Outcome::Lost(_)) => PlayerPhase::Dead,
            None if self.locomotion.is_grounded() => PlayerPhase::Grounded,
            None => PlayerPhase::Airborne,
        }
    }

    pub fn effective_speed(&self) -> f32 {
        self.stats.current_value(Stat::Speed)
    }

    pub fn jump_force(&self) -> f32 {
        self.stats.current_value(Stat::JumpForce)
    }
}

/// Notifications for the UI/audio side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Update the pickup counter display
    CountChanged(u32),
    ShowWin,
    ShowLose,
    PlaySound { clip: String, position: Vec3 },
    /// Hide a collected pickup
    PickupDeactivated(EntityId),
    /// Player speed changed (boost applied or expired)
    SpeedChanged(f32),
    BoostExpired { handle: ModifierHandle, restored: f32 },
}

/// Requests for the physics/navigation world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BodyCommand {
    Force { body: EntityId, force: Vec3 },
    Impulse { body: EntityId, impulse: Vec3 },
    /// Stop simulating and colliding this body
    Disable { body: EntityId },
    Destroy { body: EntityId },
    Teleport { body: EntityId, position: Vec3 },
    /// Navigation target for an agent
    SetDestination { body: EntityId, target: Vec3 },
}

/// What an entity id refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Player,
    Pickup(usize),
    HazardPart(usize),
    Enemy(usize),
}

/// Complete game state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Level seed for reproducibility
    pub seed: u64,
    pub settings: Settings,
    /// Physics steps taken
    pub time_ticks: u64,
    pub player: Player,
    pub camera: OrbitCamera,
    /// Sorted by id
    pub pickups: Vec<Pickup>,
    /// Sorted by id
    pub hazards: Vec<HazardController>,
    /// Lethal part body -> owning hazard, built from each part's `controller`
    hazard_parts: BTreeMap<EntityId, HazardId>,
    pub enemies: Vec<Enemy>,
    /// Pending UI/audio notifications
    pub events: Vec<GameEvent>,
    /// Pending physics requests
    pub commands: Vec<BodyCommand>,
    next_id: u32,
    next_hazard_id: u32,
}

impl GameState {
    /// Empty level with only the player
    pub fn new(settings: Settings, seed: u64) -> Self {
        let mut settings = settings;
        settings.validate();

        let player = Player::new(EntityId(1), &settings);
        let camera = OrbitCamera::new(settings.camera.clone());
        let mut state = Self {
            seed,
            settings,
            time_ticks: 0,
            player,
            camera,
            pickups: Vec::new(),
            hazards: Vec::new(),
            hazard_parts: BTreeMap::new(),
            enemies: Vec::new(),
            events: Vec::new(),
            commands: Vec::new(),
            next_id: 2,
            next_hazard_id: 1,
        };

        // Counter starts visible at zero
        state.events.push(GameEvent::CountChanged(0));
        state
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn spawn_pickup(&mut self, kind: PickupKind, position: Vec3) -> EntityId {
        let id = self.next_entity_id();
        self.pickups.push(Pickup {
            id,
            kind,
            position,
            active: true,
        });
        id
    }

    /// Build a hazard from its child bodies; matching children become lethal parts
    pub fn spawn_hazard(&mut self, children: &[PartDescriptor]) -> HazardId {
        let id = HazardId(self.next_hazard_id);
        self.next_hazard_id += 1;
        let hazard = HazardController::new(id, children, &self.settings.hazard);
        log::debug!("Hazard {:?} armed with {} parts", id, hazard.parts().len());
        for part in hazard.parts() {
            self.hazard_parts.insert(part.id, part.controller);
        }
        self.hazards.push(hazard);
        id
    }

    pub fn spawn_enemy(&mut self, position: Vec3) -> EntityId {
        let id = self.next_entity_id();
        self.enemies.push(Enemy::new(id, position));
        id
    }

    /// Resolve an entity id to what it is in this level
    pub fn role_of(&self, id: EntityId) -> Option<Role> {
        if id == self.player.id {
            return Some(Role::Player);
        }
        if let Ok(i) = self.pickups.binary_search_by_key(&id, |p| p.id) {
            return Some(Role::Pickup(i));
        }
        if let Some(&hazard) = self.hazard_parts.get(&id) {
            return self
                .hazards
                .binary_search_by_key(&hazard, |h| h.id)
                .ok()
                .map(Role::HazardPart);
        }
        self.enemies
            .iter()
            .position(|e| e.id == id)
            .map(Role::Enemy)
    }

    /// Mirror a body position reported by the physics world
    pub fn sync_body(&mut self, id: EntityId, position: Vec3) {
        match self.role_of(id) {
            Some(Role::Player) if self.player.state.is_alive() => {
                self.player.position = Some(position);
            }
            Some(Role::Enemy(i)) => self.enemies[i].position = position,
            Some(Role::Pickup(i)) => self.pickups[i].position = position,
            _ => {}
        }
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn drain_commands(&mut self) -> Vec<BodyCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Active pickups that still count toward the win
    pub fn remaining_pickups(&self) -> usize {
        self.pickups
            .iter()
            .filter(|p| p.active && p.kind == PickupKind::Count)
            .count()
    }

    /// Ensure entity lists are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.pickups.sort_by_key(|p| p.id);
        self.enemies.sort_by_key(|e| e.id);
        self.hazards.sort_by_key(|h| h.id);
    }
}
