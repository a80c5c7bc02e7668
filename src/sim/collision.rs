//! Contact and trigger routing
//!
//! The physics world reports contacts as `(receiver, phase, other, tag)`.
//! `classify` maps every combination to exactly one `Transition`; `route_batch`
//! applies them synchronously, so a death is visible to every later event of
//! the same physics step.
//!
//! Lethal transitions are applied before anything else in a batch. A hazard
//! hit and a winning pickup reported in the same step therefore always end
//! in death, whatever order the physics engine delivered them in.

use serde::{Deserialize, Serialize};

use super::hazard::Strike;
use super::modifier::Stat;
use super::state::{
    BodyCommand, DeathCause, EntityId, GameEvent, GameState, PickupKind, Role,
};
use crate::error::RouteError;

/// Closed set of collider tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    Player,
    Ground,
    Pickup,
    SpeedPickup,
    HazardPart,
    Enemy,
    EnemyPickup,
    Untagged,
}

impl Tag {
    pub const ALL: [Tag; 8] = [
        Tag::Player,
        Tag::Ground,
        Tag::Pickup,
        Tag::SpeedPickup,
        Tag::HazardPart,
        Tag::Enemy,
        Tag::EnemyPickup,
        Tag::Untagged,
    ];

    /// Parse a tag name from level data; unknown names are `Untagged`
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "player" => Tag::Player,
            "ground" => Tag::Ground,
            "pickup" => Tag::Pickup,
            "speedpickup" => Tag::SpeedPickup,
            "hazardpart" | "capsule" => Tag::HazardPart,
            "enemy" => Tag::Enemy,
            "enemypickup" => Tag::EnemyPickup,
            _ => Tag::Untagged,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactPhase {
    /// Solid contact started
    Begin,
    /// Solid contact ended
    End,
    /// Overlap with a trigger volume started
    TriggerEnter,
}

impl ContactPhase {
    pub const ALL: [ContactPhase; 3] = [
        ContactPhase::Begin,
        ContactPhase::End,
        ContactPhase::TriggerEnter,
    ];

    fn is_touch(self) -> bool {
        matches!(self, ContactPhase::Begin | ContactPhase::TriggerEnter)
    }
}

/// One callback from the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactEvent {
    /// Body whose callback fired
    pub receiver: EntityId,
    pub phase: ContactPhase,
    /// The body it touched
    pub other: EntityId,
    /// Tag of `other`
    pub tag: Tag,
}

impl ContactEvent {
    pub fn begin(receiver: EntityId, tag: Tag, other: EntityId) -> Self {
        Self {
            receiver,
            phase: ContactPhase::Begin,
            other,
            tag,
        }
    }

    pub fn end(receiver: EntityId, tag: Tag, other: EntityId) -> Self {
        Self {
            receiver,
            phase: ContactPhase::End,
            other,
            tag,
        }
    }

    pub fn trigger(receiver: EntityId, tag: Tag, other: EntityId) -> Self {
        Self {
            receiver,
            phase: ContactPhase::TriggerEnter,
            other,
            tag,
        }
    }
}

/// Kind of body that received a contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Receiver {
    Player,
    Pickup,
    HazardPart,
    Enemy,
}

impl Receiver {
    pub const ALL: [Receiver; 4] = [
        Receiver::Player,
        Receiver::Pickup,
        Receiver::HazardPart,
        Receiver::Enemy,
    ];
}

impl From<Role> for Receiver {
    fn from(role: Role) -> Self {
        match role {
            Role::Player => Receiver::Player,
            Role::Pickup(_) => Receiver::Pickup,
            Role::HazardPart(_) => Receiver::HazardPart,
            Role::Enemy(_) => Receiver::Enemy,
        }
    }
}

/// What a contact does to the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    GroundEnter,
    GroundExit,
    /// Player touched a counting pickup
    CollectPickup,
    /// Player touched a speed pickup
    CollectSpeedPickup,
    /// Pickup's own trigger saw the player; resolved by the pickup's kind
    PickupTouched,
    /// Player touched a hazard part
    HazardContact,
    /// A hazard part's trigger saw the player
    HazardStrike,
    /// Player and enemy touched (reported by either side)
    EnemyContact,
    EnemyTakesPickup,
    Ignore,
}

impl Transition {
    pub fn is_lethal(self) -> bool {
        matches!(
            self,
            Transition::HazardContact | Transition::HazardStrike | Transition::EnemyContact
        )
    }
}

/// Transition table
pub fn classify(receiver: Receiver, phase: ContactPhase, tag: Tag) -> Transition {
    use ContactPhase::*;
    match (receiver, phase, tag) {
        (Receiver::Player, Begin, Tag::Ground) => Transition::GroundEnter,
        (Receiver::Player, End, Tag::Ground) => Transition::GroundExit,
        (Receiver::Player, TriggerEnter, Tag::Pickup) => Transition::CollectPickup,
        (Receiver::Player, TriggerEnter, Tag::SpeedPickup) => Transition::CollectSpeedPickup,
        (Receiver::Player, p, Tag::HazardPart) if p.is_touch() => Transition::HazardContact,
        (Receiver::Player, p, Tag::Enemy) if p.is_touch() => Transition::EnemyContact,
        (Receiver::Pickup, TriggerEnter, Tag::Player) => Transition::PickupTouched,
        (Receiver::HazardPart, p, Tag::Player) if p.is_touch() => Transition::HazardStrike,
        (Receiver::Enemy, p, Tag::Player) if p.is_touch() => Transition::EnemyContact,
        (Receiver::Enemy, TriggerEnter, Tag::EnemyPickup) => Transition::EnemyTakesPickup,
        _ => Transition::Ignore,
    }
}

/// Route a single contact
pub fn route_contact(state: &mut GameState, event: ContactEvent) {
    route_batch(state, &[event]);
}

/// Route every contact of one physics step, lethal ones first
pub fn route_batch(state: &mut GameState, events: &[ContactEvent]) {
    let mut plan: Vec<(Transition, &ContactEvent)> = Vec::with_capacity(events.len());
    for event in events {
        match state.role_of(event.receiver) {
            Some(role) => {
                let transition = classify(role.into(), event.phase, event.tag);
                if transition != Transition::Ignore {
                    plan.push((transition, event));
                }
            }
            None => log::warn!(
                "Skipping contact {:?}: {}",
                event,
                RouteError::UnknownEntity(event.receiver)
            ),
        }
    }

    // Stable: lethal first, otherwise delivery order
    plan.sort_by_key(|(t, _)| !t.is_lethal());

    for (transition, event) in plan {
        if let Err(err) = apply(state, transition, event) {
            log::warn!("Skipping {:?} for {:?}: {}", transition, event, err);
        }
    }
}

fn apply(state: &mut GameState, transition: Transition, event: &ContactEvent) -> Result<(), RouteError> {
    if !state.player.state.in_play() {
        log::debug!("Ignoring {:?}, player out of play", transition);
        return Ok(());
    }

    match transition {
        Transition::GroundEnter => state.player.locomotion.land(),
        Transition::GroundExit => state.player.locomotion.leave_ground(),
        Transition::CollectPickup => collect_pickup(state, event.other)?,
        Transition::CollectSpeedPickup => collect_speed_pickup(state, event.other)?,
        Transition::PickupTouched => {
            require_player(state, event.other)?;
            let kind = pickup_kind(state, event.receiver)?;
            match kind {
                PickupKind::Count => collect_pickup(state, event.receiver)?,
                PickupKind::Speed(_) => collect_speed_pickup(state, event.receiver)?,
                PickupKind::EnemyReset => {}
            }
        }
        Transition::HazardContact => {
            let strike = hazard_strike(state, event.other)?;
            if let Some(strike) = strike {
                kill_player(state, DeathCause::Hazard(strike.hazard));
            }
        }
        Transition::HazardStrike => {
            require_player(state, event.other)?;
            let strike = hazard_strike(state, event.receiver)?;
            if let Some(strike) = strike {
                kill_player(state, DeathCause::Hazard(strike.hazard));
            }
        }
        Transition::EnemyContact => {
            let enemy = if event.receiver == state.player.id {
                event.other
            } else {
                require_player(state, event.other)?;
                event.receiver
            };
            let Some(Role::Enemy(i)) = state.role_of(enemy) else {
                return Err(RouteError::UnknownEnemy(enemy));
            };
            if state.enemies[i].active {
                kill_player(state, DeathCause::Enemy(enemy));
            }
        }
        Transition::EnemyTakesPickup => enemy_takes_pickup(state, event.receiver, event.other)?,
        Transition::Ignore => {}
    }
    Ok(())
}

fn require_player(state: &GameState, id: EntityId) -> Result<(), RouteError> {
    if id == state.player.id {
        Ok(())
    } else {
        Err(RouteError::UnknownEntity(id))
    }
}

fn pickup_index(state: &GameState, id: EntityId) -> Result<usize, RouteError> {
    match state.role_of(id) {
        Some(Role::Pickup(i)) => Ok(i),
        Some(_) => Err(RouteError::NotAPickup(id)),
        None => Err(RouteError::UnknownEntity(id)),
    }
}

fn pickup_kind(state: &GameState, id: EntityId) -> Result<PickupKind, RouteError> {
    let i = pickup_index(state, id)?;
    Ok(state.pickups[i].kind.clone())
}

/// Ask the owning hazard whether this part contact is a strike on the player
fn hazard_strike(state: &GameState, part: EntityId) -> Result<Option<Strike>, RouteError> {
    match state.role_of(part) {
        Some(Role::HazardPart(i)) => state.hazards[i].report_contact(part, Tag::Player),
        _ => Err(RouteError::UnknownHazardPart(part)),
    }
}

fn deactivate_pickup(state: &mut GameState, i: usize) {
    let pickup = &mut state.pickups[i];
    pickup.active = false;
    state.events.push(GameEvent::PickupDeactivated(pickup.id));
}

fn collect_pickup(state: &mut GameState, id: EntityId) -> Result<(), RouteError> {
    let i = pickup_index(state, id)?;
    let pickup = &state.pickups[i];
    if pickup.kind != PickupKind::Count {
        return Err(RouteError::NotAPickup(id));
    }
    if !pickup.active {
        log::debug!("Pickup {:?} already collected", id);
        return Ok(());
    }

    let Some(collected) = state.player.state.collect() else {
        return Ok(());
    };
    deactivate_pickup(state, i);
    state.events.push(GameEvent::CountChanged(collected.count));

    // Same transition as the count, never a later tick
    if collected.won {
        win(state);
    }
    Ok(())
}

fn collect_speed_pickup(state: &mut GameState, id: EntityId) -> Result<(), RouteError> {
    let i = pickup_index(state, id)?;
    let pickup = &state.pickups[i];
    let PickupKind::Speed(boost) = &pickup.kind else {
        return Err(RouteError::MissingBoost(id));
    };
    if !pickup.active {
        log::debug!("Speed pickup {:?} already collected", id);
        return Ok(());
    }
    let boost = boost.clone();
    let position = pickup.position;

    let stats = &mut state.player.stats;
    stats.apply(Stat::Speed, boost.kind, boost.magnitude, boost.duration_mode());
    let speed = stats.current_value(Stat::Speed);
    if boost.permanent {
        log::info!("Speed permanently increased to: {}", speed);
    } else {
        log::info!("Speed boosted to: {} for {} seconds", speed, boost.duration);
    }
    state.events.push(GameEvent::SpeedChanged(speed));

    if let Some(clip) = boost.sound {
        state.events.push(GameEvent::PlaySound { clip, position });
    }
    deactivate_pickup(state, i);
    state.commands.push(BodyCommand::Destroy { body: id });
    Ok(())
}

fn enemy_takes_pickup(state: &mut GameState, enemy: EntityId, pickup: EntityId) -> Result<(), RouteError> {
    let Some(Role::Enemy(e)) = state.role_of(enemy) else {
        return Err(RouteError::UnknownEnemy(enemy));
    };
    let p = pickup_index(state, pickup)?;
    if !state.pickups[p].active || !state.enemies[e].active {
        return Ok(());
    }

    deactivate_pickup(state, p);
    let position = state.enemies[e].reset();
    state.commands.push(BodyCommand::Teleport {
        body: enemy,
        position,
    });
    log::debug!("Enemy {:?} took pickup {:?}, back to {}", enemy, pickup, position);
    Ok(())
}

/// Dead transition: terminal, stops the body and tells the UI
fn kill_player(state: &mut GameState, cause: DeathCause) {
    if !state.player.state.kill(cause) {
        return;
    }
    log::info!("Player killed by {:?}", cause);

    let player = &mut state.player;
    let dropped = player.stats.discard_pending();
    if dropped > 0 {
        log::debug!("Dropped {} pending boosts", dropped);
    }
    player.position = None;
    state.commands.push(BodyCommand::Disable { body: player.id });
    state.events.push(GameEvent::ShowLose);
}

/// Won transition: terminal, removes the enemies
fn win(state: &mut GameState) {
    log::info!(
        "Player won with {} pickups",
        state.player.state.pickup_count()
    );
    state.events.push(GameEvent::ShowWin);
    for enemy in state.enemies.iter_mut().filter(|e| e.active) {
        enemy.active = false;
        state.commands.push(BodyCommand::Destroy { body: enemy.id });
    }
}
