//! Seeded level construction
//!
//! Builds the default arena: a ring of counting pickups, a couple of speed
//! pickups, one spinning hazard, one enemy with its reset pickup. The body
//! list is what the physics world needs to create colliders.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::Tag;
use super::hazard::{HazardId, PartDescriptor};
use super::state::{EntityId, GameState, PickupKind, SpeedBoost};
use crate::settings::Settings;

/// Ring radius for counting pickups
const PICKUP_RING_RADIUS: f32 = 8.0;
/// Height pickups float at
const PICKUP_HEIGHT: f32 = 0.5;
const PICKUP_RADIUS: f32 = 0.5;
const HAZARD_CENTER: Vec3 = Vec3::new(0.0, 0.5, 14.0);
const HAZARD_ARM_LENGTH: f32 = 3.0;
const ENEMY_START: Vec3 = Vec3::new(12.0, 0.5, -12.0);
/// Half extent of the square ground plane
pub const GROUND_HALF_EXTENT: f32 = 20.0;

/// Collider the physics world should create
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodySpec {
    pub id: EntityId,
    pub tag: Tag,
    pub position: Vec3,
    pub radius: f32,
    /// Overlap-only volume (no physical response)
    pub trigger: bool,
}

/// A built level: simulation state plus the bodies to spawn
#[derive(Debug, Clone)]
pub struct Level {
    pub state: GameState,
    pub ground: EntityId,
    pub hazard: HazardId,
    pub bodies: Vec<BodySpec>,
}

/// Build the default arena for a seed
pub fn build_level(settings: Settings, seed: u64) -> Level {
    let mut rng = Pcg32::seed_from_u64(seed);
    let mut state = GameState::new(settings, seed);
    let mut bodies = Vec::new();

    bodies.push(BodySpec {
        id: state.player.id,
        tag: Tag::Player,
        position: Vec3::new(0.0, 0.5, 0.0),
        radius: 0.5,
        trigger: false,
    });

    let ground = state.next_entity_id();
    bodies.push(BodySpec {
        id: ground,
        tag: Tag::Ground,
        position: Vec3::ZERO,
        radius: GROUND_HALF_EXTENT,
        trigger: false,
    });

    // Exactly enough counting pickups to win
    let count = state.player.state.win_threshold();
    let step = std::f32::consts::TAU / count as f32;
    for i in 0..count {
        let theta = i as f32 * step + rng.random_range(-0.2..0.2) * step;
        let r = PICKUP_RING_RADIUS + rng.random_range(-1.5..1.5);
        let position = Vec3::new(r * theta.cos(), PICKUP_HEIGHT, r * theta.sin());
        let id = state.spawn_pickup(PickupKind::Count, position);
        bodies.push(pickup_body(id, Tag::Pickup, position));
    }

    let tuning = state.settings.speed_boost.clone();
    let boosts = [
        SpeedBoost::additive(tuning.add, Some(tuning.duration)).with_sound("speed_up"),
        SpeedBoost::multiplier(tuning.multiplier, Some(tuning.duration)).with_sound("speed_up"),
    ];
    for boost in boosts {
        let angle = rng.random_range(0.0..std::f32::consts::TAU);
        let position = Vec3::new(4.0 * angle.cos(), PICKUP_HEIGHT, 4.0 * angle.sin());
        let id = state.spawn_pickup(PickupKind::Speed(boost), position);
        bodies.push(pickup_body(id, Tag::SpeedPickup, position));
    }

    let reset_at = Vec3::new(
        rng.random_range(-15.0..15.0),
        PICKUP_HEIGHT,
        rng.random_range(-15.0..-5.0),
    );
    let reset = state.spawn_pickup(PickupKind::EnemyReset, reset_at);
    bodies.push(pickup_body(reset, Tag::EnemyPickup, reset_at));

    // Hub plus four capsule arms; only the capsules are lethal
    let mut children = vec![PartDescriptor::named(state.next_entity_id(), "Hub")];
    for arm in 0..4 {
        children.push(PartDescriptor::named(
            state.next_entity_id(),
            format!("Capsule_{arm}"),
        ));
    }
    let hazard = state.spawn_hazard(&children);
    for (i, child) in children.iter().enumerate().skip(1) {
        let angle = (i - 1) as f32 * std::f32::consts::FRAC_PI_2;
        let offset = Vec3::new(angle.cos(), 0.0, angle.sin()) * HAZARD_ARM_LENGTH;
        bodies.push(BodySpec {
            id: child.id,
            tag: Tag::HazardPart,
            position: HAZARD_CENTER + offset,
            radius: 0.5,
            trigger: false,
        });
    }

    let enemy = state.spawn_enemy(ENEMY_START);
    bodies.push(BodySpec {
        id: enemy,
        tag: Tag::Enemy,
        position: ENEMY_START,
        radius: 0.5,
        trigger: false,
    });

    state.normalize_order();
    log::info!(
        "Level {}: {} pickups to win, {} bodies",
        seed,
        count,
        bodies.len()
    );

    Level {
        state,
        ground,
        hazard,
        bodies,
    }
}

fn pickup_body(id: EntityId, tag: Tag, position: Vec3) -> BodySpec {
    BodySpec {
        id,
        tag,
        position,
        radius: PICKUP_RADIUS,
        trigger: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_is_winnable() {
        let level = build_level(Settings::default(), 42);
        assert_eq!(level.state.remaining_pickups(), 16);
        assert_eq!(level.state.enemies.len(), 1);
        assert_eq!(level.state.hazards[0].parts().len(), 4);
    }

    #[test]
    fn test_every_body_has_a_role() {
        let level = build_level(Settings::default(), 42);
        for body in &level.bodies {
            if body.id == level.ground {
                assert!(level.state.role_of(body.id).is_none());
            } else {
                assert!(level.state.role_of(body.id).is_some(), "{:?}", body);
            }
        }
    }

    #[test]
    fn test_same_seed_same_layout() {
        let a = build_level(Settings::default(), 7);
        let b = build_level(Settings::default(), 7);
        let c = build_level(Settings::default(), 8);
        let pos = |l: &Level| l.bodies.iter().map(|b| b.position).collect::<Vec<_>>();
        assert_eq!(pos(&a), pos(&b));
        assert_ne!(pos(&a), pos(&c));
    }

    #[test]
    fn test_threshold_drives_pickup_count() {
        let mut settings = Settings::default();
        settings.player.win_threshold = 5;
        let level = build_level(settings, 1);
        assert_eq!(level.state.remaining_pickups(), 5);
    }
}
