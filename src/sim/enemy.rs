//! Pursuing enemy
//!
//! Pathfinding belongs to the navigation world; the enemy only asks it to head
//! for the player's last known position. Touching the player kills it (see
//! `collision`), grabbing an enemy pickup sends the enemy back to its respawn
//! point.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::state::EntityId;
use crate::consts::ENEMY_RESPAWN;

/// Move destinations closer than this to the previous one are not re-sent
const RETARGET_DISTANCE: f32 = 0.05;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: EntityId,
    pub position: Vec3,
    pub respawn: Vec3,
    /// Last destination handed to navigation
    pub destination: Option<Vec3>,
    /// Cleared when the enemy is destroyed (player won)
    pub active: bool,
}

impl Enemy {
    pub fn new(id: EntityId, position: Vec3) -> Self {
        Self {
            id,
            position,
            respawn: Vec3::from(ENEMY_RESPAWN),
            destination: None,
            active: true,
        }
    }

    /// New navigation target toward the player, if one should be sent
    pub fn pursue(&mut self, player: Option<Vec3>) -> Option<Vec3> {
        if !self.active {
            return None;
        }
        let target = player?;
        let changed = self
            .destination
            .is_none_or(|d| d.distance(target) > RETARGET_DISTANCE);
        if changed {
            self.destination = Some(target);
            Some(target)
        } else {
            None
        }
    }

    /// Jump back to the respawn point
    pub fn reset(&mut self) -> Vec3 {
        self.position = self.respawn;
        self.destination = None;
        self.respawn
    }
}
