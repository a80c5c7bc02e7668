//! Camera-relative rolling locomotion
//!
//! Turns the 2D move input into a force along the camera's horizontal basis
//! and gates jumping on a grounded flag that only contact events can set.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::flatten_horizontal;

/// Horizontal movement basis taken from the camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveBasis {
    pub forward: Vec3,
    pub right: Vec3,
}

impl MoveBasis {
    /// Basis with no movement at all
    pub const NONE: Self = Self {
        forward: Vec3::ZERO,
        right: Vec3::ZERO,
    };

    /// Flatten the camera axes onto the ground plane
    pub fn from_camera(forward: Vec3, right: Vec3) -> Self {
        Self {
            forward: flatten_horizontal(forward),
            right: flatten_horizontal(right),
        }
    }

    /// Direction for a move input (forward/strafe axes clamped to [-1, 1])
    pub fn direction(&self, input: Vec2) -> Vec3 {
        if !input.is_finite() {
            return Vec3::ZERO;
        }
        let input = input.clamp(Vec2::NEG_ONE, Vec2::ONE);
        self.forward * input.y + self.right * input.x
    }
}

/// Grounded tracking and force requests for the player ball
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Locomotion {
    grounded: bool,
}

impl Locomotion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// Ground contact began
    pub fn land(&mut self) {
        self.grounded = true;
    }

    /// Ground contact ended
    pub fn leave_ground(&mut self) {
        self.grounded = false;
    }

    /// Force to request this physics step, `None` when there is nothing to push
    pub fn drive_force(&self, basis: &MoveBasis, input: Vec2, speed: f32) -> Option<Vec3> {
        let force = basis.direction(input) * speed;
        (force.is_finite() && force.length_squared() > 0.0).then_some(force)
    }

    /// Upward impulse if a jump is allowed right now.
    ///
    /// Clears the grounded flag; only a later ground contact sets it again.
    pub fn try_jump(&mut self, jump_force: f32) -> Option<Vec3> {
        if !self.grounded {
            return None;
        }
        self.grounded = false;
        Some(Vec3::Y * jump_force)
    }
}
