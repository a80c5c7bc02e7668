//! Roll Arena - player interaction core for a rolling-ball arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (stat modifiers, locomotion, contact routing, hazards)
//! - `settings`: Data-driven tuning loaded from JSON
//! - `error`: Error types for contact routing and configuration

pub mod error;
pub mod settings;
pub mod sim;

pub use error::{ConfigError, RouteError};
pub use settings::Settings;

use glam::Vec3;

/// Game configuration constants
pub mod consts {
    /// Fixed physics timestep (50 Hz)
    pub const SIM_DT: f32 = 1.0 / 50.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Player defaults
    pub const PLAYER_BASE_SPEED: f32 = 10.0;
    pub const PLAYER_JUMP_FORCE: f32 = 12.0;
    /// Pickups needed to win
    pub const WIN_THRESHOLD: u32 = 16;

    /// Orbit camera defaults
    pub const CAMERA_DISTANCE: f32 = 10.0;
    pub const CAMERA_HEIGHT: f32 = 5.0;
    pub const MOUSE_SENSITIVITY: f32 = 2.0;
    /// Pitch limits in degrees
    pub const CAMERA_PITCH_MIN: f32 = -45.0;
    pub const CAMERA_PITCH_MAX: f32 = 60.0;

    /// Hazard defaults
    pub const HAZARD_SPIN_SPEED: f32 = 100.0; // degrees/sec
    pub const HAZARD_FLASH_INTERVAL: f32 = 0.3; // seconds per color toggle

    /// Speed pickup defaults
    pub const SPEED_BOOST_ADD: f32 = 5.0;
    pub const SPEED_BOOST_MULTIPLIER: f32 = 1.5;
    pub const SPEED_BOOST_DURATION: f32 = 10.0;

    /// Where an enemy is sent after grabbing an enemy pickup
    pub const ENEMY_RESPAWN: [f32; 3] = [0.0, 0.5, 0.0];
}

/// Remove the vertical component and renormalize.
///
/// Returns zero for vectors that are vertical or degenerate, so callers get
/// "no horizontal movement" instead of NaNs.
#[inline]
pub fn flatten_horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z).normalize_or_zero()
}

/// Wrap an angle in degrees to [-180, 180)
#[inline]
pub fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = (angle + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 180.0 { wrapped - 360.0 } else { wrapped }
}
