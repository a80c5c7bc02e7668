//! Game settings and tuning
//!
//! Designer-set values, loaded from a JSON file. Every section is optional in
//! the file; missing fields fall back to the defaults in `consts`.

use std::path::Path;

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;
use crate::sim::modifier::RevertPolicy;

/// Player movement and win condition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Force per unit of input (before modifiers)
    pub base_speed: f32,
    /// Upward impulse when jumping
    pub jump_force: f32,
    /// Pickups needed to win
    pub win_threshold: u32,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            base_speed: PLAYER_BASE_SPEED,
            jump_force: PLAYER_JUMP_FORCE,
            win_threshold: WIN_THRESHOLD,
        }
    }
}

/// Orbit camera rig
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub distance: f32,
    pub height: f32,
    /// Degrees per unit of look input
    pub sensitivity: f32,
    /// When false, look input is ignored and the camera holds its angles
    pub mouse_look: bool,
    /// Pitch range in degrees
    pub pitch_min: f32,
    pub pitch_max: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            distance: CAMERA_DISTANCE,
            height: CAMERA_HEIGHT,
            sensitivity: MOUSE_SENSITIVITY,
            mouse_look: true,
            pitch_min: CAMERA_PITCH_MIN,
            pitch_max: CAMERA_PITCH_MAX,
        }
    }
}

/// Spinning hazard look and timing (cosmetic only)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardSettings {
    /// Degrees per second
    pub spin_speed: f32,
    pub spin_axis: Vec3,
    /// Seconds between color toggles
    pub flash_interval: f32,
    pub normal_color: Vec4,
    pub danger_color: Vec4,
    /// Children whose name contains this (case-insensitive) become lethal parts
    pub part_name: String,
    /// Match children by tag instead of by name
    pub part_tag: Option<String>,
}

impl Default for HazardSettings {
    fn default() -> Self {
        Self {
            spin_speed: HAZARD_SPIN_SPEED,
            spin_axis: Vec3::Y,
            flash_interval: HAZARD_FLASH_INTERVAL,
            normal_color: Vec4::ONE,
            danger_color: Vec4::new(1.0, 0.0, 0.0, 1.0),
            part_name: "capsule".to_string(),
            part_tag: None,
        }
    }
}

/// Defaults used when placing speed pickups in a level
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostSettings {
    pub add: f32,
    pub multiplier: f32,
    /// Seconds; ignored for permanent boosts
    pub duration: f32,
}

impl Default for BoostSettings {
    fn default() -> Self {
        Self {
            add: SPEED_BOOST_ADD,
            multiplier: SPEED_BOOST_MULTIPLIER,
            duration: SPEED_BOOST_DURATION,
        }
    }
}

/// All tuning for a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub player: PlayerSettings,
    pub camera: CameraSettings,
    pub hazard: HazardSettings,
    pub speed_boost: BoostSettings,
    /// How a timed modifier is undone when it expires
    pub revert_policy: RevertPolicy,
}

impl Settings {
    /// Parse settings from JSON and clamp anything out of range
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut settings: Settings = serde_json::from_str(json)?;
        settings.validate();
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Clamp invalid values instead of rejecting the file
    pub fn validate(&mut self) {
        if self.player.win_threshold == 0 {
            log::warn!("win_threshold must be at least 1, using 1");
            self.player.win_threshold = 1;
        }
        if !self.player.base_speed.is_finite() {
            log::warn!("base_speed is not finite, using default");
            self.player.base_speed = PLAYER_BASE_SPEED;
        }
        if !self.player.jump_force.is_finite() {
            log::warn!("jump_force is not finite, using default");
            self.player.jump_force = PLAYER_JUMP_FORCE;
        }
        if self.camera.pitch_min > self.camera.pitch_max {
            log::warn!(
                "camera pitch range [{}, {}] is inverted, swapping",
                self.camera.pitch_min,
                self.camera.pitch_max
            );
            std::mem::swap(&mut self.camera.pitch_min, &mut self.camera.pitch_max);
        }
        if !(self.hazard.flash_interval > 0.0) {
            log::warn!("flash_interval must be positive, using default");
            self.hazard.flash_interval = HAZARD_FLASH_INTERVAL;
        }
        if self.hazard.spin_axis.length_squared() < 1e-8 {
            self.hazard.spin_axis = Vec3::Y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_consts() {
        let s = Settings::default();
        assert_eq!(s.player.base_speed, 10.0);
        assert_eq!(s.player.win_threshold, 16);
        assert_eq!(s.camera.pitch_min, -45.0);
        assert_eq!(s.camera.pitch_max, 60.0);
        assert_eq!(s.revert_policy, RevertPolicy::Recompute);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let s = Settings::from_json(r#"{ "player": { "win_threshold": 4 } }"#).unwrap();
        assert_eq!(s.player.win_threshold, 4);
        assert_eq!(s.player.base_speed, PLAYER_BASE_SPEED);
        assert_eq!(s.hazard.flash_interval, HAZARD_FLASH_INTERVAL);
    }

    #[test]
    fn test_validate_clamps() {
        let s = Settings::from_json(
            r#"{
                "player": { "win_threshold": 0 },
                "camera": { "pitch_min": 30.0, "pitch_max": -10.0 },
                "hazard": { "flash_interval": -1.0 }
            }"#,
        )
        .unwrap();
        assert_eq!(s.player.win_threshold, 1);
        assert_eq!(s.camera.pitch_min, -10.0);
        assert_eq!(s.camera.pitch_max, 30.0);
        assert_eq!(s.hazard.flash_interval, HAZARD_FLASH_INTERVAL);
    }

    #[test]
    fn test_legacy_policy_parses() {
        let s = Settings::from_json(r#"{ "revert_policy": "Snapshot" }"#).unwrap();
        assert_eq!(s.revert_policy, RevertPolicy::Snapshot);
    }

    #[test]
    fn test_json_roundtrip_keeps_tuning() {
        let mut s = Settings::default();
        s.player.jump_force = 20.0;
        let back = Settings::from_json(&s.to_json().unwrap()).unwrap();
        assert_eq!(back.player.jump_force, 20.0);
    }

    #[test]
    fn test_bad_json_is_error() {
        assert!(matches!(
            Settings::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
