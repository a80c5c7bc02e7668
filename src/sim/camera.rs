//! Third-person orbit camera
//!
//! Accumulates yaw/pitch from look input and places the camera on an offset
//! around the player. World convention: y up, +z forward at zero yaw, +x right.

use glam::{EulerRot, Mat3, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::locomotion::MoveBasis;
use crate::settings::CameraSettings;
use crate::wrap_degrees;

/// Where the camera sits and which way it faces
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: Vec3,
    /// Camera orientation: local +z maps to `forward`, +x to `right`, +y up
    pub rotation: Quat,
    /// Unit vector from the camera toward the player
    pub forward: Vec3,
    pub right: Vec3,
}

impl CameraPose {
    /// Horizontal basis for camera-relative movement
    pub fn move_basis(&self) -> MoveBasis {
        MoveBasis::from_camera(self.forward, self.right)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrbitCamera {
    /// Degrees around the vertical axis
    pub yaw: f32,
    /// Degrees, positive looks down on the player
    pub pitch: f32,
    settings: CameraSettings,
    pose: Option<CameraPose>,
}

impl OrbitCamera {
    pub fn new(settings: CameraSettings) -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            settings,
            pose: None,
        }
    }

    /// Accumulate one frame of look input
    pub fn apply_look(&mut self, look: Vec2) {
        if !self.settings.mouse_look || !look.is_finite() {
            return;
        }
        let yaw = self.yaw + look.x * self.settings.sensitivity;
        let pitch = self.pitch - look.y * self.settings.sensitivity;
        // Overflowing look deltas are dropped
        if !yaw.is_finite() || !pitch.is_finite() {
            return;
        }
        self.yaw = wrap_degrees(yaw);
        self.pitch = pitch.clamp(self.settings.pitch_min, self.settings.pitch_max);
    }

    /// Pose for the given angles around a player position
    pub fn pose_for(&self, player_position: Vec3) -> CameraPose {
        let orbit = Quat::from_euler(
            EulerRot::YXZ,
            self.yaw.to_radians(),
            self.pitch.to_radians(),
            0.0,
        );
        let offset = orbit * Vec3::new(0.0, self.settings.height, -self.settings.distance);
        let position = player_position + offset;
        let forward = (player_position - position).normalize_or_zero();
        let right = Vec3::Y.cross(forward).normalize_or_zero();
        let rotation = if forward == Vec3::ZERO || right == Vec3::ZERO {
            orbit
        } else {
            let up = forward.cross(right);
            Quat::from_mat3(&Mat3::from_cols(right, up, forward))
        };
        CameraPose {
            position,
            rotation,
            forward,
            right,
        }
    }

    /// Follow the player. Without a player position the previous pose is kept.
    pub fn update(&mut self, player_position: Option<Vec3>) -> Option<CameraPose> {
        if let Some(target) = player_position.filter(|p| p.is_finite()) {
            self.pose = Some(self.pose_for(target));
        }
        self.pose
    }

    /// Last computed pose
    pub fn pose(&self) -> Option<CameraPose> {
        self.pose
    }

    /// Movement basis from the last pose (no movement before the first update)
    pub fn move_basis(&self) -> MoveBasis {
        self.pose.map(|p| p.move_basis()).unwrap_or(MoveBasis::NONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> OrbitCamera {
        OrbitCamera::new(CameraSettings::default())
    }

    #[test]
    fn test_default_pose_behind_and_above() {
        let mut cam = camera();
        let pose = cam.update(Some(Vec3::ZERO)).unwrap();
        assert!((pose.position - Vec3::new(0.0, 5.0, -10.0)).length() < 1e-5);

        let basis = pose.move_basis();
        assert!((basis.forward - Vec3::Z).length() < 1e-5);
        assert!((basis.right - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn test_yaw_rotates_basis() {
        let mut cam = camera();
        // 45 units of look at sensitivity 2 -> 90 degrees
        cam.apply_look(Vec2::new(45.0, 0.0));
        assert!((cam.yaw - 90.0).abs() < 1e-5);
        let basis = cam.update(Some(Vec3::ZERO)).unwrap().move_basis();
        assert!((basis.forward - Vec3::X).length() < 1e-5);
        assert!((basis.right - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut cam = camera();
        cam.apply_look(Vec2::new(0.0, -1000.0));
        assert_eq!(cam.pitch, 60.0);
        cam.apply_look(Vec2::new(0.0, 1000.0));
        assert_eq!(cam.pitch, -45.0);
    }

    #[test]
    fn test_positive_pitch_raises_camera() {
        let mut cam = camera();
        cam.apply_look(Vec2::new(0.0, -15.0)); // pitch 30
        let pose = cam.update(Some(Vec3::ZERO)).unwrap();
        assert!(pose.position.y > 5.0);
        // Still looks at the player
        let to_player = (Vec3::ZERO - pose.position).normalize();
        assert!((pose.forward - to_player).length() < 1e-5);
    }

    #[test]
    fn test_mouse_look_disabled() {
        let mut cam = OrbitCamera::new(CameraSettings {
            mouse_look: false,
            ..Default::default()
        });
        cam.apply_look(Vec2::new(10.0, 10.0));
        assert_eq!((cam.yaw, cam.pitch), (0.0, 0.0));
    }

    #[test]
    fn test_missing_player_keeps_last_pose() {
        let mut cam = camera();
        assert!(cam.update(None).is_none());
        assert_eq!(cam.move_basis(), MoveBasis::NONE);

        let pose = cam.update(Some(Vec3::new(1.0, 0.0, 1.0))).unwrap();
        cam.apply_look(Vec2::new(20.0, 0.0));
        assert_eq!(cam.update(None), Some(pose));
    }

    #[test]
    fn test_rotation_looks_at_player() {
        let mut cam = camera();
        for look in [Vec2::ZERO, Vec2::new(30.0, -10.0), Vec2::new(-70.0, 20.0)] {
            cam.apply_look(look);
            let pose = cam.update(Some(Vec3::new(1.0, 0.5, -2.0))).unwrap();
            assert!((pose.rotation * Vec3::Z - pose.forward).length() < 1e-5);
            assert!((pose.rotation * Vec3::X - pose.right).length() < 1e-5);
        }

        // Default offset looks down on the ball by atan(5/10)
        let pose = camera().pose_for(Vec3::ZERO);
        let down = (pose.rotation * Vec3::Z).y.asin().to_degrees();
        assert!((down + 26.565).abs() < 1e-2);
    }

    #[test]
    fn test_huge_look_delta_stays_usable() {
        let mut cam = camera();
        cam.apply_look(Vec2::new(5.0e9, 0.0));
        assert!((-180.0..180.0).contains(&cam.yaw));

        let before = (cam.yaw, cam.pitch);
        cam.apply_look(Vec2::new(f32::MAX, f32::MAX));
        assert_eq!((cam.yaw, cam.pitch), before);
        assert!(cam.update(Some(Vec3::ZERO)).unwrap().position.is_finite());
    }

    #[test]
    fn test_follows_player() {
        let mut cam = camera();
        let pose = cam.update(Some(Vec3::new(3.0, 1.0, 2.0))).unwrap();
        assert!((pose.position - Vec3::new(3.0, 6.0, -8.0)).length() < 1e-5);
    }
}
