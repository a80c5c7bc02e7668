//! Spinning hazards
//!
//! A hazard owns a fixed set of parts picked from its child bodies when it is
//! built. Every part is lethal to the player on contact, always. The spin and
//! the red/white flashing are cosmetics for the renderer and never gate the
//! kill.

use glam::{Quat, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use super::collision::Tag;
use super::state::EntityId;
use crate::error::RouteError;
use crate::settings::HazardSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HazardId(pub u32);

/// A child body offered to a hazard at construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartDescriptor {
    pub id: EntityId,
    pub name: String,
    pub tag: Option<String>,
    /// Parts without something to draw cannot flash and are skipped
    pub has_renderer: bool,
}

impl PartDescriptor {
    pub fn named(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            tag: None,
            has_renderer: true,
        }
    }
}

/// One lethal piece of a hazard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardPart {
    pub id: EntityId,
    /// Owning controller (handle, not ownership). `GameState` resolves part
    /// contacts to the controller through this.
    pub controller: HazardId,
    /// Current tint, for the renderer
    pub color: Vec4,
}

/// Contact from a hazard part that must kill the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strike {
    pub hazard: HazardId,
    pub part: EntityId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardController {
    pub id: HazardId,
    parts: Vec<HazardPart>,
    /// Accumulated spin, for the renderer
    pub rotation: Quat,
    spin_axis: Vec3,
    spin_speed: f32,
    flash_interval: f32,
    flash_timer: f32,
    danger_lit: bool,
    normal_color: Vec4,
    danger_color: Vec4,
}

impl HazardController {
    pub fn new(id: HazardId, children: &[PartDescriptor], settings: &HazardSettings) -> Self {
        let parts = children
            .iter()
            .filter(|c| c.has_renderer && is_lethal_part(c, settings))
            .map(|c| HazardPart {
                id: c.id,
                controller: id,
                color: settings.normal_color,
            })
            .collect();

        Self {
            id,
            parts,
            rotation: Quat::IDENTITY,
            spin_axis: settings.spin_axis.normalize_or(Vec3::Y),
            spin_speed: settings.spin_speed,
            flash_interval: settings.flash_interval,
            flash_timer: 0.0,
            danger_lit: false,
            normal_color: settings.normal_color,
            danger_color: settings.danger_color,
        }
    }

    pub fn parts(&self) -> &[HazardPart] {
        &self.parts
    }

    pub fn owns(&self, part: EntityId) -> bool {
        self.parts.iter().any(|p| p.id == part)
    }

    /// Color every part currently shows
    pub fn current_color(&self) -> Vec4 {
        if self.danger_lit {
            self.danger_color
        } else {
            self.normal_color
        }
    }

    /// Advance spin and flash. Returns true when the colors toggled.
    pub fn update(&mut self, dt: f32) -> bool {
        if !(dt > 0.0) {
            return false;
        }

        let spin = Quat::from_axis_angle(self.spin_axis, (self.spin_speed * dt).to_radians());
        self.rotation = (spin * self.rotation).normalize();

        self.flash_timer += dt;
        if self.flash_timer < self.flash_interval {
            return false;
        }
        self.flash_timer = 0.0;
        self.danger_lit = !self.danger_lit;
        let color = self.current_color();
        for part in &mut self.parts {
            part.color = color;
        }
        true
    }

    /// A part touched something. Contact with the player is always a strike.
    pub fn report_contact(&self, part: EntityId, other: Tag) -> Result<Option<Strike>, RouteError> {
        if !self.owns(part) {
            return Err(RouteError::UnknownHazardPart(part));
        }
        Ok((other == Tag::Player).then_some(Strike {
            hazard: self.id,
            part,
        }))
    }
}

fn is_lethal_part(child: &PartDescriptor, settings: &HazardSettings) -> bool {
    match &settings.part_tag {
        Some(tag) => child.tag.as_deref() == Some(tag.as_str()),
        None => child
            .name
            .to_lowercase()
            .contains(&settings.part_name.to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn children() -> Vec<PartDescriptor> {
        vec![
            PartDescriptor::named(EntityId(10), "Hub"),
            PartDescriptor::named(EntityId(11), "Capsule_Left"),
            PartDescriptor::named(EntityId(12), "arm CAPSULE"),
            PartDescriptor {
                has_renderer: false,
                ..PartDescriptor::named(EntityId(13), "Capsule_Collider")
            },
        ]
    }

    fn hazard() -> HazardController {
        HazardController::new(HazardId(1), &children(), &HazardSettings::default())
    }

    #[test]
    fn test_parts_discovered_by_name() {
        let h = hazard();
        let ids: Vec<_> = h.parts().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![EntityId(11), EntityId(12)]);
        assert!(h.parts().iter().all(|p| p.controller == HazardId(1)));
    }

    #[test]
    fn test_parts_discovered_by_tag() {
        let mut kids = children();
        kids[0].tag = Some("Blade".to_string());
        let settings = HazardSettings {
            part_tag: Some("Blade".to_string()),
            ..Default::default()
        };
        let h = HazardController::new(HazardId(2), &kids, &settings);
        assert_eq!(h.parts().len(), 1);
        assert!(h.owns(EntityId(10)));
    }

    #[test]
    fn test_flash_toggles_in_lockstep() {
        let mut h = hazard();
        let settings = HazardSettings::default();
        assert!(!h.update(0.1));
        assert!(!h.update(0.1));
        assert!(h.update(0.1)); // 0.3s
        assert!(h.parts().iter().all(|p| p.color == settings.danger_color));
        assert!(!h.update(0.2));
        assert!(h.update(0.1));
        assert!(h.parts().iter().all(|p| p.color == settings.normal_color));
    }

    #[test]
    fn test_spin_accumulates() {
        let mut h = hazard();
        // 100 deg/s for 0.9s = 90 degrees about Y
        for _ in 0..9 {
            h.update(0.1);
        }
        let turned = h.rotation * Vec3::Z;
        assert!((turned - Vec3::X).length() < 1e-4);
    }

    #[test]
    fn test_strike_regardless_of_color() {
        let mut h = hazard();
        for step in 0..20 {
            let strike = h.report_contact(EntityId(11), Tag::Player).unwrap();
            assert_eq!(
                strike,
                Some(Strike {
                    hazard: HazardId(1),
                    part: EntityId(11)
                }),
                "no strike at step {step}"
            );
            h.update(0.07);
        }
    }

    #[test]
    fn test_non_player_contact_is_harmless() {
        let h = hazard();
        assert_eq!(h.report_contact(EntityId(12), Tag::Ground), Ok(None));
        assert_eq!(h.report_contact(EntityId(12), Tag::Enemy), Ok(None));
    }

    #[test]
    fn test_unknown_part_is_error() {
        let h = hazard();
        assert_eq!(
            h.report_contact(EntityId(10), Tag::Player),
            Err(RouteError::UnknownHazardPart(EntityId(10)))
        );
    }
}
