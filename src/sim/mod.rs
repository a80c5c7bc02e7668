//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Physics, navigation, UI and audio are reached only through command/event outboxes
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - Contacts are applied synchronously in the step they are delivered

pub mod camera;
pub mod collision;
pub mod enemy;
pub mod hazard;
pub mod level;
pub mod locomotion;
pub mod modifier;
pub mod state;
pub mod tick;

pub use camera::{CameraPose, OrbitCamera};
pub use collision::{ContactEvent, ContactPhase, Tag, Transition, classify, route_batch, route_contact};
pub use hazard::{HazardController, HazardId, HazardPart, PartDescriptor};
pub use level::{BodySpec, Level, build_level};
pub use locomotion::{Locomotion, MoveBasis};
pub use modifier::{
    ModifierDuration, ModifierHandle, ModifierKind, RevertPolicy, Stat, StatModifierEngine,
};
pub use state::{
    BodyCommand, DeathCause, EntityId, GameEvent, GameState, Outcome, Pickup, PickupKind,
    PlayerPhase, PlayerState, SpeedBoost,
};
pub use tick::{TickInput, fixed_update, update};
