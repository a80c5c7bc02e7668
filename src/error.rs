//! Error types
//!
//! Nothing here is fatal to a running game: routing errors are logged and the
//! offending interaction is skipped, config errors fall back to defaults.

use thiserror::Error;

use crate::sim::state::EntityId;

/// A contact referenced something the simulation does not know about.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("no entity with id {0:?}")]
    UnknownEntity(EntityId),
    #[error("entity {0:?} is not a pickup")]
    NotAPickup(EntityId),
    #[error("speed pickup {0:?} has no boost configuration")]
    MissingBoost(EntityId),
    #[error("entity {0:?} is not a part of any hazard")]
    UnknownHazardPart(EntityId),
    #[error("no enemy with id {0:?}")]
    UnknownEnemy(EntityId),
}

/// Failure to load or validate settings
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
}
