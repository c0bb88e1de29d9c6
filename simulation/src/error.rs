//! Error types for the creature simulation

use thiserror::Error;

use crate::stat::StatKind;

/// Rejected creature construction. These are programmer errors in a template
/// or a decode path and should surface at startup or spawn time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CreatureError {
    #[error("creature `{species}` is missing required stat `{stat}`")]
    MissingStat { species: String, stat: StatKind },

    #[error("creature `{species}` has invalid level {level} (must be at least 1)")]
    InvalidLevel { species: String, level: u32 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("unknown species `{0}`")]
    UnknownSpecies(String),

    #[error("creature registry is empty")]
    Empty,

    #[error(transparent)]
    Creature(#[from] CreatureError),
}

/// Failure turning an item back into a creature.
#[derive(Debug, Error)]
pub enum CreatureItemError {
    #[error("item is not a creature item")]
    NotACreatureItem,

    #[error("corrupt creature item: missing field `{0}`")]
    MissingField(String),

    #[error("corrupt creature item: field `{field}` is not {expected}")]
    WrongType { field: String, expected: &'static str },

    #[error("corrupt creature item: unknown entity kind `{0}`")]
    UnknownEntityKind(String),

    #[error("corrupt creature item: stat `{0}` does not match its upgrade points")]
    StatMismatch(String),

    #[error("corrupt creature item: {0}")]
    Creature(#[from] CreatureError),

    #[error("item encoding failed: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("item json failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid level range {min}..={max}")]
    LevelRange { min: u32, max: u32 },

    #[error("ticks_per_second must be greater than zero")]
    ZeroTickRate,

    #[error("invalid spawn area: {0}")]
    SpawnArea(String),

    #[error("creature templates rejected: {0}")]
    Registry(#[from] RegistryError),
}

/// Misuse of the host world API (stale or mistyped entity handles).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorldError {
    #[error("no such entity {0:?}")]
    NoSuchEntity(hecs::Entity),

    #[error("entity {0:?} is not a player")]
    NotAPlayer(hecs::Entity),

    #[error("entity {0:?} is not a creature")]
    NotACreature(hecs::Entity),
}
