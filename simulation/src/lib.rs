//! Creature Simulation Engine
//!
//! Tameable, breedable creatures on an ECS world. Wild creatures spawn around
//! players, are tamed by repeated hits, carried as items, leashed in pairs to
//! breed, and keep their upgraded stats through every round trip.

pub mod components;
pub mod config;
pub mod creature;
pub mod error;
pub mod events;
pub mod item;
pub mod map;
pub mod player;
pub mod registry;
pub mod scheduler;
pub mod service;
pub mod species;
pub mod stat;
pub mod systems;
pub mod tick_runner;
pub mod world;

#[cfg(test)]
pub(crate) mod testing;

pub use config::SimulationConfig;
pub use creature::{Creature, CreatureConfig, LevelRange};
pub use error::{ConfigError, CreatureError, CreatureItemError, RegistryError, WorldError};
pub use item::ItemStack;
pub use map::MapManager;
pub use registry::CreatureRegistry;
pub use service::{CreatureService, CreatureState};
pub use species::{EntityKind, Species};
pub use stat::{Stat, StatKind};
pub use world::{SimulationWorld, TickResult};
