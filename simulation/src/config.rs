//! Simulation configuration
//!
//! Loaded from JSON; every field has a default so partial files are fine.

use serde::{Deserialize, Serialize};

use crate::components::Position;
use crate::creature::LevelRange;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for the world's random source
    pub seed: u64,
    /// Host engine tick rate; scheduler delays in seconds are converted with it
    pub ticks_per_second: u32,
    /// Lowest level a wild creature can roll
    pub min_level: u32,
    /// Highest level a wild creature can roll
    pub max_level: u32,
    /// Seconds between wild spawn attempts
    pub spawn_interval_secs: u32,
    /// Wild creatures are placed at x,z in `0..spawn_area` and y = `spawn_height`
    pub spawn_area: u32,
    pub spawn_height: f64,
    /// Spawning pauses while this many wild creatures are alive
    pub max_wild_creatures: usize,
    /// Ticks a placement waits when its chunk is not loaded yet
    pub chunk_load_ticks: u64,
    /// Chunk edge length in blocks
    pub chunk_size: i64,
    /// Added to the higher parent level for an offspring
    pub offspring_level_bonus: u32,
    /// Scale attribute given to newborn creatures
    pub offspring_scale: f32,
    /// Offspring spawn this far behind the initiating parent on z
    pub offspring_z_offset: f64,
    pub respawn_point: Position,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            ticks_per_second: 20,
            min_level: 1,
            max_level: 150,
            spawn_interval_secs: 1,
            spawn_area: 50,
            spawn_height: 50.0,
            max_wild_creatures: 64,
            chunk_load_ticks: 2,
            chunk_size: 16,
            offspring_level_bonus: 100,
            offspring_scale: 0.1,
            offspring_z_offset: 2.0,
            respawn_point: Position::new(0.0, 50.0, 0.0),
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.level_range()?;
        if self.ticks_per_second == 0 {
            return Err(ConfigError::ZeroTickRate);
        }
        if self.spawn_area == 0 {
            return Err(ConfigError::SpawnArea("spawn_area must be positive".into()));
        }
        if self.chunk_size <= 0 {
            return Err(ConfigError::SpawnArea("chunk_size must be positive".into()));
        }
        Ok(())
    }

    pub fn level_range(&self) -> Result<LevelRange, ConfigError> {
        LevelRange::new(self.min_level, self.max_level)
    }

    /// Convert seconds to scheduler ticks
    pub fn seconds_to_ticks(&self, seconds: u32) -> u64 {
        seconds as u64 * self.ticks_per_second as u64
    }
}
