//! Creature Simulation Demo
//!
//! Runs a headless world: a player joins, wild creatures spawn, one of them is
//! tamed and placed back down. Pass a JSON config path to override defaults.

use std::time::Instant;

use anyhow::Context;
use simulation::components::{BlockPos, Hand, Position};
use simulation::config::SimulationConfig;
use simulation::map::MapManager;
use simulation::SimulationWorld;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

fn load_config() -> anyhow::Result<SimulationConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {}", path))?;
            Ok(SimulationConfig::from_json_str(&json)?)
        }
        None => Ok(SimulationConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Creature simulation starting...");
    let config = load_config()?;
    let mut world = SimulationWorld::new(config).context("invalid simulation config")?;
    MapManager::install(&mut world);

    let player = world.join_player("Steve", Position::new(0.0, 50.0, 0.0));

    info!("Running 30 seconds of world time...");
    let start = Instant::now();
    world.advance_seconds(30);
    info!(
        "{} creatures after {} ticks ({:?})",
        world.creature_count(),
        world.now(),
        start.elapsed()
    );

    let target = world
        .creatures()
        .into_iter()
        .min_by_key(|&e| world.creature(e).map(|c| c.level()).unwrap_or(u32::MAX))
        .context("no creature spawned")?;
    let level = world.creature(target)?.level();
    info!("Taming a level {} creature", level);
    for _ in 0..level {
        world.attack(player, target);
    }
    for message in world.messages(player) {
        info!("[chat] {}", message);
    }

    world.interact_block(player, BlockPos::new(10, 49, 10), Hand::Main);
    world.advance_seconds(1);
    info!(
        "Final state: {} creatures, {} events logged",
        world.creature_count(),
        world.events().len()
    );

    Ok(())
}
