//! Shared test fixtures

use hecs::Entity;

use crate::components::Position;
use crate::config::SimulationConfig;
use crate::creature::{Creature, CreatureConfig};
use crate::species::Species;
use crate::stat::Stat;
use crate::world::SimulationWorld;

/// Bull with a ten second breed time
pub(crate) fn bull_config() -> CreatureConfig {
    CreatureConfig::new(Species::BULL, 10)
        .health(Stat::new(40.0, 4.0))
        .stamina(Stat::new(100.0, 10.0))
        .oxygen(Stat::new(150.0, 15.0))
        .food(Stat::new(1200.0, 120.0))
        .weight(Stat::new(200.0, 4.0))
        .melee(Stat::new(2.0, 0.1))
        .speed(Stat::new(0.1, 0.005))
}

pub(crate) fn test_world() -> SimulationWorld {
    SimulationWorld::new(SimulationConfig {
        seed: 7,
        ..SimulationConfig::default()
    })
    .unwrap()
}

/// Run ticks until any placement submitted now has completed
pub(crate) fn settle(sim: &mut SimulationWorld) {
    sim.advance_ticks(sim.config.chunk_load_ticks + 1);
}

/// Place a creature at `(x, 50, 1)` and wait for it to attach
pub(crate) fn place(sim: &mut SimulationWorld, creature: Creature, x: f64) -> Entity {
    let entity = sim.set_instance(creature, Position::new(x, 50.0, 1.0));
    settle(sim);
    entity
}
