//! Taming System
//!
//! A wild creature is tamed by a number of player hits equal to its level.
//! The tamed creature goes straight into the player's inventory as an item.

use hecs::Entity;
use tracing::{debug, info};

use crate::components::Health;
use crate::events::{RemovalCause, SimEventKind};
use crate::item;
use crate::world::SimulationWorld;

pub const TAMED_MESSAGE: &str = "IT WAS TAMED!";
pub const INVENTORY_FULL_MESSAGE: &str = "Your inventory is full.";

/// Handle one player hit on a wild creature
pub fn register_hit(sim: &mut SimulationWorld, creature: Entity, player: Entity) {
    let tick = sim.now();
    if let Ok(mut health) = sim.world.get::<&mut Health>(creature) {
        health.damage(Some(player), 0.0, tick);
    }

    let (times_hit, level) = {
        let Ok(mut wild) = sim.creature_mut(creature) else {
            return;
        };
        if wild.is_tamed() {
            return;
        }
        let level = wild.level();
        (wild.service_mut().record_hit(level), level)
    };
    sim.record(SimEventKind::TamingHit {
        creature,
        player,
        times_hit,
        level,
    });
    debug!("{:?} hit {:?}: {}/{}", player, creature, times_hit, level);

    if times_hit < level {
        return;
    }

    let (portable, species) = {
        let Ok(mut tamed) = sim.creature_mut(creature) else {
            return;
        };
        tamed.set_tamed();
        (item::to_item(&tamed), tamed.species().clone())
    };
    sim.record(SimEventKind::CreatureTamed {
        creature,
        player,
        species: species.clone(),
    });

    match sim.add_item_stack(player, portable) {
        Ok(_) => {
            sim.send_message(player, TAMED_MESSAGE);
            info!("{} {:?} tamed by {:?}", species, creature, player);
            let _ = sim.remove(creature, RemovalCause::Tamed);
        }
        Err(_) => {
            // Stays in the world tamed so nothing is lost
            sim.send_message(player, INVENTORY_FULL_MESSAGE);
            info!("{} {:?} tamed by {:?}, kept in world", species, creature, player);
        }
    }
}

/// Pick a tamed creature back up into the player's inventory
pub fn recall(sim: &mut SimulationWorld, creature: Entity, player: Entity) {
    let portable = match sim.creature(creature) {
        Ok(tamed) => item::to_item(&tamed),
        Err(_) => return,
    };
    match sim.add_item_stack(player, portable) {
        Ok(_) => {
            sim.record(SimEventKind::CreatureRecalled { creature, player });
            let _ = sim.remove(creature, RemovalCause::Recalled);
        }
        Err(_) => sim.send_message(player, INVENTORY_FULL_MESSAGE),
    }
}
