//! Map Manager - world-wide listeners
//!
//! Wild spawning once a player joins, target marking for every player,
//! placing creature items on blocks, commanding placed creatures, creature
//! melee and player death messages.

use hecs::Entity;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::components::{Hand, Health, Position};
use crate::events::{EventKind, SimEventKind, WorldEvent};
use crate::item;
use crate::player::PlayerData;
use crate::scheduler::{CancellationToken, Task, TaskSchedule};
use crate::systems::targeting;
use crate::world::SimulationWorld;

pub struct MapManager;

impl MapManager {
    /// Subscribe the world-wide listeners
    pub fn install(sim: &mut SimulationWorld) {
        sim.subscribe(EventKind::PlayerJoin, None, always, on_player_join);
        sim.subscribe(
            EventKind::PlayerBlockInteract,
            None,
            holds_creature_item,
            place_creature_item,
        );
        sim.subscribe(
            EventKind::PlayerEntityInteract,
            None,
            is_main_hand_player_interact,
            command_creatures,
        );
        sim.subscribe(EventKind::EntityAttack, None, is_creature_attack, creature_melee);
        sim.subscribe(EventKind::PlayerDeath, None, always, announce_death);
    }

    /// Start the repeating wild spawn task. Returns false if already running.
    pub fn start_spawning(sim: &mut SimulationWorld) -> bool {
        if sim.wild_spawn_task.is_some() {
            return false;
        }
        let delay = sim.config.seconds_to_ticks(sim.config.spawn_interval_secs);
        let task = sim.schedule(delay, Task::SpawnWild, CancellationToken::new());
        sim.wild_spawn_task = Some(task);
        info!("wild spawning every {}s", sim.config.spawn_interval_secs);
        true
    }

    pub fn is_spawning(sim: &SimulationWorld) -> bool {
        sim.wild_spawn_task.is_some()
    }
}

/// One wild spawn attempt
pub(crate) fn spawn_wild(sim: &mut SimulationWorld) -> TaskSchedule {
    let next = TaskSchedule::Seconds(sim.config.spawn_interval_secs);
    if sim.wild_creature_count() >= sim.config.max_wild_creatures {
        return next;
    }

    let creature = match sim.registry.random(&mut sim.rng) {
        Ok(creature) => creature,
        Err(err) => {
            warn!("wild spawning stopped: {}", err);
            sim.wild_spawn_task = None;
            return TaskSchedule::Stop;
        }
    };
    let area = sim.config.spawn_area;
    let x = sim.rng.gen_range(0..area) as f64;
    let z = sim.rng.gen_range(0..area) as f64;
    let position = Position::new(x, sim.config.spawn_height, z);

    debug!("spawning wild {} level {}", creature.species(), creature.level());
    sim.set_instance(creature, position);
    next
}

// ============================================================================
// Listeners
// ============================================================================

fn always(_: &SimulationWorld, _: Option<Entity>, _: &WorldEvent) -> bool {
    true
}

fn on_player_join(sim: &mut SimulationWorld, _: Option<Entity>, event: &WorldEvent) {
    MapManager::start_spawning(sim);
    if let WorldEvent::PlayerJoin { player } = *event {
        targeting::start(sim, player);
    }
}

fn holds_creature_item(sim: &SimulationWorld, _: Option<Entity>, event: &WorldEvent) -> bool {
    let WorldEvent::PlayerBlockInteract { player, hand, .. } = *event else {
        return false;
    };
    hand == Hand::Main
        && sim
            .inventory(player)
            .map(|inv| inv.item_in_hand(hand).is_some_and(item::is_creature_item))
            .unwrap_or(false)
}

fn place_creature_item(sim: &mut SimulationWorld, _: Option<Entity>, event: &WorldEvent) {
    let WorldEvent::PlayerBlockInteract { player, block, hand } = *event else {
        return;
    };
    let held = match sim.inventory(player) {
        Ok(inventory) => inventory.item_in_hand(hand).cloned(),
        Err(_) => None,
    };
    let Some(held) = held else {
        return;
    };

    match item::to_creature(&held, &sim.registry) {
        Ok(creature) => {
            let entity = sim.set_instance(creature, block.above());
            if let Ok(mut data) = sim.player_mut(player) {
                data.placed.push(entity);
            }
            if let Ok(mut inventory) = sim.inventory_mut(player) {
                inventory.set_item_in_hand(hand, None);
            }
        }
        Err(err) => {
            // Item stays in the hand
            warn!("player {:?} holds an unusable creature item: {}", player, err);
            sim.record(SimEventKind::ItemRejected {
                player,
                reason: err.to_string(),
            });
        }
    }
}

fn is_main_hand_player_interact(
    sim: &SimulationWorld,
    _: Option<Entity>,
    event: &WorldEvent,
) -> bool {
    let WorldEvent::PlayerEntityInteract { player, hand, .. } = *event else {
        return false;
    };
    hand == Hand::Main && sim.is_player(player)
}

fn command_creatures(sim: &mut SimulationWorld, _: Option<Entity>, event: &WorldEvent) {
    if let WorldEvent::PlayerEntityInteract { player, .. } = *event {
        targeting::command_placed(sim, player);
    }
}

fn is_creature_attack(sim: &SimulationWorld, _: Option<Entity>, event: &WorldEvent) -> bool {
    let WorldEvent::EntityAttack { attacker, target } = *event else {
        return false;
    };
    sim.creature(attacker).is_ok() && sim.health(target).is_some()
}

fn creature_melee(sim: &mut SimulationWorld, _: Option<Entity>, event: &WorldEvent) {
    let WorldEvent::EntityAttack { attacker, target } = *event else {
        return;
    };
    let damage = match sim.creature(attacker) {
        Ok(creature) => creature.attributes().attack_damage,
        Err(_) => return,
    };
    if let Err(err) = sim.damage(target, Some(attacker), damage) {
        debug!("melee from {:?} ignored: {}", attacker, err);
    }
}

fn death_message(sim: &SimulationWorld, player: Entity, killer: Option<Entity>) -> String {
    let name = sim
        .player(player)
        .map(|p| p.name.clone())
        .unwrap_or_default();
    match killer {
        None => format!("{} was killed due to unforeseen events", name),
        Some(killer) => match sim.creature(killer) {
            Ok(creature) => format!("{} was killed by a {}", name, creature.species()),
            Err(_) => format!("{} died", name),
        },
    }
}

fn announce_death(sim: &mut SimulationWorld, _: Option<Entity>, event: &WorldEvent) {
    let WorldEvent::PlayerDeath { player, killer } = *event else {
        return;
    };
    let message = death_message(sim, player, killer);
    info!("{}", message);

    let players: Vec<Entity> = sim
        .world
        .query::<&PlayerData>()
        .iter()
        .map(|(entity, _)| entity)
        .collect();
    for other in players {
        sim.send_message(other, message.clone());
    }
    sim.record(SimEventKind::PlayerDied { player, message });

    let respawn = sim.config.respawn_point;
    sim.set_position(player, respawn);
    if let Ok(mut health) = sim.world.get::<&mut Health>(player) {
        health.heal_full();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::BlockPos;
    use crate::config::SimulationConfig;
    use crate::creature::Creature;
    use crate::testing::{bull_config, place, settle, test_world};

    fn installed() -> SimulationWorld {
        let mut sim = test_world();
        MapManager::install(&mut sim);
        sim
    }

    #[test]
    fn test_spawning_starts_on_first_join() {
        let mut sim = installed();
        assert!(!MapManager::is_spawning(&sim));

        sim.join_player("Steve", Position::new(0.0, 50.0, 0.0));
        sim.join_player("Alex", Position::new(0.0, 50.0, 0.0));
        assert!(MapManager::is_spawning(&sim));
        // One spawn loop plus a marking task per player
        assert_eq!(sim.pending_tasks(), 3);

        sim.advance_seconds(5);
        settle(&mut sim);
        assert_eq!(sim.wild_creature_count(), 5);
        for entity in sim.creatures() {
            let position = sim.position(entity).unwrap();
            assert!((0.0..50.0).contains(&position.x));
            assert!((0.0..50.0).contains(&position.z));
            assert_eq!(position.y, 50.0);
        }
    }

    #[test]
    fn test_spawning_respects_cap() {
        let mut sim = SimulationWorld::new(SimulationConfig {
            max_wild_creatures: 3,
            ..SimulationConfig::default()
        })
        .unwrap();
        MapManager::install(&mut sim);
        sim.join_player("Steve", Position::new(0.0, 50.0, 0.0));

        sim.advance_seconds(10);
        assert_eq!(sim.wild_creature_count(), 3);
    }

    #[test]
    fn test_place_creature_item_on_block() {
        let mut sim = installed();
        let player = sim.join_player("Steve", Position::new(0.0, 50.0, 0.0));
        let creature = Creature::tamed(&bull_config(), 7, true).unwrap();
        sim.inventory_mut(player)
            .unwrap()
            .set_item_in_hand(Hand::Main, Some(item::to_item(&creature)));

        sim.interact_block(player, BlockPos::new(3, 49, 4), Hand::Main);
        assert!(sim.inventory(player).unwrap().item_in_hand(Hand::Main).is_none());

        settle(&mut sim);
        let placed = sim
            .creatures()
            .into_iter()
            .find(|&e| sim.creature(e).map(|c| c.is_tamed()).unwrap_or(false))
            .unwrap();
        assert_eq!(sim.position(placed), Some(Position::new(3.0, 50.0, 4.0)));
        assert_eq!(sim.creature(placed).unwrap().level(), 7);
        assert_eq!(sim.listeners_of(placed), 2);
        assert_eq!(sim.player(player).unwrap().placed, vec![placed]);
    }

    #[test]
    fn test_interaction_commands_placed_creatures() {
        let mut sim = SimulationWorld::new(SimulationConfig {
            max_wild_creatures: 0,
            ..SimulationConfig::default()
        })
        .unwrap();
        MapManager::install(&mut sim);
        let player = sim.join_player("Steve", Position::new(0.0, 50.0, 1.0));
        let creature = Creature::tamed(&bull_config(), 7, true).unwrap();
        sim.inventory_mut(player)
            .unwrap()
            .set_item_in_hand(Hand::Main, Some(item::to_item(&creature)));
        sim.interact_block(player, BlockPos::new(1, 49, 1), Hand::Main);
        settle(&mut sim);
        let own = sim.player(player).unwrap().placed[0];
        let wild = sim.registry().of("jumbuck", &mut rand::thread_rng()).unwrap();
        let enemy = place(&mut sim, wild, 5.0);

        sim.set_sneaking(player, true).unwrap();
        sim.advance_seconds(1);
        assert_eq!(sim.player(player).unwrap().target, Some(enemy));

        sim.interact_entity(player, enemy, Hand::Off);
        assert_eq!(targeting::marked_target(&sim, own), None);

        sim.interact_entity(player, enemy, Hand::Main);
        assert_eq!(targeting::marked_target(&sim, own), Some(enemy));
        assert!(sim
            .events()
            .iter()
            .any(|e| e.kind == SimEventKind::CreaturesCommanded { player, creatures: 1 }));
    }

    #[test]
    fn test_corrupt_item_stays_in_hand() {
        let mut sim = installed();
        let player = sim.join_player("Steve", Position::new(0.0, 50.0, 0.0));
        let mut corrupt = item::to_item(&Creature::tamed(&bull_config(), 7, true).unwrap());
        corrupt.tags.remove("male");
        sim.inventory_mut(player)
            .unwrap()
            .set_item_in_hand(Hand::Main, Some(corrupt.clone()));

        sim.interact_block(player, BlockPos::new(3, 49, 4), Hand::Main);
        assert_eq!(
            sim.inventory(player).unwrap().item_in_hand(Hand::Main),
            Some(&corrupt)
        );
        assert!(sim
            .events()
            .iter()
            .any(|e| matches!(e.kind, SimEventKind::ItemRejected { .. })));
    }

    #[test]
    fn test_creature_melee_and_death_message() {
        let mut sim = installed();
        let player = sim.join_player("Steve", Position::new(5.0, 50.0, 5.0));
        let scavenger = sim.registry().of("scavenger", &mut rand::thread_rng()).unwrap();
        let damage = scavenger.attributes().attack_damage;
        let attacker = place(&mut sim, scavenger, 2.0);

        sim.attack(attacker, player);
        let health = sim.health(player).unwrap();
        assert_eq!(health.current, 20.0 - damage);

        while sim.health(player).unwrap().current < 20.0 {
            sim.attack(attacker, player);
        }
        let expected = "Steve was killed by a Scavenger".to_string();
        assert!(sim.messages(player).contains(&expected));
        assert_eq!(sim.position(player), Some(sim.config.respawn_point));
    }

    #[test]
    fn test_unforeseen_death() {
        let mut sim = installed();
        let player = sim.join_player("Alex", Position::new(5.0, 50.0, 5.0));
        sim.damage(player, None, 100.0).unwrap();
        assert_eq!(
            sim.messages(player),
            vec!["Alex was killed due to unforeseen events".to_string()]
        );
        assert_eq!(sim.health(player).unwrap().current, 20.0);
    }
}
