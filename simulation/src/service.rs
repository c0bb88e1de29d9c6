//! Creature Service - per-creature controller
//!
//! Every creature owns exactly one service. Once the creature is placed the
//! service spawns its name label and subscribes two listeners scoped to the
//! creature: attacks (taming, container) and main-hand interactions (recall,
//! leash, breeding). Removal undoes all of it.

use hecs::Entity;
use tracing::debug;

use crate::components::{Hand, Label, Position, Vehicle};
use crate::error::WorldError;
use crate::events::{EventKind, ListenerId, SimEventKind, WorldEvent};
use crate::player::Container;
use crate::species::EntityKind;
use crate::systems::breeding::{self, PairBreak, PairId};
use crate::systems::taming;
use crate::world::SimulationWorld;

/// Lifecycle state of a live creature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatureState {
    WildUntamed,
    TamedIdle,
    TamedLeashed,
    TamedPaired(PairId),
}

#[derive(Debug, Default)]
pub struct CreatureService {
    attack_listener: Option<ListenerId>,
    interact_listener: Option<ListenerId>,
    label: Option<Entity>,
    times_hit: u32,
    pairing: Option<PairId>,
}

impl CreatureService {
    /// Qualifying hits taken while wild
    pub fn times_hit(&self) -> u32 {
        self.times_hit
    }

    /// Count a taming hit. Never exceeds the creature's level.
    pub(crate) fn record_hit(&mut self, level: u32) -> u32 {
        self.times_hit = (self.times_hit + 1).min(level);
        self.times_hit
    }

    pub fn pairing(&self) -> Option<PairId> {
        self.pairing
    }

    pub(crate) fn set_pairing(&mut self, pairing: Option<PairId>) {
        self.pairing = pairing;
    }

    pub fn label(&self) -> Option<Entity> {
        self.label
    }

    pub fn is_attached(&self) -> bool {
        self.attack_listener.is_some() || self.interact_listener.is_some()
    }

    /// Attach label and listeners once the creature is placed.
    /// Calling it again on an attached creature does nothing.
    pub fn when_spawned(sim: &mut SimulationWorld, entity: Entity) -> Result<(), WorldError> {
        let text = {
            let creature = sim.creature(entity)?;
            if creature.service().is_attached() {
                return Ok(());
            }
            creature.label_text()
        };
        let position = sim
            .position(entity)
            .unwrap_or(Position::new(0.0, 0.0, 0.0));

        let label = sim.world.spawn((
            EntityKind::TextDisplay,
            Label { text },
            Vehicle(entity),
            position,
        ));
        sim.add_passenger(entity, label);

        let attack = sim.subscribe(
            EventKind::EntityAttack,
            Some(entity),
            is_player_attack,
            on_attacked,
        );
        let interact = sim.subscribe(
            EventKind::PlayerEntityInteract,
            Some(entity),
            is_tamed_main_hand_interact,
            on_interacted,
        );

        let mut creature = sim.creature_mut(entity)?;
        let service = creature.service_mut();
        service.attack_listener = Some(attack);
        service.interact_listener = Some(interact);
        service.label = Some(label);
        debug!("attached service to {:?}", entity);
        Ok(())
    }

    /// Detach listeners, drop the label and break any pairing
    pub fn when_no_longer_existing(sim: &mut SimulationWorld, entity: Entity) {
        let (listeners, pairing) = {
            let Ok(mut creature) = sim.creature_mut(entity) else {
                return;
            };
            let service = creature.service_mut();
            service.label = None;
            (
                [service.attack_listener.take(), service.interact_listener.take()],
                service.pairing,
            )
        };

        for id in listeners.into_iter().flatten() {
            sim.unsubscribe(id);
        }
        for passenger in sim.passengers(entity) {
            if sim.kind(passenger) == Some(EntityKind::TextDisplay) {
                let _ = sim.world.despawn(passenger);
            }
        }
        if let Some(pair) = pairing {
            breeding::break_pair(sim, pair, PairBreak::Removed);
        }
    }
}

// ============================================================================
// Listeners
// ============================================================================

fn is_player_attack(sim: &SimulationWorld, scope: Option<Entity>, event: &WorldEvent) -> bool {
    match event {
        WorldEvent::EntityAttack { attacker, target } => {
            Some(*target) == scope && sim.is_player(*attacker)
        }
        _ => false,
    }
}

fn on_attacked(sim: &mut SimulationWorld, scope: Option<Entity>, event: &WorldEvent) {
    let (Some(creature), WorldEvent::EntityAttack { attacker, .. }) = (scope, event) else {
        return;
    };
    let container = match sim.creature(creature) {
        Ok(c) if c.is_tamed() => Some(Container::for_creature(creature, c.species())),
        Ok(_) => None,
        Err(_) => return,
    };

    match container {
        None => taming::register_hit(sim, creature, *attacker),
        Some(container) => {
            sim.open_container(*attacker, container);
            sim.record(SimEventKind::ContainerOpened {
                player: *attacker,
                creature,
            });
        }
    }
}

fn is_tamed_main_hand_interact(
    sim: &SimulationWorld,
    scope: Option<Entity>,
    event: &WorldEvent,
) -> bool {
    match event {
        WorldEvent::PlayerEntityInteract { target, hand, .. } => {
            Some(*target) == scope
                && *hand == Hand::Main
                && sim.creature(*target).map(|c| c.is_tamed()).unwrap_or(false)
        }
        _ => false,
    }
}

fn on_interacted(sim: &mut SimulationWorld, scope: Option<Entity>, event: &WorldEvent) {
    let (Some(creature), WorldEvent::PlayerEntityInteract { player, .. }) = (scope, event) else {
        return;
    };
    if sim.is_sneaking(*player) {
        taming::recall(sim, creature, *player);
    } else {
        breeding::toggle_leash(sim, creature, *player);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creature::Creature;
    use crate::events::RemovalCause;
    use crate::testing::{bull_config, place, settle, test_world};

    #[test]
    fn test_record_hit_caps_at_level() {
        let mut service = CreatureService::default();
        assert_eq!(service.record_hit(2), 1);
        assert_eq!(service.record_hit(2), 2);
        assert_eq!(service.record_hit(2), 2);
    }

    #[test]
    fn test_when_spawned_is_idempotent() {
        let mut sim = test_world();
        let creature = place(&mut sim, Creature::tamed(&bull_config(), 4, true).unwrap(), 1.0);

        CreatureService::when_spawned(&mut sim, creature).unwrap();
        assert_eq!(sim.listeners_of(creature), 2);
        assert_eq!(sim.passengers(creature).len(), 1);
    }

    #[test]
    fn test_attack_on_tamed_opens_container() {
        let mut sim = test_world();
        let player = sim.join_player("Steve", Position::new(0.0, 50.0, 0.0));
        let creature = place(&mut sim, Creature::tamed(&bull_config(), 4, true).unwrap(), 1.0);

        sim.attack(player, creature);

        let container = sim.player(player).unwrap().open_container.clone().unwrap();
        assert_eq!(container.title, "Bull");
        assert_eq!(container.rows, 6);
        assert_eq!(sim.creature(creature).unwrap().times_hit(), 0);
    }

    #[test]
    fn test_off_hand_and_foreign_targets_ignored() {
        let mut sim = test_world();
        let player = sim.join_player("Steve", Position::new(0.0, 50.0, 0.0));
        let a = place(&mut sim, Creature::tamed(&bull_config(), 4, true).unwrap(), 1.0);
        let b = place(&mut sim, Creature::tamed(&bull_config(), 4, false).unwrap(), 2.0);

        sim.interact_entity(player, a, Hand::Off);
        assert_eq!(sim.leash_holder(a), None);

        sim.interact_entity(player, a, Hand::Main);
        assert_eq!(sim.leash_holder(a), Some(player));
        assert_eq!(sim.leash_holder(b), None);
    }

    #[test]
    fn test_state_and_cleanup() {
        let mut sim = test_world();
        let player = sim.join_player("Steve", Position::new(0.0, 50.0, 0.0));
        let creature = place(&mut sim, Creature::tamed(&bull_config(), 4, true).unwrap(), 1.0);
        assert_eq!(sim.creature_state(creature), Some(CreatureState::TamedIdle));

        sim.interact_entity(player, creature, Hand::Main);
        assert_eq!(sim.creature_state(creature), Some(CreatureState::TamedLeashed));

        sim.remove(creature, RemovalCause::Despawned).unwrap();
        settle(&mut sim);
        assert_eq!(sim.creature_state(creature), None);
        assert_eq!(sim.listener_count(), 0);
        assert!(sim.leashed_by(player).is_empty());
    }
}
