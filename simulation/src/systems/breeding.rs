//! Breeding System
//!
//! Leashing two tamed creatures of the same species and opposite gender to
//! one player pairs them. Each pair runs its own countdown task: one tick of
//! the partner's `breeding_time_remaining` tag per second, and an offspring
//! when it reaches zero. Unleashing or removing either parent breaks the pair
//! and cancels the task.

use std::collections::HashMap;

use hecs::Entity;
use tracing::{debug, info, warn};

use crate::creature::{Creature, CreatureConfig, BREEDING_TIME_REMAINING};
use crate::events::SimEventKind;
use crate::scheduler::{CancellationToken, Task, TaskId, TaskSchedule};
use crate::species::Species;
use crate::world::SimulationWorld;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairId(pub u64);

/// Why two leashed creatures did not pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairRejection {
    /// One of them is not a tamed creature
    NotBreedable,
    DifferentSpecies,
    SameGender,
    /// One of them already has an active pairing
    AlreadyPairing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairBreak {
    Unleashed,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeashOutcome {
    Released,
    Held,
    Paired(PairId),
    Rejected(PairRejection),
}

/// Breeding-relevant view of a creature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breedable {
    pub entity: Entity,
    pub species: Species,
    pub male: bool,
    pub tamed: bool,
    pub pairing: Option<PairId>,
}

#[derive(Debug, Clone)]
pub struct BreedingPair {
    pub id: PairId,
    /// Creature whose interaction formed the pair; the offspring copies it
    pub initiator: Entity,
    pub partner: Entity,
    /// Creature whose tag holds the countdown
    pub counter: Entity,
    pub task: TaskId,
    pub token: CancellationToken,
}

impl BreedingPair {
    pub fn members(&self) -> [Entity; 2] {
        [self.initiator, self.partner]
    }
}

#[derive(Debug, Default)]
pub struct PairBook {
    pairs: HashMap<PairId, BreedingPair>,
    next_id: u64,
}

impl PairBook {
    fn allocate(&mut self) -> PairId {
        let id = PairId(self.next_id);
        self.next_id += 1;
        id
    }

    fn insert(&mut self, pair: BreedingPair) {
        self.pairs.insert(pair.id, pair);
    }

    fn remove(&mut self, id: PairId) -> Option<BreedingPair> {
        self.pairs.remove(&id)
    }

    pub fn get(&self, id: PairId) -> Option<&BreedingPair> {
        self.pairs.get(&id)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Whether two creatures may pair
pub fn evaluate_pair(initiator: &Breedable, partner: &Breedable) -> Result<(), PairRejection> {
    if !initiator.tamed || !partner.tamed {
        return Err(PairRejection::NotBreedable);
    }
    if initiator.species != partner.species {
        return Err(PairRejection::DifferentSpecies);
    }
    if initiator.male == partner.male {
        return Err(PairRejection::SameGender);
    }
    if initiator.pairing.is_some() || partner.pairing.is_some() {
        return Err(PairRejection::AlreadyPairing);
    }
    Ok(())
}

/// Main-hand interaction with a tamed creature by a player not sneaking
pub fn toggle_leash(sim: &mut SimulationWorld, creature: Entity, player: Entity) -> LeashOutcome {
    if sim.leash_holder(creature).is_some() {
        let pairing = sim.breedable(creature).and_then(|b| b.pairing);
        match pairing {
            Some(pair) => break_pair(sim, pair, PairBreak::Unleashed),
            None => release(sim, creature),
        }
        return LeashOutcome::Released;
    }

    sim.set_leash_holder(creature, Some(player));
    sim.record(SimEventKind::Leashed {
        creature,
        holder: player,
    });

    let leashed = sim.leashed_by(player);
    if leashed.len() != 2 {
        return LeashOutcome::Held;
    }

    let outcome = match leashed.into_iter().find(|&entity| entity != creature) {
        Some(partner) => match try_pair(sim, creature, partner) {
            Ok(pair) => LeashOutcome::Paired(pair),
            Err(rejection) => LeashOutcome::Rejected(rejection),
        },
        None => LeashOutcome::Held,
    };

    for entity in sim.leashed_by(player) {
        release(sim, entity);
    }
    outcome
}

fn release(sim: &mut SimulationWorld, creature: Entity) {
    sim.set_leash_holder(creature, None);
    sim.record(SimEventKind::Unleashed { creature });
}

fn try_pair(
    sim: &mut SimulationWorld,
    initiator: Entity,
    partner: Entity,
) -> Result<PairId, PairRejection> {
    let result = match (sim.breedable(initiator), sim.breedable(partner)) {
        (Some(a), Some(b)) => evaluate_pair(&a, &b),
        _ => Err(PairRejection::NotBreedable),
    };
    sim.record(SimEventKind::PairEvaluated {
        initiator,
        partner,
        rejection: result.err(),
    });
    if let Err(rejection) = result {
        debug!("{:?} and {:?} not paired: {:?}", initiator, partner, rejection);
        return Err(rejection);
    }
    Ok(form_pair(sim, initiator, partner))
}

fn form_pair(sim: &mut SimulationWorld, initiator: Entity, partner: Entity) -> PairId {
    let id = sim.pairs.allocate();
    let token = CancellationToken::new();
    let delay = sim.config.seconds_to_ticks(1);
    let task = sim.schedule(delay, Task::BreedingCountdown { pair: id }, token.clone());

    sim.pairs.insert(BreedingPair {
        id,
        initiator,
        partner,
        counter: partner,
        task,
        token,
    });
    for member in [initiator, partner] {
        if let Ok(mut creature) = sim.creature_mut(member) {
            creature.service_mut().set_pairing(Some(id));
        }
    }
    sim.set_leash_holder(initiator, Some(partner));
    sim.set_leash_holder(partner, Some(initiator));

    sim.record(SimEventKind::PairFormed {
        pair: id,
        initiator,
        partner,
    });
    info!("{:?} paired {:?} with {:?}", id, initiator, partner);
    id
}

/// Cancel a pair's countdown and release both members from each other
pub fn break_pair(sim: &mut SimulationWorld, id: PairId, reason: PairBreak) {
    let Some(pair) = sim.pairs.remove(id) else {
        return;
    };
    pair.token.cancel();
    release_members(sim, &pair);
    sim.record(SimEventKind::PairBroken { pair: id, reason });
    info!("{:?} broken ({:?})", id, reason);
}

fn release_members(sim: &mut SimulationWorld, pair: &BreedingPair) {
    for (member, other) in [(pair.initiator, pair.partner), (pair.partner, pair.initiator)] {
        if let Ok(mut creature) = sim.creature_mut(member) {
            if creature.service().pairing() == Some(pair.id) {
                creature.service_mut().set_pairing(None);
            }
        }
        if sim.leash_holder(member) == Some(other) {
            release(sim, member);
        }
    }
}

/// One second of a pair's countdown
pub(crate) fn run_countdown(sim: &mut SimulationWorld, id: PairId) -> TaskSchedule {
    let Some(pair) = sim.pairs.get(id).cloned() else {
        return TaskSchedule::Stop;
    };
    if pair.token.is_cancelled() {
        return TaskSchedule::Stop;
    }
    if pair.members().iter().any(|&m| sim.creature(m).is_err()) {
        break_pair(sim, id, PairBreak::Removed);
        return TaskSchedule::Stop;
    }

    let remaining = {
        let Ok(mut counter) = sim.creature_mut(pair.counter) else {
            return TaskSchedule::Stop;
        };
        let breed_time = counter.breed_time();
        counter
            .tags_mut()
            .update(&BREEDING_TIME_REMAINING, breed_time, |left| left.saturating_sub(1))
    };
    sim.record(SimEventKind::BreedingProgress {
        pair: id,
        remaining,
    });

    if remaining > 0 {
        return TaskSchedule::Seconds(1);
    }
    give_birth(sim, &pair);
    TaskSchedule::Stop
}

fn give_birth(sim: &mut SimulationWorld, pair: &BreedingPair) {
    let partner_level = sim.creature(pair.partner).map(|c| c.level()).unwrap_or(0);
    let built = {
        let Ok(initiator) = sim.creature(pair.initiator) else {
            return;
        };
        let mut config = CreatureConfig::inherit(&initiator);
        config.installers = sim.registry.installers_for(initiator.species()).to_vec();
        let level = initiator
            .level()
            .max(partner_level)
            .saturating_add(sim.config.offspring_level_bonus);
        Creature::tamed(&config, level, initiator.is_male())
    };

    sim.pairs.remove(pair.id);
    release_members(sim, pair);
    if let Ok(mut counter) = sim.creature_mut(pair.counter) {
        let breed_time = counter.breed_time();
        counter.tags_mut().set(&BREEDING_TIME_REMAINING, breed_time);
    }

    let mut offspring = match built {
        Ok(offspring) => offspring,
        Err(err) => {
            warn!("{:?} could not produce offspring: {}", pair.id, err);
            return;
        }
    };
    offspring.attributes_mut().scale = sim.config.offspring_scale;
    let species = offspring.species().clone();
    let level = offspring.level();

    let z_offset = sim.config.offspring_z_offset;
    let position = sim
        .position(pair.initiator)
        .unwrap_or(sim.config.respawn_point)
        .with_z(|z| z - z_offset);
    let entity = sim.set_instance(offspring, position);

    sim.record(SimEventKind::OffspringBorn {
        pair: pair.id,
        offspring: entity,
        species: species.clone(),
        level,
    });
    info!("{:?} produced a level {} {} ({:?})", pair.id, level, species, entity);
}
