//! Simulation World - main orchestrator
//!
//! Owns the ECS world plus everything the creature services need from their
//! host: the tick clock, task scheduler, event node, registry, seeded random
//! source and the book of active breeding pairs.

use std::collections::HashSet;

use hecs::{ComponentError, Entity, Ref, RefMut, World};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::components::*;
use crate::config::SimulationConfig;
use crate::creature::Creature;
use crate::error::{ConfigError, WorldError};
use crate::events::{
    EventFilter, EventHandler, EventKind, EventNode, ListenerId, RemovalCause, SimEvent,
    SimEventKind, WorldEvent,
};
use crate::item::ItemStack;
use crate::map;
use crate::player::{Container, Inventory, PlayerData};
use crate::registry::CreatureRegistry;
use crate::scheduler::{CancellationToken, Scheduler, Task, TaskId, TaskSchedule};
use crate::service::{CreatureService, CreatureState};
use crate::species::EntityKind;
use crate::systems::breeding::{self, Breedable, BreedingPair, PairBook, PairId};
use crate::systems::targeting;

const PLAYER_MAX_HEALTH: f32 = 20.0;

/// Summary of one tick, handed to tick runner callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickResult {
    pub tick: u64,
    pub tasks_run: usize,
    pub creatures: usize,
    pub pairs: usize,
}

pub struct SimulationWorld {
    pub world: World,
    pub clock: Clock,
    pub config: SimulationConfig,
    pub(crate) scheduler: Scheduler,
    pub(crate) events: EventNode,
    pub(crate) registry: CreatureRegistry,
    pub(crate) rng: StdRng,
    pub(crate) pairs: PairBook,
    pub(crate) wild_spawn_task: Option<TaskId>,
    log: Vec<SimEvent>,
    loaded_chunks: HashSet<ChunkPos>,
}

fn creature_lookup(entity: Entity) -> impl FnOnce(ComponentError) -> WorldError {
    move |err| match err {
        ComponentError::NoSuchEntity => WorldError::NoSuchEntity(entity),
        ComponentError::MissingComponent(_) => WorldError::NotACreature(entity),
    }
}

fn player_lookup(entity: Entity) -> impl FnOnce(ComponentError) -> WorldError {
    move |err| match err {
        ComponentError::NoSuchEntity => WorldError::NoSuchEntity(entity),
        ComponentError::MissingComponent(_) => WorldError::NotAPlayer(entity),
    }
}

impl SimulationWorld {
    /// World with the built-in creature templates
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        let registry = CreatureRegistry::standard(config.level_range()?)?;
        Self::with_registry(config, registry)
    }

    /// Rejects an invalid config before anything is scheduled
    pub fn with_registry(
        config: SimulationConfig,
        registry: CreatureRegistry,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            world: World::new(),
            clock: Clock::default(),
            rng: StdRng::seed_from_u64(config.seed),
            config,
            scheduler: Scheduler::new(),
            events: EventNode::new(),
            registry,
            pairs: PairBook::default(),
            wild_spawn_task: None,
            log: Vec::new(),
            loaded_chunks: HashSet::new(),
        })
    }

    pub fn registry(&self) -> &CreatureRegistry {
        &self.registry
    }

    pub fn now(&self) -> u64 {
        self.clock.tick
    }

    // ========================================================================
    // Event log
    // ========================================================================

    pub(crate) fn record(&mut self, kind: SimEventKind) {
        self.log.push(SimEvent {
            tick: self.clock.tick,
            kind,
        });
    }

    pub fn events(&self) -> &[SimEvent] {
        &self.log
    }

    // ========================================================================
    // Placement
    // ========================================================================

    /// Insert a creature at a position. Placement completes on a later tick,
    /// delayed further when the chunk still has to load; only then does the
    /// creature's service attach.
    pub fn set_instance(&mut self, creature: Creature, position: Position) -> Entity {
        let kind = creature.species().kind();
        let health = Health::new(creature.attributes().max_health);
        let entity = self.world.spawn((
            creature,
            kind,
            position,
            health,
            Placement::Pending,
            Passengers::default(),
        ));

        let chunk = position.chunk(self.config.chunk_size);
        let delay = if self.loaded_chunks.contains(&chunk) {
            0
        } else {
            self.config.chunk_load_ticks
        };
        self.schedule(delay, Task::CompletePlacement { entity }, CancellationToken::new());
        debug!("placing {:?} at {:?} (chunk {:?}, delay {})", entity, position, chunk, delay);
        entity
    }

    pub(crate) fn complete_placement(&mut self, entity: Entity) {
        let (species, level, tamed, position) = {
            let Ok(creature) = self.world.get::<&Creature>(entity) else {
                debug!("placement of {:?} dropped, entity removed", entity);
                return;
            };
            let Ok(position) = self.world.get::<&Position>(entity) else {
                return;
            };
            (creature.species().clone(), creature.level(), creature.is_tamed(), *position)
        };

        self.loaded_chunks.insert(position.chunk(self.config.chunk_size));
        if let Ok(mut placement) = self.world.get::<&mut Placement>(entity) {
            *placement = Placement::Placed;
        }
        self.record(SimEventKind::CreaturePlaced {
            entity,
            species,
            level,
            tamed,
        });

        if let Err(err) = CreatureService::when_spawned(self, entity) {
            warn!("could not attach creature service to {:?}: {}", entity, err);
        }
    }

    pub fn is_placed(&self, entity: Entity) -> bool {
        self.world
            .get::<&Placement>(entity)
            .map(|p| *p == Placement::Placed)
            .unwrap_or(false)
    }

    pub fn is_chunk_loaded(&self, chunk: ChunkPos) -> bool {
        self.loaded_chunks.contains(&chunk)
    }

    pub fn position(&self, entity: Entity) -> Option<Position> {
        self.world.get::<&Position>(entity).ok().map(|p| *p)
    }

    pub fn set_position(&mut self, entity: Entity, position: Position) {
        if let Ok(mut current) = self.world.get::<&mut Position>(entity) {
            *current = position;
        }
    }

    pub fn kind(&self, entity: Entity) -> Option<EntityKind> {
        self.world.get::<&EntityKind>(entity).ok().map(|k| *k)
    }

    // ========================================================================
    // Players
    // ========================================================================

    /// Spawn a player and raise the join event
    pub fn join_player(&mut self, name: &str, position: Position) -> Entity {
        let entity = self.world.spawn((
            PlayerData::new(name),
            Inventory::new(),
            EntityKind::Player,
            position,
            Health::new(PLAYER_MAX_HEALTH),
        ));
        info!("player {} joined as {:?}", name, entity);
        self.dispatch(WorldEvent::PlayerJoin { player: entity });
        entity
    }

    pub fn is_player(&self, entity: Entity) -> bool {
        self.world.get::<&PlayerData>(entity).is_ok()
    }

    pub fn player(&self, entity: Entity) -> Result<Ref<'_, PlayerData>, WorldError> {
        self.world
            .get::<&PlayerData>(entity)
            .map_err(player_lookup(entity))
    }

    pub fn player_mut(&mut self, entity: Entity) -> Result<RefMut<'_, PlayerData>, WorldError> {
        self.world
            .get::<&mut PlayerData>(entity)
            .map_err(player_lookup(entity))
    }

    pub fn set_sneaking(&mut self, player: Entity, sneaking: bool) -> Result<(), WorldError> {
        self.player_mut(player)?.sneaking = sneaking;
        Ok(())
    }

    pub fn is_sneaking(&self, player: Entity) -> bool {
        self.player(player).map(|p| p.sneaking).unwrap_or(false)
    }

    pub fn send_message(&mut self, player: Entity, message: impl Into<String>) {
        if let Ok(mut data) = self.player_mut(player) {
            data.send_message(message);
        }
    }

    pub fn messages(&self, player: Entity) -> Vec<String> {
        self.player(player)
            .map(|p| p.messages.clone())
            .unwrap_or_default()
    }

    pub fn inventory(&self, player: Entity) -> Result<Ref<'_, Inventory>, WorldError> {
        self.world
            .get::<&Inventory>(player)
            .map_err(player_lookup(player))
    }

    pub fn inventory_mut(&mut self, player: Entity) -> Result<RefMut<'_, Inventory>, WorldError> {
        self.world
            .get::<&mut Inventory>(player)
            .map_err(player_lookup(player))
    }

    /// Give an item to a player. The item comes back when the inventory is
    /// full or the entity is not a player.
    pub fn add_item_stack(&mut self, player: Entity, item: ItemStack) -> Result<usize, ItemStack> {
        match self.world.get::<&mut Inventory>(player) {
            Ok(mut inventory) => inventory.add_item_stack(item),
            Err(_) => Err(item),
        }
    }

    pub fn open_container(&mut self, player: Entity, container: Container) {
        if let Ok(mut data) = self.player_mut(player) {
            data.open_container = Some(container);
        }
    }

    // ========================================================================
    // Input events
    // ========================================================================

    pub fn attack(&mut self, attacker: Entity, target: Entity) {
        self.dispatch(WorldEvent::EntityAttack { attacker, target });
    }

    pub fn interact_entity(&mut self, player: Entity, target: Entity, hand: Hand) {
        self.dispatch(WorldEvent::PlayerEntityInteract {
            player,
            target,
            hand,
        });
    }

    pub fn interact_block(&mut self, player: Entity, block: BlockPos, hand: Hand) {
        self.dispatch(WorldEvent::PlayerBlockInteract {
            player,
            block,
            hand,
        });
    }

    /// Run every listener for the event whose filter accepts it
    pub fn dispatch(&mut self, event: WorldEvent) {
        for listener in self.events.matching(event.kind()) {
            // An earlier handler may have removed this listener's creature
            if !self.events.contains(listener.id) {
                continue;
            }
            if (listener.filter)(self, listener.scope, &event) {
                (listener.handler)(self, listener.scope, &event);
            }
        }
    }

    pub fn subscribe(
        &mut self,
        kind: EventKind,
        scope: Option<Entity>,
        filter: EventFilter,
        handler: EventHandler,
    ) -> ListenerId {
        self.events.subscribe(kind, scope, filter, handler)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn listener_count(&self) -> usize {
        self.events.len()
    }

    /// Listeners scoped to one entity
    pub fn listeners_of(&self, entity: Entity) -> usize {
        self.events.scoped_to(entity)
    }

    // ========================================================================
    // Leashes & passengers
    // ========================================================================

    pub fn leash_holder(&self, entity: Entity) -> Option<Entity> {
        self.world.get::<&LeashHolder>(entity).ok().map(|h| h.0)
    }

    pub fn set_leash_holder(&mut self, entity: Entity, holder: Option<Entity>) {
        match holder {
            Some(holder) => {
                if self.world.insert_one(entity, LeashHolder(holder)).is_err() {
                    debug!("leash on missing entity {:?} ignored", entity);
                }
            }
            None => {
                // Not leashed is already the wanted state
                let _ = self.world.remove_one::<LeashHolder>(entity);
            }
        }
    }

    /// Entities whose leash the holder has, in spawn order
    pub fn leashed_by(&self, holder: Entity) -> Vec<Entity> {
        let mut leashed: Vec<Entity> = self
            .world
            .query::<&LeashHolder>()
            .iter()
            .filter(|(_, h)| h.0 == holder)
            .map(|(entity, _)| entity)
            .collect();
        leashed.sort_by_key(|entity| entity.id());
        leashed
    }

    pub fn add_passenger(&mut self, vehicle: Entity, passenger: Entity) {
        if let Ok(mut passengers) = self.world.get::<&mut Passengers>(vehicle) {
            if !passengers.0.contains(&passenger) {
                passengers.0.push(passenger);
            }
        }
        let _ = self.world.insert_one(passenger, Vehicle(vehicle));
    }

    pub fn passengers(&self, entity: Entity) -> Vec<Entity> {
        self.world
            .get::<&Passengers>(entity)
            .map(|p| p.0.clone())
            .unwrap_or_default()
    }

    pub fn label_text(&self, entity: Entity) -> Option<String> {
        self.passengers(entity)
            .into_iter()
            .find_map(|p| self.world.get::<&Label>(p).ok().map(|l| l.text.clone()))
    }

    // ========================================================================
    // Removal & damage
    // ========================================================================

    /// Remove an entity. Creatures detach their service first.
    pub fn remove(&mut self, entity: Entity, cause: RemovalCause) -> Result<(), WorldError> {
        if !self.world.contains(entity) {
            return Err(WorldError::NoSuchEntity(entity));
        }
        let is_creature = self.world.get::<&Creature>(entity).is_ok();
        if is_creature {
            CreatureService::when_no_longer_existing(self, entity);
        }
        for leashed in self.leashed_by(entity) {
            self.set_leash_holder(leashed, None);
        }
        for (_, data) in self.world.query_mut::<&mut PlayerData>() {
            data.placed.retain(|&placed| placed != entity);
            if data.target == Some(entity) {
                data.target = None;
            }
        }
        let _ = self.world.despawn(entity);

        if is_creature {
            debug!("removed creature {:?} ({:?})", entity, cause);
            self.record(SimEventKind::CreatureRemoved { entity, cause });
        }
        Ok(())
    }

    /// Apply damage to a living entity. Returns true if the hit was lethal.
    pub fn damage(
        &mut self,
        target: Entity,
        source: Option<Entity>,
        amount: f32,
    ) -> Result<bool, WorldError> {
        let tick = self.clock.tick;
        let lethal = {
            let mut health = self
                .world
                .get::<&mut Health>(target)
                .map_err(|_| WorldError::NoSuchEntity(target))?;
            health.damage(source, amount, tick)
        };
        if lethal {
            self.kill(target, source);
        }
        Ok(lethal)
    }

    /// Players die and respawn through the death event; anything else is removed
    pub fn kill(&mut self, entity: Entity, killer: Option<Entity>) {
        if self.is_player(entity) {
            self.dispatch(WorldEvent::PlayerDeath {
                player: entity,
                killer,
            });
        } else if let Err(err) = self.remove(entity, RemovalCause::Killed) {
            debug!("kill ignored: {}", err);
        }
    }

    pub fn health(&self, entity: Entity) -> Option<Health> {
        self.world.get::<&Health>(entity).ok().map(|h| *h)
    }

    // ========================================================================
    // Creature queries
    // ========================================================================

    pub fn creature(&self, entity: Entity) -> Result<Ref<'_, Creature>, WorldError> {
        self.world
            .get::<&Creature>(entity)
            .map_err(creature_lookup(entity))
    }

    pub fn creature_mut(&mut self, entity: Entity) -> Result<RefMut<'_, Creature>, WorldError> {
        self.world
            .get::<&mut Creature>(entity)
            .map_err(creature_lookup(entity))
    }

    /// Breeding capability view of an entity, if it is a creature
    pub fn breedable(&self, entity: Entity) -> Option<Breedable> {
        let creature = self.world.get::<&Creature>(entity).ok()?;
        Some(Breedable {
            entity,
            species: creature.species().clone(),
            male: creature.is_male(),
            tamed: creature.is_tamed(),
            pairing: creature.service().pairing(),
        })
    }

    pub fn creature_state(&self, entity: Entity) -> Option<CreatureState> {
        let creature = self.world.get::<&Creature>(entity).ok()?;
        let state = if !creature.is_tamed() {
            CreatureState::WildUntamed
        } else if let Some(pair) = creature.service().pairing() {
            CreatureState::TamedPaired(pair)
        } else if self.leash_holder(entity).is_some() {
            CreatureState::TamedLeashed
        } else {
            CreatureState::TamedIdle
        };
        Some(state)
    }

    pub fn creatures(&self) -> Vec<Entity> {
        let mut creatures: Vec<Entity> = self
            .world
            .query::<&Creature>()
            .iter()
            .map(|(entity, _)| entity)
            .collect();
        creatures.sort_by_key(|entity| entity.id());
        creatures
    }

    pub fn creature_count(&self) -> usize {
        self.world.query::<&Creature>().iter().count()
    }

    pub fn wild_creature_count(&self) -> usize {
        self.world
            .query::<&Creature>()
            .iter()
            .filter(|(_, creature)| !creature.is_tamed())
            .count()
    }

    pub fn pair(&self, id: PairId) -> Option<&BreedingPair> {
        self.pairs.get(id)
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    // ========================================================================
    // Ticking
    // ========================================================================

    pub(crate) fn schedule(
        &mut self,
        delay_ticks: u64,
        task: Task,
        token: CancellationToken,
    ) -> TaskId {
        self.scheduler.submit(self.clock.tick, delay_ticks, task, token)
    }

    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending()
    }

    pub fn is_task_pending(&self, id: TaskId) -> bool {
        self.scheduler.is_pending(id)
    }

    fn delay_of(&self, schedule: TaskSchedule) -> Option<u64> {
        match schedule {
            TaskSchedule::Stop => None,
            TaskSchedule::NextTick => Some(1),
            TaskSchedule::Ticks(ticks) => Some(ticks),
            TaskSchedule::Seconds(seconds) => Some(self.config.seconds_to_ticks(seconds)),
        }
    }

    fn run_task(&mut self, task: Task) -> TaskSchedule {
        match task {
            Task::CompletePlacement { entity } => {
                self.complete_placement(entity);
                TaskSchedule::Stop
            }
            Task::BreedingCountdown { pair } => breeding::run_countdown(self, pair),
            Task::SpawnWild => map::spawn_wild(self),
            Task::PlayerTargeting { player } => targeting::update_target(self, player),
        }
    }

    /// Advance the clock one tick and run every task that is due
    pub fn tick(&mut self) -> TickResult {
        self.clock.advance();
        let now = self.clock.tick;
        let mut tasks_run = 0;

        while let Some(entry) = self.scheduler.pop_due(now) {
            if entry.token.is_cancelled() {
                continue;
            }
            tasks_run += 1;
            let schedule = self.run_task(entry.task);
            if entry.token.is_cancelled() {
                continue;
            }
            if let Some(delay) = self.delay_of(schedule) {
                self.scheduler.requeue(now, delay, entry);
            }
        }

        TickResult {
            tick: now,
            tasks_run,
            creatures: self.creature_count(),
            pairs: self.pairs.len(),
        }
    }

    pub fn advance_ticks(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    pub fn advance_seconds(&mut self, seconds: u32) {
        self.advance_ticks(self.config.seconds_to_ticks(seconds));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creature::LevelRange;
    use crate::testing::{bull_config, settle, test_world};

    fn bull(level: u32, male: bool) -> Creature {
        Creature::tamed(&bull_config(), level, male).unwrap()
    }

    fn at(x: f64) -> Position {
        Position::new(x, 50.0, 1.0)
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let no_area = SimulationConfig {
            spawn_area: 0,
            ..SimulationConfig::default()
        };
        assert!(matches!(SimulationWorld::new(no_area), Err(ConfigError::SpawnArea(_))));

        let inverted = SimulationConfig {
            min_level: 10,
            max_level: 5,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            SimulationWorld::new(inverted),
            Err(ConfigError::LevelRange { min: 10, max: 5 })
        ));

        let stopped = SimulationConfig {
            ticks_per_second: 0,
            ..SimulationConfig::default()
        };
        let registry = CreatureRegistry::new(LevelRange::new(1, 5).unwrap());
        assert!(matches!(
            SimulationWorld::with_registry(stopped, registry),
            Err(ConfigError::ZeroTickRate)
        ));
    }

    #[test]
    fn test_placement_is_asynchronous() {
        let mut sim = test_world();
        let creature = Creature::tamed(&bull_config(), 3, true).unwrap();
        let entity = sim.set_instance(creature, Position::new(5.0, 50.0, 5.0));

        assert!(!sim.is_placed(entity));
        assert_eq!(sim.listeners_of(entity), 0);
        assert!(sim.passengers(entity).is_empty());

        settle(&mut sim);
        assert!(sim.is_placed(entity));
        assert_eq!(sim.listeners_of(entity), 2);
        assert_eq!(sim.label_text(entity).as_deref(), Some("Bull | 3"));
        assert!(sim.is_chunk_loaded(ChunkPos(0, 0)));
    }

    #[test]
    fn test_loaded_chunk_places_next_tick() {
        let mut sim = test_world();
        let first = sim.set_instance(bull(1, true), at(1.0));
        settle(&mut sim);
        assert!(sim.is_placed(first));

        let second = sim.set_instance(bull(1, true), Position::new(2.0, 50.0, 2.0));
        sim.tick();
        assert!(sim.is_placed(second));
    }

    #[test]
    fn test_removed_before_placement_never_attaches() {
        let mut sim = test_world();
        let entity = sim.set_instance(bull(1, true), at(1.0));
        sim.remove(entity, RemovalCause::Despawned).unwrap();
        settle(&mut sim);

        assert_eq!(sim.listener_count(), 0);
        assert_eq!(sim.creature_count(), 0);
        assert_eq!(sim.world.len(), 0);
    }

    #[test]
    fn test_removal_detaches_everything() {
        let mut sim = test_world();
        let entity = sim.set_instance(bull(1, true), at(1.0));
        settle(&mut sim);
        let label = sim.passengers(entity)[0];

        sim.remove(entity, RemovalCause::Despawned).unwrap();
        assert_eq!(sim.listener_count(), 0);
        assert!(!sim.world.contains(label));
        assert_eq!(
            sim.remove(entity, RemovalCause::Despawned),
            Err(WorldError::NoSuchEntity(entity))
        );
    }

    #[test]
    fn test_leash_bookkeeping() {
        let mut sim = test_world();
        let player = sim.join_player("Steve", Position::new(0.0, 50.0, 0.0));
        let a = sim.set_instance(bull(1, true), at(1.0));
        let b = sim.set_instance(bull(1, false), at(2.0));

        sim.set_leash_holder(b, Some(player));
        sim.set_leash_holder(a, Some(player));
        assert_eq!(sim.leashed_by(player), vec![a, b]);

        sim.set_leash_holder(a, None);
        sim.set_leash_holder(a, None);
        assert_eq!(sim.leash_holder(a), None);
        assert_eq!(sim.leashed_by(player), vec![b]);
    }

    #[test]
    fn test_removal_forgets_placed_and_marked() {
        let mut sim = test_world();
        let player = sim.join_player("Steve", Position::new(0.0, 50.0, 0.0));
        let placed = sim.set_instance(bull(1, true), at(1.0));
        let marked = sim.set_instance(bull(1, false), at(2.0));
        {
            let mut data = sim.player_mut(player).unwrap();
            data.placed.push(placed);
            data.target = Some(marked);
        }

        sim.remove(placed, RemovalCause::Recalled).unwrap();
        sim.remove(marked, RemovalCause::Killed).unwrap();
        let data = sim.player(player).unwrap();
        assert!(data.placed.is_empty());
        assert_eq!(data.target, None);
    }

    #[test]
    fn test_lookup_errors() {
        let mut sim = test_world();
        let player = sim.join_player("Alex", Position::new(0.0, 50.0, 0.0));
        assert!(matches!(
            sim.creature(player),
            Err(WorldError::NotACreature(e)) if e == player
        ));

        let creature = sim.set_instance(bull(1, true), at(1.0));
        assert!(matches!(sim.inventory(creature), Err(WorldError::NotAPlayer(_))));
        assert!(sim.add_item_stack(creature, ItemStack::new("minecraft:stone")).is_err());
    }

    #[test]
    fn test_tick_result() {
        let mut sim = test_world();
        sim.set_instance(bull(1, true), at(1.0));
        sim.advance_ticks(sim.config.chunk_load_ticks - 1);
        let result = sim.tick();
        assert_eq!(result.tick, sim.config.chunk_load_ticks);
        assert_eq!(result.tasks_run, 1);
        assert_eq!(result.creatures, 1);
        assert_eq!(sim.pending_tasks(), 0);
    }
}
