//! World events
//!
//! Two related things live here:
//! - `WorldEvent` / `EventNode`: input events raised by players and entities,
//!   routed to subscribed listeners (per-creature or world-wide).
//! - `SimEvent`: what happened, recorded for the host to read back
//!   (chat, logs, tests).

use hecs::Entity;

use crate::components::{BlockPos, Hand};
use crate::species::Species;
use crate::systems::breeding::{PairBreak, PairId, PairRejection};
use crate::world::SimulationWorld;

// ============================================================================
// Input events
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    EntityAttack,
    PlayerEntityInteract,
    PlayerBlockInteract,
    PlayerJoin,
    PlayerDeath,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorldEvent {
    EntityAttack {
        attacker: Entity,
        target: Entity,
    },
    PlayerEntityInteract {
        player: Entity,
        target: Entity,
        hand: Hand,
    },
    PlayerBlockInteract {
        player: Entity,
        block: BlockPos,
        hand: Hand,
    },
    PlayerJoin {
        player: Entity,
    },
    PlayerDeath {
        player: Entity,
        killer: Option<Entity>,
    },
}

impl WorldEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            WorldEvent::EntityAttack { .. } => EventKind::EntityAttack,
            WorldEvent::PlayerEntityInteract { .. } => EventKind::PlayerEntityInteract,
            WorldEvent::PlayerBlockInteract { .. } => EventKind::PlayerBlockInteract,
            WorldEvent::PlayerJoin { .. } => EventKind::PlayerJoin,
            WorldEvent::PlayerDeath { .. } => EventKind::PlayerDeath,
        }
    }

    /// Entity the event acts on, if any
    pub fn target(&self) -> Option<Entity> {
        match self {
            WorldEvent::EntityAttack { target, .. } => Some(*target),
            WorldEvent::PlayerEntityInteract { target, .. } => Some(*target),
            _ => None,
        }
    }
}

/// Decides whether a listener sees an event. Receives the listener's scope.
pub type EventFilter = fn(&SimulationWorld, Option<Entity>, &WorldEvent) -> bool;
pub type EventHandler = fn(&mut SimulationWorld, Option<Entity>, &WorldEvent);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

#[derive(Clone, Copy)]
pub struct Listener {
    pub id: ListenerId,
    pub kind: EventKind,
    /// Entity this listener belongs to; `None` for world-wide listeners
    pub scope: Option<Entity>,
    pub filter: EventFilter,
    pub handler: EventHandler,
}

#[derive(Default)]
pub struct EventNode {
    listeners: Vec<Listener>,
    next_id: u64,
}

impl EventNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        kind: EventKind,
        scope: Option<Entity>,
        filter: EventFilter,
        handler: EventHandler,
    ) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push(Listener {
            id,
            kind,
            scope,
            filter,
            handler,
        });
        id
    }

    /// Returns false if the listener was not subscribed
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() != before
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.listeners.iter().any(|l| l.id == id)
    }

    /// Snapshot of listeners for an event kind, in subscription order
    pub fn matching(&self, kind: EventKind) -> Vec<Listener> {
        self.listeners
            .iter()
            .filter(|l| l.kind == kind)
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn scoped_to(&self, entity: Entity) -> usize {
        self.listeners
            .iter()
            .filter(|l| l.scope == Some(entity))
            .count()
    }
}

// ============================================================================
// Simulation output
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SimEvent {
    pub tick: u64,
    pub kind: SimEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    Tamed,
    Recalled,
    Killed,
    Despawned,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimEventKind {
    CreaturePlaced {
        entity: Entity,
        species: Species,
        level: u32,
        tamed: bool,
    },
    TamingHit {
        creature: Entity,
        player: Entity,
        times_hit: u32,
        level: u32,
    },
    CreatureTamed {
        creature: Entity,
        player: Entity,
        species: Species,
    },
    CreatureRecalled {
        creature: Entity,
        player: Entity,
    },
    Leashed {
        creature: Entity,
        holder: Entity,
    },
    Unleashed {
        creature: Entity,
    },
    PairEvaluated {
        initiator: Entity,
        partner: Entity,
        rejection: Option<PairRejection>,
    },
    PairFormed {
        pair: PairId,
        initiator: Entity,
        partner: Entity,
    },
    PairBroken {
        pair: PairId,
        reason: PairBreak,
    },
    BreedingProgress {
        pair: PairId,
        remaining: u32,
    },
    OffspringBorn {
        pair: PairId,
        offspring: Entity,
        species: Species,
        level: u32,
    },
    CreatureRemoved {
        entity: Entity,
        cause: RemovalCause,
    },
    ContainerOpened {
        player: Entity,
        creature: Entity,
    },
    PlayerDied {
        player: Entity,
        message: String,
    },
    ItemRejected {
        player: Entity,
        reason: String,
    },
    TargetChanged {
        player: Entity,
        target: Option<Entity>,
    },
    CreaturesCommanded {
        player: Entity,
        creatures: usize,
    },
}
