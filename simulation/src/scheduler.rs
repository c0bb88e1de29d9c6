//! Task Scheduler - delayed and repeating tasks on the world tick
//!
//! Tasks are plain data ordered by `(tick, sequence)`, so two tasks due on the
//! same tick always run in submission order. A task that returns
//! [`TaskSchedule::Stop`] is dropped; anything else puts it back in the queue.
//! Each task carries a [`CancellationToken`] that is checked before every run.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use crate::systems::breeding::PairId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

/// Work the world knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Finish an asynchronous placement and attach creature behaviour
    CompletePlacement { entity: hecs::Entity },
    /// One second of a pair's breeding countdown
    BreedingCountdown { pair: PairId },
    /// Periodic wild creature spawn
    SpawnWild,
    /// Once-a-second target marking for a sneaking player
    PlayerTargeting { player: hecs::Entity },
}

/// What a task wants after it ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSchedule {
    Stop,
    NextTick,
    Ticks(u64),
    Seconds(u32),
}

/// Shared flag that stops a task before its next run
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::Acquire)
    }
}

#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub tick: u64,
    pub sequence: u64,
    pub id: TaskId,
    pub task: Task,
    pub token: CancellationToken,
}

// Min-heap on (tick, sequence); BinaryHeap is a max-heap so ordering is reversed.
impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick && self.sequence == other.sequence
    }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .tick
            .cmp(&self.tick)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

#[derive(Debug, Default)]
pub struct Scheduler {
    heap: BinaryHeap<ScheduledTask>,
    next_sequence: u64,
    next_id: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a task to run `delay` ticks after `now`.
    pub fn submit(&mut self, now: u64, delay: u64, task: Task, token: CancellationToken) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.push(now + delay, id, task, token);
        id
    }

    /// Put a task that just ran back in the queue. Always at least one tick
    /// ahead so a tick's run loop terminates.
    pub fn requeue(&mut self, now: u64, delay: u64, entry: ScheduledTask) {
        self.push(now + delay.max(1), entry.id, entry.task, entry.token);
    }

    fn push(&mut self, tick: u64, id: TaskId, task: Task, token: CancellationToken) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(ScheduledTask {
            tick,
            sequence,
            id,
            task,
            token,
        });
    }

    /// Pop the next task due at or before `now`
    pub fn pop_due(&mut self, now: u64) -> Option<ScheduledTask> {
        if self.heap.peek().is_some_and(|e| e.tick <= now) {
            self.heap.pop()
        } else {
            None
        }
    }

    /// Tasks still waiting that have not been cancelled
    pub fn pending(&self) -> usize {
        self.heap.iter().filter(|e| !e.token.is_cancelled()).count()
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.heap
            .iter()
            .any(|e| e.id == id && !e.token.is_cancelled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_due_order() {
        let mut scheduler = Scheduler::new();
        let late = scheduler.submit(0, 5, Task::SpawnWild, CancellationToken::new());
        let early = scheduler.submit(0, 1, Task::SpawnWild, CancellationToken::new());
        let same_tick = scheduler.submit(0, 1, Task::SpawnWild, CancellationToken::new());

        assert!(scheduler.pop_due(0).is_none());
        assert_eq!(scheduler.pop_due(1).map(|e| e.id), Some(early));
        assert_eq!(scheduler.pop_due(1).map(|e| e.id), Some(same_tick));
        assert!(scheduler.pop_due(4).is_none());
        assert_eq!(scheduler.pop_due(5).map(|e| e.id), Some(late));
    }

    #[test]
    fn test_cancelled_tasks_not_pending() {
        let mut scheduler = Scheduler::new();
        let token = CancellationToken::new();
        let id = scheduler.submit(0, 1, Task::SpawnWild, token.clone());
        assert!(scheduler.is_pending(id));

        token.cancel();
        assert!(!scheduler.is_pending(id));
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_requeue_keeps_identity() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.submit(0, 0, Task::SpawnWild, CancellationToken::new());
        let entry = scheduler.pop_due(0).unwrap();
        scheduler.requeue(0, 0, entry);

        assert!(scheduler.pop_due(0).is_none());
        assert_eq!(scheduler.pop_due(1).map(|e| e.id), Some(id));
    }
}
