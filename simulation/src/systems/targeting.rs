//! Targeting System
//!
//! While a player sneaks, a once-a-second pass marks the nearest living entity
//! in sight. The player's own placed creatures are never marked. A marked
//! entity glows on the enemy team and the player's reach is stretched so it
//! can be clicked from afar. A main-hand entity interaction then sends every
//! creature the player placed after the mark.

use hecs::Entity;
use tracing::{debug, info};

use crate::components::{AiGoal, Glowing, Health, Position, Team};
use crate::events::SimEventKind;
use crate::player::DEFAULT_INTERACTION_RANGE;
use crate::scheduler::{CancellationToken, Task, TaskSchedule};
use crate::world::SimulationWorld;

pub const ENEMY_TEAM: &str = "enemy";
/// Farthest entity a sneaking player can mark
pub const SIGHT_RANGE: f64 = 75.0;
/// Player reach while a target is marked
pub const MARKED_INTERACTION_RANGE: f64 = 10_000.0;
/// Range of the goals handed out by a command
pub const COMMAND_RANGE: f32 = 15.0;

/// Start the marking task for a player that just joined
pub fn start(sim: &mut SimulationWorld, player: Entity) {
    let delay = sim.config.seconds_to_ticks(1);
    sim.schedule(delay, Task::PlayerTargeting { player }, CancellationToken::new());
    debug!("targeting started for {:?}", player);
}

/// One marking pass. Stops once the player is gone.
pub(crate) fn update_target(sim: &mut SimulationWorld, player: Entity) -> TaskSchedule {
    let next = TaskSchedule::Seconds(1);
    let (sneaking, previous, placed) = match sim.player(player) {
        Ok(data) => (data.sneaking, data.target, data.placed.clone()),
        Err(_) => return TaskSchedule::Stop,
    };
    let Some(position) = sim.position(player) else {
        return TaskSchedule::Stop;
    };
    if !sneaking {
        clear_target(sim, player);
        return next;
    }

    let Some(looking_at) = nearest_living(sim, player, position, &placed) else {
        clear_target(sim, player);
        return next;
    };
    // Switching targets takes a pass with nothing marked
    if previous.is_some_and(|previous| previous != looking_at) {
        clear_target(sim, player);
        return next;
    }
    mark(sim, player, looking_at);
    next
}

fn nearest_living(
    sim: &SimulationWorld,
    player: Entity,
    from: Position,
    placed: &[Entity],
) -> Option<Entity> {
    let nearest = sim
        .world
        .query::<(&Health, &Position)>()
        .iter()
        .filter(|(entity, (health, _))| {
            *entity != player && health.current > 0.0 && !placed.contains(entity)
        })
        .map(|(entity, (_, position))| (entity, from.distance(position)))
        .filter(|(_, distance)| *distance <= SIGHT_RANGE)
        .min_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.id().cmp(&b.0.id())))
        .map(|(entity, _)| entity);
    nearest
}

fn mark(sim: &mut SimulationWorld, player: Entity, target: Entity) {
    if sim
        .world
        .insert(target, (Glowing, Team(ENEMY_TEAM.to_string())))
        .is_err()
    {
        return;
    }
    let changed = match sim.player_mut(player) {
        Ok(mut data) => {
            data.interaction_range = MARKED_INTERACTION_RANGE;
            data.target.replace(target) != Some(target)
        }
        Err(_) => return,
    };
    if changed {
        debug!("{:?} marked {:?}", player, target);
        sim.record(SimEventKind::TargetChanged {
            player,
            target: Some(target),
        });
    }
}

fn clear_target(sim: &mut SimulationWorld, player: Entity) {
    let previous = match sim.player_mut(player) {
        Ok(mut data) => {
            data.interaction_range = DEFAULT_INTERACTION_RANGE;
            data.target.take()
        }
        Err(_) => return,
    };
    if let Some(previous) = previous {
        let _ = sim.world.remove_one::<Glowing>(previous);
        sim.record(SimEventKind::TargetChanged {
            player,
            target: None,
        });
    }
}

/// Give every creature the player placed a melee goal aimed at the player's
/// mark, or at whoever hits it. Returns how many creatures were commanded.
pub fn command_placed(sim: &mut SimulationWorld, player: Entity) -> usize {
    let placed = match sim.player(player) {
        Ok(data) => data.placed.clone(),
        Err(_) => return 0,
    };

    let mut commanded = 0;
    for entity in placed {
        let Ok(mut creature) = sim.creature_mut(entity) else {
            continue;
        };
        creature.add_goal(AiGoal::MeleeAttack {
            speed: 0.5,
            delay_ticks: 10,
        });
        creature.add_goal(AiGoal::TargetLastDamager {
            range: COMMAND_RANGE,
        });
        creature.add_goal(AiGoal::TargetOwnerMark {
            owner: player,
            range: COMMAND_RANGE,
        });
        commanded += 1;
    }

    if commanded > 0 {
        info!("{:?} commanded {} creatures", player, commanded);
        sim.record(SimEventKind::CreaturesCommanded {
            player,
            creatures: commanded,
        });
    }
    commanded
}

/// Entity a commanded creature should attack: its owner's mark, if in range
pub fn marked_target(sim: &SimulationWorld, creature: Entity) -> Option<Entity> {
    let (owner, range) = sim
        .creature(creature)
        .ok()?
        .goals()
        .iter()
        .find_map(|goal| match *goal {
            AiGoal::TargetOwnerMark { owner, range } => Some((owner, range)),
            _ => None,
        })?;
    let target = sim.player(owner).ok()?.target?;
    let from = sim.position(creature)?;
    let distance = from.distance(&sim.position(target)?);
    (distance <= range as f64).then_some(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creature::Creature;
    use crate::testing::{bull_config, place, test_world};

    fn bull(level: u32) -> Creature {
        Creature::tamed(&bull_config(), level, true).unwrap()
    }

    fn glowing(sim: &SimulationWorld, entity: Entity) -> bool {
        sim.world.get::<&Glowing>(entity).is_ok()
    }

    #[test]
    fn test_sneaking_marks_nearest_stranger() {
        let mut sim = test_world();
        let player = sim.join_player("Steve", Position::new(0.0, 50.0, 1.0));
        start(&mut sim, player);
        let own = place(&mut sim, bull(3), 1.0);
        let near = place(&mut sim, bull(3), 4.0);
        let far = place(&mut sim, bull(3), 9.0);
        sim.player_mut(player).unwrap().placed.push(own);

        sim.set_sneaking(player, true).unwrap();
        sim.advance_seconds(1);

        let data = sim.player(player).unwrap();
        assert_eq!(data.target, Some(near));
        assert_eq!(data.interaction_range, MARKED_INTERACTION_RANGE);
        drop(data);
        assert!(glowing(&sim, near));
        assert!(!glowing(&sim, own));
        assert!(!glowing(&sim, far));
        assert_eq!(
            sim.world.get::<&Team>(near).map(|t| t.0.clone()).ok().as_deref(),
            Some(ENEMY_TEAM)
        );
    }

    #[test]
    fn test_release_sneak_clears_mark() {
        let mut sim = test_world();
        let player = sim.join_player("Steve", Position::new(0.0, 50.0, 1.0));
        start(&mut sim, player);
        let near = place(&mut sim, bull(3), 4.0);
        sim.set_sneaking(player, true).unwrap();
        sim.advance_seconds(1);
        assert!(glowing(&sim, near));

        sim.set_sneaking(player, false).unwrap();
        sim.advance_seconds(1);
        let data = sim.player(player).unwrap();
        assert_eq!(data.target, None);
        assert_eq!(data.interaction_range, DEFAULT_INTERACTION_RANGE);
        drop(data);
        assert!(!glowing(&sim, near));
    }

    #[test]
    fn test_switching_target_takes_a_pass() {
        let mut sim = test_world();
        let player = sim.join_player("Steve", Position::new(0.0, 50.0, 1.0));
        start(&mut sim, player);
        let first = place(&mut sim, bull(3), 4.0);
        sim.set_sneaking(player, true).unwrap();
        sim.advance_seconds(1);

        let second = place(&mut sim, bull(3), 2.0);
        sim.advance_seconds(1);
        assert_eq!(sim.player(player).unwrap().target, None);
        assert!(!glowing(&sim, first));

        sim.advance_seconds(1);
        assert_eq!(sim.player(player).unwrap().target, Some(second));
    }

    #[test]
    fn test_nothing_in_sight() {
        let mut sim = test_world();
        let player = sim.join_player("Steve", Position::new(0.0, 50.0, 1.0));
        start(&mut sim, player);
        place(&mut sim, bull(3), SIGHT_RANGE + 10.0);
        sim.set_sneaking(player, true).unwrap();
        sim.advance_seconds(3);
        assert_eq!(sim.player(player).unwrap().target, None);
    }

    #[test]
    fn test_task_stops_with_player() {
        let mut sim = test_world();
        let player = sim.join_player("Steve", Position::new(0.0, 50.0, 1.0));
        start(&mut sim, player);
        assert_eq!(sim.pending_tasks(), 1);

        let _ = sim.world.despawn(player);
        sim.advance_seconds(2);
        assert_eq!(sim.pending_tasks(), 0);
    }

    #[test]
    fn test_command_aims_placed_creatures() {
        let mut sim = test_world();
        let player = sim.join_player("Steve", Position::new(0.0, 50.0, 1.0));
        start(&mut sim, player);
        let own = place(&mut sim, bull(3), 1.0);
        let enemy = place(&mut sim, bull(3), 6.0);
        sim.player_mut(player).unwrap().placed.push(own);
        assert_eq!(marked_target(&sim, own), None);

        sim.set_sneaking(player, true).unwrap();
        sim.advance_seconds(1);
        assert_eq!(command_placed(&mut sim, player), 1);

        let goals = sim.creature(own).unwrap().goals().to_vec();
        assert!(goals.contains(&AiGoal::MeleeAttack {
            speed: 0.5,
            delay_ticks: 10
        }));
        assert!(goals.contains(&AiGoal::TargetOwnerMark {
            owner: player,
            range: COMMAND_RANGE
        }));
        assert_eq!(marked_target(&sim, own), Some(enemy));
        assert_eq!(sim.creature(enemy).unwrap().goals().len(), 1);

        // Commanding twice adds nothing new
        command_placed(&mut sim, player);
        assert_eq!(sim.creature(own).unwrap().goals().len(), goals.len());
    }
}
