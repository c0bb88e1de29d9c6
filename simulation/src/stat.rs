//! Stats - progressable numeric attributes carried by every creature

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Stat
// ============================================================================

/// A numeric attribute with a fixed base and discrete upgrade steps.
///
/// `current_value` is always recomputed as
/// `base_value + upgrade_points * increment_per_upgrade` rather than
/// accumulated, so a stat rebuilt from its parts is bit-identical.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    base_value: f32,
    current_value: f32,
    increment_per_upgrade: f32,
    upgrade_points: u32,
}

impl Stat {
    /// Unused stat slot (e.g. wild creatures that never use stamina)
    pub const EMPTY: Stat = Stat {
        base_value: 0.0,
        current_value: 0.0,
        increment_per_upgrade: 0.0,
        upgrade_points: 0,
    };

    pub const fn new(base_value: f32, increment_per_upgrade: f32) -> Self {
        Self {
            base_value,
            current_value: base_value,
            increment_per_upgrade,
            upgrade_points: 0,
        }
    }

    /// Rebuild a stat that has already been upgraded `upgrade_points` times.
    pub fn restore(base_value: f32, increment_per_upgrade: f32, upgrade_points: u32) -> Self {
        Self {
            base_value,
            current_value: Self::value_at(base_value, increment_per_upgrade, upgrade_points),
            increment_per_upgrade,
            upgrade_points,
        }
    }

    /// Spend one upgrade point. Point budgets are the caller's concern.
    pub fn upgrade(&mut self) {
        self.upgrade_points += 1;
        self.current_value =
            Self::value_at(self.base_value, self.increment_per_upgrade, self.upgrade_points);
    }

    fn value_at(base: f32, increment: f32, points: u32) -> f32 {
        base + points as f32 * increment
    }

    pub fn base_value(&self) -> f32 {
        self.base_value
    }

    pub fn current_value(&self) -> f32 {
        self.current_value
    }

    pub fn increment_per_upgrade(&self) -> f32 {
        self.increment_per_upgrade
    }

    pub fn upgrade_points(&self) -> u32 {
        self.upgrade_points
    }
}

impl Default for Stat {
    fn default() -> Self {
        Self::EMPTY
    }
}

// ============================================================================
// Stat kinds and the core stat bundle
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatKind {
    Health,
    Stamina,
    Oxygen,
    Food,
    Weight,
    Melee,
    Speed,
}

impl StatKind {
    pub const ALL: [StatKind; 7] = [
        StatKind::Health,
        StatKind::Stamina,
        StatKind::Oxygen,
        StatKind::Food,
        StatKind::Weight,
        StatKind::Melee,
        StatKind::Speed,
    ];

    /// Stable key used in item tags
    pub const fn as_str(&self) -> &'static str {
        match self {
            StatKind::Health => "health",
            StatKind::Stamina => "stamina",
            StatKind::Oxygen => "oxygen",
            StatKind::Food => "food",
            StatKind::Weight => "weight",
            StatKind::Melee => "melee",
            StatKind::Speed => "speed",
        }
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The seven stats every creature carries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreatureStats {
    pub health: Stat,
    pub stamina: Stat,
    pub oxygen: Stat,
    pub food: Stat,
    pub weight: Stat,
    pub melee: Stat,
    pub speed: Stat,
}

impl CreatureStats {
    pub fn get(&self, kind: StatKind) -> &Stat {
        match kind {
            StatKind::Health => &self.health,
            StatKind::Stamina => &self.stamina,
            StatKind::Oxygen => &self.oxygen,
            StatKind::Food => &self.food,
            StatKind::Weight => &self.weight,
            StatKind::Melee => &self.melee,
            StatKind::Speed => &self.speed,
        }
    }

    pub fn get_mut(&mut self, kind: StatKind) -> &mut Stat {
        match kind {
            StatKind::Health => &mut self.health,
            StatKind::Stamina => &mut self.stamina,
            StatKind::Oxygen => &mut self.oxygen,
            StatKind::Food => &mut self.food,
            StatKind::Weight => &mut self.weight,
            StatKind::Melee => &mut self.melee,
            StatKind::Speed => &mut self.speed,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (StatKind, &Stat)> + '_ {
        StatKind::ALL.iter().map(move |kind| (*kind, self.get(*kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upgrade_twice() {
        let mut stat = Stat::new(20.0, 5.0);
        stat.upgrade();
        stat.upgrade();
        assert_eq!(stat.current_value(), 30.0);
        assert_eq!(stat.upgrade_points(), 2);
        assert_eq!(stat.base_value(), 20.0);
    }

    #[test]
    fn test_current_follows_formula() {
        let mut stat = Stat::new(0.1, 0.3);
        for n in 1..=50u32 {
            stat.upgrade();
            assert_eq!(stat.upgrade_points(), n);
            assert_eq!(stat.current_value(), 0.1 + n as f32 * 0.3);
        }
    }

    #[test]
    fn test_restore_matches_upgraded() {
        let mut stat = Stat::new(7.5, 1.25);
        for _ in 0..13 {
            stat.upgrade();
        }
        assert_eq!(Stat::restore(7.5, 1.25, 13), stat);
    }

    #[test]
    fn test_empty_equals_fresh_zero() {
        assert_eq!(Stat::EMPTY, Stat::new(0.0, 0.0));
        assert_eq!(
            serde_json::to_string(&Stat::EMPTY).unwrap(),
            serde_json::to_string(&Stat::new(0.0, 0.0)).unwrap()
        );
    }
}
