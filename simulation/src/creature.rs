//! Creature aggregate
//!
//! A creature is built from a [`CreatureConfig`] through one of two factories:
//! [`Creature::wild`] rolls level and gender, [`Creature::tamed`] takes them
//! explicitly (item decoding, offspring). Behaviour lives in
//! [`CreatureService`]; the creature only owns data.

use rand::Rng;

use crate::components::{AiGoal, Attributes, Tag, Tags};
use crate::error::{ConfigError, CreatureError};
use crate::service::CreatureService;
use crate::species::Species;
use crate::stat::{CreatureStats, Stat, StatKind};

/// Seconds left before a paired creature produces offspring
pub const BREEDING_TIME_REMAINING: Tag<u32> = Tag::new("breeding_time_remaining");

/// Post-construction hook, applied in order after defaults are installed
pub type BehaviorInstaller = fn(&mut Creature);

const DEFAULT_STROLL_RADIUS: u32 = 20;

// ============================================================================
// Level draw
// ============================================================================

/// Inclusive range wild levels are drawn from. Never empty, never below 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelRange {
    min: u32,
    max: u32,
}

impl LevelRange {
    pub fn new(min: u32, max: u32) -> Result<Self, ConfigError> {
        if min == 0 || max < min {
            return Err(ConfigError::LevelRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// `min + floor(u^5 * (max - min + 1))`, heavily biased towards `min`.
    pub fn roll<R: Rng>(&self, rng: &mut R) -> u32 {
        let u: f64 = rng.gen();
        self.level_at(u)
    }

    fn level_at(&self, u: f64) -> u32 {
        let span = (self.max - self.min + 1) as f64;
        let offset = (u.powi(5) * span).floor() as u32;
        // u is in [0, 1), the clamp only guards float edge cases
        (self.min + offset).min(self.max)
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Everything needed to construct a creature. All seven core stats are
/// required, even for wild creatures: tamed descendants inherit them.
#[derive(Debug, Clone)]
pub struct CreatureConfig {
    pub species: Species,
    /// Seconds a pair of this creature needs to breed
    pub breed_time: u32,
    pub health: Option<Stat>,
    pub stamina: Option<Stat>,
    pub oxygen: Option<Stat>,
    pub food: Option<Stat>,
    pub weight: Option<Stat>,
    pub melee: Option<Stat>,
    pub speed: Option<Stat>,
    pub additional_stats: Vec<Stat>,
    /// Overrides the random level roll of wild creatures
    pub level: Option<u32>,
    /// Overrides the coin flip of wild creatures
    pub male: Option<bool>,
    pub installers: Vec<BehaviorInstaller>,
}

impl CreatureConfig {
    pub fn new(species: Species, breed_time: u32) -> Self {
        Self {
            species,
            breed_time,
            health: None,
            stamina: None,
            oxygen: None,
            food: None,
            weight: None,
            melee: None,
            speed: None,
            additional_stats: Vec::new(),
            level: None,
            male: None,
            installers: Vec::new(),
        }
    }

    /// Config that reproduces an existing creature's species and stats
    pub fn inherit(parent: &Creature) -> Self {
        let stats = parent.stats();
        let mut config = Self::new(parent.species().clone(), parent.breed_time());
        for (kind, stat) in stats.iter() {
            config = config.stat(kind, *stat);
        }
        config.additional_stats = parent.additional_stats().to_vec();
        config
    }

    pub fn stat(mut self, kind: StatKind, stat: Stat) -> Self {
        *self.slot_mut(kind) = Some(stat);
        self
    }

    pub fn health(self, stat: Stat) -> Self {
        self.stat(StatKind::Health, stat)
    }

    pub fn stamina(self, stat: Stat) -> Self {
        self.stat(StatKind::Stamina, stat)
    }

    pub fn oxygen(self, stat: Stat) -> Self {
        self.stat(StatKind::Oxygen, stat)
    }

    pub fn food(self, stat: Stat) -> Self {
        self.stat(StatKind::Food, stat)
    }

    pub fn weight(self, stat: Stat) -> Self {
        self.stat(StatKind::Weight, stat)
    }

    pub fn melee(self, stat: Stat) -> Self {
        self.stat(StatKind::Melee, stat)
    }

    pub fn speed(self, stat: Stat) -> Self {
        self.stat(StatKind::Speed, stat)
    }

    pub fn additional_stat(mut self, stat: Stat) -> Self {
        self.additional_stats.push(stat);
        self
    }

    pub fn level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn male(mut self, male: bool) -> Self {
        self.male = Some(male);
        self
    }

    pub fn installer(mut self, installer: BehaviorInstaller) -> Self {
        self.installers.push(installer);
        self
    }

    fn slot(&self, kind: StatKind) -> Option<Stat> {
        match kind {
            StatKind::Health => self.health,
            StatKind::Stamina => self.stamina,
            StatKind::Oxygen => self.oxygen,
            StatKind::Food => self.food,
            StatKind::Weight => self.weight,
            StatKind::Melee => self.melee,
            StatKind::Speed => self.speed,
        }
    }

    fn slot_mut(&mut self, kind: StatKind) -> &mut Option<Stat> {
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

    /// Check every required stat is present
    pub fn validate(&self) -> Result<CreatureStats, CreatureError> {
        let require = |kind: StatKind| {
            self.slot(kind).ok_or_else(|| CreatureError::MissingStat {
                species: self.species.name().to_string(),
                stat: kind,
            })
        };
        Ok(CreatureStats {
            health: require(StatKind::Health)?,
            stamina: require(StatKind::Stamina)?,
            oxygen: require(StatKind::Oxygen)?,
            food: require(StatKind::Food)?,
            weight: require(StatKind::Weight)?,
            melee: require(StatKind::Melee)?,
            speed: require(StatKind::Speed)?,
        })
    }
}

// ============================================================================
// Creature
// ============================================================================

#[derive(Debug)]
pub struct Creature {
    species: Species,
    level: u32,
    male: bool,
    tamed: bool,
    breed_time: u32,
    stats: CreatureStats,
    additional_stats: Vec<Stat>,
    attributes: Attributes,
    goals: Vec<AiGoal>,
    tags: Tags,
    service: CreatureService,
}

impl Creature {
    /// Untamed creature with a rolled level and gender unless the config sets them
    pub fn wild<R: Rng>(
        config: &CreatureConfig,
        levels: LevelRange,
        rng: &mut R,
    ) -> Result<Self, CreatureError> {
        let level = match config.level {
            Some(level) => level,
            None => levels.roll(rng),
        };
        let male = match config.male {
            Some(male) => male,
            None => rng.gen_bool(0.5),
        };
        Self::build(config, level, male, false)
    }

    pub fn tamed(config: &CreatureConfig, level: u32, male: bool) -> Result<Self, CreatureError> {
        Self::build(config, level, male, true)
    }

    fn build(
        config: &CreatureConfig,
        level: u32,
        male: bool,
        tamed: bool,
    ) -> Result<Self, CreatureError> {
        if level == 0 {
            return Err(CreatureError::InvalidLevel {
                species: config.species.name().to_string(),
                level,
            });
        }
        let stats = config.validate()?;

        let mut tags = Tags::new();
        tags.set(&BREEDING_TIME_REMAINING, config.breed_time);

        let mut creature = Self {
            species: config.species.clone(),
            level,
            male,
            tamed,
            breed_time: config.breed_time,
            attributes: Self::derive_attributes(&stats),
            stats,
            additional_stats: config.additional_stats.clone(),
            goals: vec![AiGoal::RandomStroll {
                radius: DEFAULT_STROLL_RADIUS,
            }],
            tags,
            service: CreatureService::default(),
        };

        for installer in &config.installers {
            installer(&mut creature);
        }
        Ok(creature)
    }

    fn derive_attributes(stats: &CreatureStats) -> Attributes {
        Attributes {
            movement_speed: stats.speed.current_value(),
            max_health: stats.health.current_value(),
            attack_damage: stats.melee.current_value(),
            scale: 1.0,
        }
    }

    /// Spend an upgrade point on one of the core stats
    pub fn upgrade(&mut self, kind: StatKind) {
        let stat = self.stats.get_mut(kind);
        stat.upgrade();
        let value = stat.current_value();
        match kind {
            StatKind::Health => self.attributes.max_health = value,
            StatKind::Melee => self.attributes.attack_damage = value,
            StatKind::Speed => self.attributes.movement_speed = value,
            _ => {}
        }
    }

    /// Text of the floating name label
    pub fn label_text(&self) -> String {
        format!("{} | {}", self.species.name(), self.level)
    }

    pub fn species(&self) -> &Species {
        &self.species
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn is_male(&self) -> bool {
        self.male
    }

    pub fn is_tamed(&self) -> bool {
        self.tamed
    }

    pub(crate) fn set_tamed(&mut self) {
        self.tamed = true;
    }

    pub fn breed_time(&self) -> u32 {
        self.breed_time
    }

    pub fn breeding_time_remaining(&self) -> u32 {
        self.tags
            .get(&BREEDING_TIME_REMAINING)
            .unwrap_or(self.breed_time)
    }

    pub fn stats(&self) -> &CreatureStats {
        &self.stats
    }

    pub fn stat(&self, kind: StatKind) -> &Stat {
        self.stats.get(kind)
    }

    pub fn additional_stats(&self) -> &[Stat] {
        &self.additional_stats
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    pub fn goals(&self) -> &[AiGoal] {
        &self.goals
    }

    pub fn add_goal(&mut self, goal: AiGoal) {
        if !self.goals.contains(&goal) {
            self.goals.push(goal);
        }
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut Tags {
        &mut self.tags
    }

    /// Taming progress; owned by the service
    pub fn times_hit(&self) -> u32 {
        self.service.times_hit()
    }

    pub fn service(&self) -> &CreatureService {
        &self.service
    }

    pub(crate) fn service_mut(&mut self) -> &mut CreatureService {
        &mut self.service
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::bull_config;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn enlarge(creature: &mut Creature) {
        creature.attributes_mut().scale = 2.0;
    }

    fn double_speed(creature: &mut Creature) {
        creature.attributes_mut().movement_speed *= 2.0;
    }

    #[test]
    fn test_level_draw_bounds() {
        let levels = LevelRange::new(1, 150).unwrap();
        assert_eq!(levels.level_at(0.0), 1);
        assert_eq!(levels.level_at(0.5), 1 + (0.5f64.powi(5) * 150.0).floor() as u32);
        assert_eq!(levels.level_at(0.999_999_999), 150);

        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            let level = levels.roll(&mut rng);
            assert!((1..=150).contains(&level));
        }
    }

    #[test]
    fn test_level_range_rejects_empty_and_zero() {
        assert!(matches!(
            LevelRange::new(10, 5),
            Err(ConfigError::LevelRange { min: 10, max: 5 })
        ));
        assert!(LevelRange::new(0, 5).is_err());

        let single = LevelRange::new(4, 4).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        assert!((0..100).all(|_| single.roll(&mut rng) == 4));
    }

    #[test]
    fn test_level_draw_skews_low() {
        let levels = LevelRange::new(1, 150).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let low = (0..10_000)
            .filter(|_| levels.roll(&mut rng) <= 15)
            .count();
        // u^5 * 150 < 15 whenever u < 0.631, so roughly 63% of draws
        assert!(low > 5_500 && low < 7_000, "low draws: {}", low);
    }

    #[test]
    fn test_wild_defaults() {
        let mut rng = StdRng::seed_from_u64(1);
        let levels = LevelRange::new(1, 150).unwrap();
        let creature = Creature::wild(&bull_config(), levels, &mut rng).unwrap();

        assert!(!creature.is_tamed());
        assert!(creature.level() >= 1);
        assert_eq!(creature.times_hit(), 0);
        assert_eq!(creature.breeding_time_remaining(), 10);
        assert_eq!(creature.attributes().max_health, 40.0);
        assert_eq!(creature.attributes().attack_damage, 2.0);
        assert_eq!(creature.attributes().movement_speed, 0.1);
        assert_eq!(creature.goals(), &[AiGoal::RandomStroll { radius: 20 }]);
    }

    #[test]
    fn test_overrides_win_over_roll() {
        let mut rng = StdRng::seed_from_u64(1);
        let config = bull_config().level(3).male(false);
        let creature = Creature::wild(&config, LevelRange::new(1, 150).unwrap(), &mut rng).unwrap();
        assert_eq!(creature.level(), 3);
        assert!(!creature.is_male());
    }

    #[test]
    fn test_missing_stat_rejected() {
        let mut config = bull_config();
        config.oxygen = None;
        let err = Creature::tamed(&config, 5, true).unwrap_err();
        assert_eq!(
            err,
            CreatureError::MissingStat {
                species: "Bull".into(),
                stat: StatKind::Oxygen
            }
        );
    }

    #[test]
    fn test_level_zero_rejected() {
        assert!(matches!(
            Creature::tamed(&bull_config(), 0, true),
            Err(CreatureError::InvalidLevel { level: 0, .. })
        ));
    }

    #[test]
    fn test_installers_run_in_order() {
        let config = bull_config().installer(enlarge).installer(double_speed);
        let creature = Creature::tamed(&config, 2, true).unwrap();
        assert_eq!(creature.attributes().scale, 2.0);
        assert_eq!(creature.attributes().movement_speed, 0.2);
    }

    #[test]
    fn test_upgrade_updates_attribute() {
        let mut creature = Creature::tamed(&bull_config(), 2, true).unwrap();
        creature.upgrade(StatKind::Melee);
        assert_eq!(creature.stat(StatKind::Melee).upgrade_points(), 1);
        assert_eq!(creature.attributes().attack_damage, 2.0 + 0.1);
    }

    #[test]
    fn test_inherit_copies_current_stats() {
        let config = bull_config().additional_stat(Stat::new(1.0, 1.0));
        let mut parent = Creature::tamed(&config, 4, true).unwrap();
        parent.upgrade(StatKind::Health);
        let child = Creature::tamed(&CreatureConfig::inherit(&parent), 104, false).unwrap();

        assert_eq!(child.stats(), parent.stats());
        assert_eq!(child.additional_stats(), parent.additional_stats());
        assert_eq!(child.species(), &Species::BULL);
        assert_eq!(child.label_text(), "Bull | 104");
    }
}
