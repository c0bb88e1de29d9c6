//! Creature Registry - named templates for every species the world can spawn

use std::collections::BTreeMap;

use rand::seq::IteratorRandom;
use rand::Rng;
use tracing::debug;

use crate::components::AiGoal;
use crate::creature::{BehaviorInstaller, Creature, CreatureConfig, LevelRange};
use crate::error::RegistryError;
use crate::species::Species;
use crate::stat::Stat;

/// Hostile species chase and bite whoever is closest
fn hunt_players(creature: &mut Creature) {
    creature.add_goal(AiGoal::MeleeAttack {
        speed: 1.2,
        delay_ticks: 20,
    });
    creature.add_goal(AiGoal::TargetLastDamager { range: 16.0 });
    creature.add_goal(AiGoal::TargetClosestPlayer { range: 16.0 });
}

/// Passive species that fight back once hit
fn retaliate(creature: &mut Creature) {
    creature.add_goal(AiGoal::MeleeAttack {
        speed: 1.0,
        delay_ticks: 20,
    });
    creature.add_goal(AiGoal::TargetLastDamager { range: 12.0 });
}

pub struct CreatureRegistry {
    templates: BTreeMap<String, CreatureConfig>,
    levels: LevelRange,
}

impl CreatureRegistry {
    pub fn new(levels: LevelRange) -> Self {
        Self {
            templates: BTreeMap::new(),
            levels,
        }
    }

    /// Registry preloaded with the built-in species
    pub fn standard(levels: LevelRange) -> Result<Self, RegistryError> {
        let mut registry = Self::new(levels);
        for (name, config) in standard_templates() {
            registry.register(name, config)?;
        }
        Ok(registry)
    }

    /// Add or replace a template. Rejected up front if it is missing a stat.
    pub fn register(&mut self, name: &str, config: CreatureConfig) -> Result<(), RegistryError> {
        config.validate()?;
        debug!("registered creature template {} ({})", name, config.species);
        self.templates.insert(name.to_lowercase(), config);
        Ok(())
    }

    pub fn levels(&self) -> LevelRange {
        self.levels
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn template(&self, name: &str) -> Option<&CreatureConfig> {
        self.templates.get(&name.to_lowercase())
    }

    /// New wild creature of the named template
    pub fn of<R: Rng>(&self, name: &str, rng: &mut R) -> Result<Creature, RegistryError> {
        let config = self
            .template(name)
            .ok_or_else(|| RegistryError::UnknownSpecies(name.to_string()))?;
        Ok(Creature::wild(config, self.levels, rng)?)
    }

    /// New wild creature of a uniformly chosen template
    pub fn random<R: Rng>(&self, rng: &mut R) -> Result<Creature, RegistryError> {
        let config = self
            .templates
            .values()
            .choose(rng)
            .ok_or(RegistryError::Empty)?;
        Ok(Creature::wild(config, self.levels, rng)?)
    }

    /// Behaviour hooks of the template matching a species, empty if unknown
    pub fn installers_for(&self, species: &Species) -> &[BehaviorInstaller] {
        self.templates
            .values()
            .find(|config| &config.species == species)
            .map(|config| config.installers.as_slice())
            .unwrap_or(&[])
    }
}

fn standard_templates() -> [(&'static str, CreatureConfig); 3] {
    [
        (
            "bull",
            CreatureConfig::new(Species::BULL, 30)
                .health(Stat::new(40.0, 4.0))
                .stamina(Stat::new(100.0, 10.0))
                .oxygen(Stat::new(150.0, 15.0))
                .food(Stat::new(1200.0, 120.0))
                .weight(Stat::new(200.0, 4.0))
                .melee(Stat::new(2.0, 0.1))
                .speed(Stat::new(0.1, 0.005))
                .installer(retaliate),
        ),
        (
            "jumbuck",
            CreatureConfig::new(Species::JUMBUCK, 20)
                .health(Stat::new(30.0, 3.0))
                .stamina(Stat::new(80.0, 8.0))
                .oxygen(Stat::new(150.0, 15.0))
                .food(Stat::new(900.0, 90.0))
                .weight(Stat::new(120.0, 2.4))
                .melee(Stat::new(1.0, 0.05))
                .speed(Stat::new(0.12, 0.006)),
        ),
        (
            "scavenger",
            CreatureConfig::new(Species::SCAVENGER, 45)
                .health(Stat::new(25.0, 2.5))
                .stamina(Stat::new(150.0, 15.0))
                .oxygen(Stat::new(300.0, 30.0))
                .food(Stat::new(600.0, 60.0))
                .weight(Stat::new(80.0, 1.6))
                .melee(Stat::new(4.0, 0.2))
                .speed(Stat::new(0.15, 0.0075))
                .installer(hunt_players),
        ),
    ]
}
