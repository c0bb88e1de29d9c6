//! Species and world-entity kinds

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Entity kinds
// ============================================================================

/// Kind of entity in the host world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Cow,
    Sheep,
    Phantom,
    Pig,
    Wolf,
    TextDisplay,
    Player,
}

static KINDS_BY_KEY: Lazy<HashMap<&'static str, EntityKind>> = Lazy::new(|| {
    EntityKind::ALL
        .iter()
        .map(|kind| (kind.key(), *kind))
        .collect()
});

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Cow,
        EntityKind::Sheep,
        EntityKind::Phantom,
        EntityKind::Pig,
        EntityKind::Wolf,
        EntityKind::TextDisplay,
        EntityKind::Player,
    ];

    /// Namespaced key, e.g. `minecraft:cow`
    pub const fn key(&self) -> &'static str {
        match self {
            EntityKind::Cow => "minecraft:cow",
            EntityKind::Sheep => "minecraft:sheep",
            EntityKind::Phantom => "minecraft:phantom",
            EntityKind::Pig => "minecraft:pig",
            EntityKind::Wolf => "minecraft:wolf",
            EntityKind::TextDisplay => "minecraft:text_display",
            EntityKind::Player => "minecraft:player",
        }
    }

    pub fn from_key(key: &str) -> Option<EntityKind> {
        KINDS_BY_KEY.get(key).copied()
    }

    /// Item material used for the portable form of a creature of this kind.
    /// Displays and players have no spawn egg.
    pub fn spawn_egg(&self) -> Option<String> {
        match self {
            EntityKind::TextDisplay | EntityKind::Player => None,
            _ => Some(format!("{}_spawn_egg", self.key())),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ============================================================================
// Species
// ============================================================================

/// Static identity of a creature: the entity kind it uses plus a display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Species {
    kind: EntityKind,
    name: Cow<'static, str>,
}

impl Species {
    pub const BULL: Species = Species::of_static(EntityKind::Cow, "Bull");
    pub const JUMBUCK: Species = Species::of_static(EntityKind::Sheep, "Jumbuck");
    pub const SCAVENGER: Species = Species::of_static(EntityKind::Phantom, "Scavenger");

    pub const fn of_static(kind: EntityKind, name: &'static str) -> Self {
        Self {
            kind,
            name: Cow::Borrowed(name),
        }
    }

    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: Cow::Owned(name.into()),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_and_decoded_species_are_equal() {
        let decoded = Species::new(EntityKind::Cow, String::from("Bull"));
        assert_eq!(decoded, Species::BULL);

        let mut lookup = HashMap::new();
        lookup.insert(Species::BULL, 1);
        assert_eq!(lookup.get(&decoded), Some(&1));
    }

    #[test]
    fn test_same_name_different_kind() {
        assert_ne!(Species::new(EntityKind::Sheep, "Bull"), Species::BULL);
    }

    #[test]
    fn test_kind_keys() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_key(kind.key()), Some(kind));
        }
        assert_eq!(EntityKind::from_key("minecraft:dragon"), None);
        assert_eq!(
            EntityKind::Cow.spawn_egg().as_deref(),
            Some("minecraft:cow_spawn_egg")
        );
        assert_eq!(EntityKind::TextDisplay.spawn_egg(), None);
    }
}
