//! Item stacks and the creature <-> item codec
//!
//! A picked-up creature travels as a spawn egg whose tags carry everything
//! needed to rebuild it: kind, species, level, gender, breed time and every
//! stat with its upgrade progress.

use serde::{Deserialize, Serialize};

use crate::components::{Tag, TagType, Tags};
use crate::creature::{Creature, CreatureConfig};
use crate::error::CreatureItemError;
use crate::registry::CreatureRegistry;
use crate::species::{EntityKind, Species};
use crate::stat::{Stat, StatKind};

const DEFAULT_MAX_STACK: u8 = 64;

const MALE_COLOR: TextColor = TextColor::Hex(0x31ddf7);
const FEMALE_COLOR: TextColor = TextColor::Hex(0xff2bf8);

pub const ENTITY_TYPE: Tag<String> = Tag::new("type");
pub const SPECIES_NAME: Tag<String> = Tag::new("species");
pub const LEVEL: Tag<u32> = Tag::new("level");
pub const MALE: Tag<bool> = Tag::new("male");
pub const BREEDING_TIME: Tag<u32> = Tag::new("breeding_time");
const ADDITIONAL_COUNT: Tag<u32> = Tag::new("stat.additional.count");

// ============================================================================
// Item stacks
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextColor {
    White,
    Yellow,
    Hex(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSegment {
    pub text: String,
    pub color: TextColor,
}

/// One line of rich text (display name or lore)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextLine {
    pub segments: Vec<TextSegment>,
    pub italic: bool,
}

impl TextLine {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            segments: vec![TextSegment {
                text: text.into(),
                color: TextColor::White,
            }],
            italic: false,
        }
    }

    pub fn append(mut self, text: impl Into<String>, color: TextColor) -> Self {
        self.segments.push(TextSegment {
            text: text.into(),
            color,
        });
        self
    }

    pub fn to_plain_string(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStack {
    pub material: String,
    pub amount: u8,
    pub max_stack_size: u8,
    pub display_name: Option<TextLine>,
    pub lore: Vec<TextLine>,
    pub tags: Tags,
}

impl ItemStack {
    pub fn new(material: impl Into<String>) -> Self {
        Self {
            material: material.into(),
            amount: 1,
            max_stack_size: DEFAULT_MAX_STACK,
            display_name: None,
            lore: Vec::new(),
            tags: Tags::new(),
        }
    }

    pub fn with_tag<T: TagType>(mut self, tag: &Tag<T>, value: T) -> Self {
        self.tags.set(tag, value);
        self
    }

    pub fn tag<T: TagType>(&self, tag: &Tag<T>) -> Option<T> {
        self.tags.get(tag)
    }

    pub fn has_tag<T: TagType>(&self, tag: &Tag<T>) -> bool {
        self.tags.has(tag.key())
    }

    /// Compact binary form for the host engine
    pub fn to_bytes(&self) -> Result<Vec<u8>, CreatureItemError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CreatureItemError> {
        Ok(bincode::deserialize(bytes)?)
    }

    pub fn to_json(&self) -> Result<String, CreatureItemError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, CreatureItemError> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// Creature codec
// ============================================================================

fn stat_tag<T: TagType>(prefix: &str, field: &str) -> Tag<T> {
    Tag::dynamic(format!("stat.{}.{}", prefix, field))
}

fn encode_stat(item: &mut ItemStack, prefix: &str, stat: &Stat) {
    item.tags.set(&stat_tag(prefix, "base"), stat.base_value());
    item.tags.set(&stat_tag(prefix, "increment"), stat.increment_per_upgrade());
    item.tags.set(&stat_tag(prefix, "points"), stat.upgrade_points());
    item.tags.set(&stat_tag(prefix, "current"), stat.current_value());
}

/// Encode a creature as a portable item
pub fn to_item(creature: &Creature) -> ItemStack {
    let kind = creature.species().kind();
    let material = kind
        .spawn_egg()
        .unwrap_or_else(|| "minecraft:egg".to_string());

    let mut item = ItemStack::new(material)
        .with_tag(&ENTITY_TYPE, kind.key().to_string())
        .with_tag(&SPECIES_NAME, creature.species().name().to_string())
        .with_tag(&LEVEL, creature.level())
        .with_tag(&MALE, creature.is_male())
        .with_tag(&BREEDING_TIME, creature.breed_time())
        .with_tag(&ADDITIONAL_COUNT, creature.additional_stats().len() as u32);
    item.max_stack_size = 1;

    for (kind, stat) in creature.stats().iter() {
        encode_stat(&mut item, kind.as_str(), stat);
    }
    for (index, stat) in creature.additional_stats().iter().enumerate() {
        encode_stat(&mut item, &format!("additional.{}", index), stat);
    }

    let (gender, color) = if creature.is_male() {
        ("Male", MALE_COLOR)
    } else {
        ("Female", FEMALE_COLOR)
    };
    item.display_name = Some(TextLine::plain(creature.species().name()));
    item.lore = vec![
        TextLine::plain("Level: ").append(creature.level().to_string(), TextColor::Yellow),
        TextLine::plain("Gender: ").append(gender, color),
    ];
    item
}

pub fn is_creature_item(item: &ItemStack) -> bool {
    item.has_tag(&ENTITY_TYPE)
}

fn require<T: TagType>(item: &ItemStack, tag: &Tag<T>) -> Result<T, CreatureItemError> {
    let value = item
        .tags
        .get_raw(tag.key())
        .ok_or_else(|| CreatureItemError::MissingField(tag.key().to_string()))?;
    T::from_value(value).ok_or_else(|| CreatureItemError::WrongType {
        field: tag.key().to_string(),
        expected: T::TYPE_NAME,
    })
}

fn decode_stat(item: &ItemStack, prefix: &str) -> Result<Stat, CreatureItemError> {
    let base: f32 = require(item, &stat_tag(prefix, "base"))?;
    let increment: f32 = require(item, &stat_tag(prefix, "increment"))?;
    let points: u32 = require(item, &stat_tag(prefix, "points"))?;
    let current: f32 = require(item, &stat_tag(prefix, "current"))?;

    let stat = Stat::restore(base, increment, points);
    if stat.current_value().to_bits() != current.to_bits() {
        return Err(CreatureItemError::StatMismatch(prefix.to_string()));
    }
    Ok(stat)
}

/// Rebuild a tamed creature from its item. Behaviour installers are looked
/// up in the registry by species.
pub fn to_creature(
    item: &ItemStack,
    registry: &CreatureRegistry,
) -> Result<Creature, CreatureItemError> {
    if !is_creature_item(item) {
        return Err(CreatureItemError::NotACreatureItem);
    }

    let kind_key = require(item, &ENTITY_TYPE)?;
    let kind = EntityKind::from_key(&kind_key)
        .ok_or(CreatureItemError::UnknownEntityKind(kind_key))?;
    let species = Species::new(kind, require(item, &SPECIES_NAME)?);
    let level = require(item, &LEVEL)?;
    let male = require(item, &MALE)?;
    let breed_time = require(item, &BREEDING_TIME)?;

    let mut config = CreatureConfig::new(species, breed_time);
    for kind in StatKind::ALL {
        config = config.stat(kind, decode_stat(item, kind.as_str())?);
    }
    let additional: u32 = require(item, &ADDITIONAL_COUNT)?;
    for index in 0..additional {
        config = config.additional_stat(decode_stat(item, &format!("additional.{}", index))?);
    }
    config.installers = registry.installers_for(&config.species).to_vec();

    Ok(Creature::tamed(&config, level, male)?)
}
