//! ECS Components for world entities
//!
//! Host-engine level data shared by creatures, labels and players.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::marker::PhantomData;

// ============================================================================
// Spatial Components
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn with_z(self, f: impl FnOnce(f64) -> f64) -> Self {
        Self { z: f(self.z), ..self }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn chunk(&self, chunk_size: i64) -> ChunkPos {
        ChunkPos(
            (self.x.floor() as i64).div_euclid(chunk_size),
            (self.z.floor() as i64).div_euclid(chunk_size),
        )
    }
}

/// Integer block coordinates, as reported by block interactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl BlockPos {
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// Position standing on top of this block
    pub fn above(&self) -> Position {
        Position::new(self.x as f64, (self.y + 1) as f64, self.z as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPos(pub i64, pub i64);

/// World placement state. Entities are inserted as `Pending` and become
/// `Placed` once their chunk is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Pending,
    Placed,
}

// ============================================================================
// Leash & Passenger Components
// ============================================================================

/// Entity currently holding this entity's leash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeashHolder(pub hecs::Entity);

/// Entities riding this one (name labels)
#[derive(Debug, Clone, Default)]
pub struct Passengers(pub Vec<hecs::Entity>);

/// Entity this passenger rides on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vehicle(pub hecs::Entity);

/// Floating text display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub text: String,
}

/// Outline visible to every player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glowing;

/// Scoreboard team; colours the outline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team(pub String);

// ============================================================================
// Living Components
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageRecord {
    pub source: Option<hecs::Entity>,
    pub amount: f32,
    pub tick: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Health {
    pub current: f32,
    pub max: f32,
    pub last_damage: Option<DamageRecord>,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self {
            current: max,
            max,
            last_damage: None,
        }
    }

    /// Apply a hit. Zero-damage hits are still recorded as feedback.
    /// Returns true when this hit was lethal.
    pub fn damage(&mut self, source: Option<hecs::Entity>, amount: f32, tick: u64) -> bool {
        let was_alive = self.current > 0.0;
        self.current = (self.current - amount).max(0.0);
        self.last_damage = Some(DamageRecord { source, amount, tick });
        was_alive && self.current <= 0.0
    }

    pub fn heal_full(&mut self) {
        self.current = self.max;
    }
}

/// Engine attributes installed on a creature's entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    pub movement_speed: f32,
    pub max_health: f32,
    pub attack_damage: f32,
    pub scale: f32,
}

/// Behaviour hints handed to the engine's AI
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AiGoal {
    RandomStroll { radius: u32 },
    MeleeAttack { speed: f32, delay_ticks: u32 },
    TargetLastDamager { range: f32 },
    TargetClosestPlayer { range: f32 },
    /// Whatever the owning player has marked
    TargetOwnerMark { owner: hecs::Entity, range: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hand {
    Main,
    Off,
}

// ============================================================================
// Tags
// ============================================================================

/// Small typed key-value state attached to entities and items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TagValue {
    Int(i64),
    Float(f32),
    Bool(bool),
    String(String),
}

pub trait TagType: Sized {
    const TYPE_NAME: &'static str;
    fn into_value(self) -> TagValue;
    fn from_value(value: &TagValue) -> Option<Self>;
}

impl TagType for i32 {
    const TYPE_NAME: &'static str = "an integer";
    fn into_value(self) -> TagValue {
        TagValue::Int(self as i64)
    }
    fn from_value(value: &TagValue) -> Option<Self> {
        match value {
            TagValue::Int(v) => i32::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl TagType for u32 {
    const TYPE_NAME: &'static str = "an unsigned integer";
    fn into_value(self) -> TagValue {
        TagValue::Int(self as i64)
    }
    fn from_value(value: &TagValue) -> Option<Self> {
        match value {
            TagValue::Int(v) => u32::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl TagType for f32 {
    const TYPE_NAME: &'static str = "a float";
    fn into_value(self) -> TagValue {
        TagValue::Float(self)
    }
    fn from_value(value: &TagValue) -> Option<Self> {
        match value {
            TagValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl TagType for bool {
    const TYPE_NAME: &'static str = "a boolean";
    fn into_value(self) -> TagValue {
        TagValue::Bool(self)
    }
    fn from_value(value: &TagValue) -> Option<Self> {
        match value {
            TagValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl TagType for String {
    const TYPE_NAME: &'static str = "a string";
    fn into_value(self) -> TagValue {
        TagValue::String(self)
    }
    fn from_value(value: &TagValue) -> Option<Self> {
        match value {
            TagValue::String(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// Typed key into a [`Tags`] map
#[derive(Debug, Clone)]
pub struct Tag<T> {
    key: Cow<'static, str>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: TagType> Tag<T> {
    pub const fn new(key: &'static str) -> Self {
        Self {
            key: Cow::Borrowed(key),
            _marker: PhantomData,
        }
    }

    pub fn dynamic(key: String) -> Self {
        Self {
            key: Cow::Owned(key),
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tags(BTreeMap<String, TagValue>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: TagType>(&self, tag: &Tag<T>) -> Option<T> {
        self.0.get(tag.key()).and_then(T::from_value)
    }

    pub fn get_raw(&self, key: &str) -> Option<&TagValue> {
        self.0.get(key)
    }

    pub fn set<T: TagType>(&mut self, tag: &Tag<T>, value: T) {
        self.0.insert(tag.key().to_string(), value.into_value());
    }

    /// Read-modify-write of a tag, starting from `default` when absent
    pub fn update<T: TagType>(&mut self, tag: &Tag<T>, default: T, f: impl FnOnce(T) -> T) -> T
    where
        T: Clone,
    {
        let next = f(self.get(tag).unwrap_or(default));
        self.set(tag, next.clone());
        next
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<TagValue> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// Clock
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct Clock {
    pub tick: u64,
}

impl Clock {
    pub fn advance(&mut self) {
        self.tick += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNT: Tag<i32> = Tag::new("count");

    #[test]
    fn test_tags_typed_access() {
        let mut tags = Tags::new();
        assert_eq!(tags.get(&COUNT), None);

        tags.set(&COUNT, 3);
        assert_eq!(tags.get(&COUNT), Some(3));
        assert_eq!(tags.update(&COUNT, 0, |n| n - 1), 2);

        // Wrong type reads as absent
        let as_bool: Tag<bool> = Tag::new("count");
        assert_eq!(tags.get(&as_bool), None);
        assert!(tags.has("count"));
    }

    #[test]
    fn test_zero_damage_is_recorded() {
        let mut health = Health::new(10.0);
        assert!(!health.damage(None, 0.0, 5));
        assert_eq!(health.current, 10.0);
        assert_eq!(health.last_damage.map(|d| d.tick), Some(5));

        assert!(health.damage(None, 15.0, 6));
        assert_eq!(health.current, 0.0);
        // Already dead: not lethal a second time
        assert!(!health.damage(None, 1.0, 7));
    }

    #[test]
    fn test_chunk_of_negative_position() {
        assert_eq!(Position::new(-1.0, 0.0, 17.0).chunk(16), ChunkPos(-1, 1));
    }
}
