//! Item drop value types.
//!
//! Two families live here:
//! - rule payloads (`GuaranteedDrop`, `ChanceDrop`) as written in alteration
//!   definitions, and
//! - resolved drops (`BasicItemDrop`, `ItemDropChance`) as stored in a
//!   holder's drop containers.
//!
//! Within one container an item id identifies a drop: two drops are "the same
//! item" iff their ids are equal.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Game item identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub i32);

impl ItemId {
    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for ItemId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

/// Formats a drop count range: `"2"` or `"1-3"`.
#[must_use]
pub fn drop_count_text(min: i32, max: i32) -> String {
    if max > min {
        format!("{min}-{max}")
    } else {
        min.to_string()
    }
}

const fn default_count() -> i32 {
    1
}

const fn default_drop_chance() -> i32 {
    1
}

const fn default_relative_chance() -> f32 {
    1.0
}

/// Kind of drop container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DropperKind {
    /// Every entry always drops.
    Guaranteed,
    /// Entries are rolled by weight.
    Chance,
}

impl fmt::Display for DropperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Guaranteed => "GuaranteedDrop",
            Self::Chance => "DropTable",
        })
    }
}

/// Anything stored in a drop container.
pub trait ItemDrop: Clone + fmt::Debug {
    /// Kind of container holding this entry type.
    const KIND: DropperKind;

    /// Item dropped by this entry.
    fn item_id(&self) -> ItemId;

    /// Minimum and maximum stack size.
    fn counts(&self) -> (i32, i32);

    /// Roll weight, for weighted entries.
    fn weight(&self) -> Option<i32> {
        None
    }
}

/// Resolved guaranteed drop, as held by a guaranteed drop container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicItemDrop {
    /// Dropped item.
    pub item_id: ItemId,
    /// Minimum stack size.
    #[serde(default = "default_count")]
    pub min_drop_count: i32,
    /// Maximum stack size.
    #[serde(default = "default_count")]
    pub max_drop_count: i32,
}

impl BasicItemDrop {
    /// Creates a drop of `min..=max` items.
    #[must_use]
    pub fn new(item_id: impl Into<ItemId>, min: i32, max: i32) -> Self {
        Self {
            item_id: item_id.into(),
            min_drop_count: min,
            max_drop_count: max,
        }
    }
}

impl ItemDrop for BasicItemDrop {
    const KIND: DropperKind = DropperKind::Guaranteed;

    fn item_id(&self) -> ItemId {
        self.item_id
    }

    fn counts(&self) -> (i32, i32) {
        (self.min_drop_count, self.max_drop_count)
    }
}

/// Resolved weighted drop, as held by a chance drop container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDropChance {
    /// Dropped item.
    pub item_id: ItemId,
    /// Minimum stack size.
    #[serde(default = "default_count")]
    pub min_drop_count: i32,
    /// Maximum stack size.
    #[serde(default = "default_count")]
    pub max_drop_count: i32,
    /// Weight relative to the other entries of the same container.
    #[serde(default = "default_drop_chance")]
    pub drop_chance: i32,
    /// Host-side regeneration delay, carried through copies untouched.
    #[serde(default)]
    pub chance_regen_delay: f32,
}

impl ItemDropChance {
    /// Creates a weighted drop.
    #[must_use]
    pub fn new(item_id: impl Into<ItemId>, min: i32, max: i32, drop_chance: i32) -> Self {
        Self {
            item_id: item_id.into(),
            min_drop_count: min,
            max_drop_count: max,
            drop_chance,
            chance_regen_delay: 0.0,
        }
    }
}

impl ItemDrop for ItemDropChance {
    const KIND: DropperKind = DropperKind::Chance;

    fn item_id(&self) -> ItemId {
        self.item_id
    }

    fn counts(&self) -> (i32, i32) {
        (self.min_drop_count, self.max_drop_count)
    }

    fn weight(&self) -> Option<i32> {
        Some(self.drop_chance)
    }
}

/// Guaranteed drop as declared by an alteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuaranteedDrop {
    /// Dropped item.
    pub item_id: ItemId,
    /// Minimum stack size.
    #[serde(default = "default_count")]
    pub min_drop_count: i32,
    /// Maximum stack size; values below the minimum are raised to it.
    #[serde(default = "default_count")]
    pub max_drop_count: i32,
}

impl GuaranteedDrop {
    /// Creates a guaranteed drop payload.
    #[must_use]
    pub fn new(item_id: impl Into<ItemId>, min: i32, max: i32) -> Self {
        Self {
            item_id: item_id.into(),
            min_drop_count: min,
            max_drop_count: max,
        }
    }

    /// Maximum count, never below the minimum.
    #[must_use]
    pub fn actual_max_drop_count(&self) -> i32 {
        self.max_drop_count.max(self.min_drop_count)
    }

    /// Builds the container entry for this payload.
    #[must_use]
    pub fn materialize(&self) -> BasicItemDrop {
        BasicItemDrop {
            item_id: self.item_id,
            min_drop_count: self.min_drop_count,
            max_drop_count: self.actual_max_drop_count(),
        }
    }

    /// Overwrites the counts of `existing`; returns true iff a field differed.
    pub fn modify(&self, existing: &mut BasicItemDrop) -> bool {
        let mut differs = false;
        if existing.min_drop_count != self.min_drop_count {
            existing.min_drop_count = self.min_drop_count;
            differs = true;
        }
        let max = self.actual_max_drop_count();
        if existing.max_drop_count != max {
            existing.max_drop_count = max;
            differs = true;
        }
        differs
    }
}

impl fmt::Display for GuaranteedDrop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x ({})",
            drop_count_text(self.min_drop_count, self.max_drop_count),
            self.item_id
        )
    }
}

/// Weighted drop with a fixed weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsoluteChanceDrop {
    /// Dropped item.
    pub item_id: ItemId,
    /// Minimum stack size.
    #[serde(default = "default_count")]
    pub min_drop_count: i32,
    /// Maximum stack size; values below the minimum are raised to it.
    #[serde(default = "default_count")]
    pub max_drop_count: i32,
    /// Fixed weight.
    #[serde(default = "default_drop_chance")]
    pub drop_chance: i32,
}

impl AbsoluteChanceDrop {
    /// Creates an absolute weighted drop payload.
    #[must_use]
    pub fn new(item_id: impl Into<ItemId>, min: i32, max: i32, drop_chance: i32) -> Self {
        Self {
            item_id: item_id.into(),
            min_drop_count: min,
            max_drop_count: max,
            drop_chance,
        }
    }

    /// Overwrites counts and weight of `existing`; returns true iff a field differed.
    pub fn modify(&self, existing: &mut ItemDropChance) -> bool {
        let mut differs = false;
        if existing.min_drop_count != self.min_drop_count {
            existing.min_drop_count = self.min_drop_count;
            differs = true;
        }
        let max = self.max_drop_count.max(self.min_drop_count);
        if existing.max_drop_count != max {
            existing.max_drop_count = max;
            differs = true;
        }
        if existing.drop_chance != self.drop_chance {
            existing.drop_chance = self.drop_chance;
            differs = true;
        }
        differs
    }
}

/// Weighted drop whose weight is a multiple of the container's average weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelativeChanceDrop {
    /// Dropped item.
    pub item_id: ItemId,
    /// Minimum stack size.
    #[serde(default = "default_count")]
    pub min_drop_count: i32,
    /// Maximum stack size; values below the minimum are raised to it.
    #[serde(default = "default_count")]
    pub max_drop_count: i32,
    /// Multiplier applied to the container's average weight.
    #[serde(default = "default_relative_chance")]
    pub relative_chance: f32,
}

/// Weighted drop as declared by an alteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChanceDrop {
    /// Fixed weight.
    Absolute(AbsoluteChanceDrop),
    /// Weight relative to the container average.
    Relative(RelativeChanceDrop),
}

impl ChanceDrop {
    /// Creates an absolute weighted drop.
    #[must_use]
    pub fn absolute(item_id: impl Into<ItemId>, min: i32, max: i32, drop_chance: i32) -> Self {
        Self::Absolute(AbsoluteChanceDrop::new(item_id, min, max, drop_chance))
    }

    /// Creates a relative weighted drop.
    #[must_use]
    pub fn relative(item_id: impl Into<ItemId>, min: i32, max: i32, relative_chance: f32) -> Self {
        Self::Relative(RelativeChanceDrop {
            item_id: item_id.into(),
            min_drop_count: min,
            max_drop_count: max,
            relative_chance,
        })
    }

    /// Dropped item.
    #[must_use]
    pub const fn item_id(&self) -> ItemId {
        match self {
            Self::Absolute(d) => d.item_id,
            Self::Relative(d) => d.item_id,
        }
    }

    const fn counts(&self) -> (i32, i32) {
        match self {
            Self::Absolute(d) => (d.min_drop_count, d.max_drop_count),
            Self::Relative(d) => (d.min_drop_count, d.max_drop_count),
        }
    }

    /// Weight this drop would get in a container with the given average weight.
    ///
    /// Relative weights round half-up. The result is never below 1.
    #[must_use]
    pub fn resolve_chance(&self, average_chance: f32) -> i32 {
        let chance = match self {
            Self::Absolute(d) => d.drop_chance,
            #[allow(clippy::cast_possible_truncation)]
            Self::Relative(d) => (average_chance * d.relative_chance + 0.5).floor() as i32,
        };
        if chance > 0 {
            chance
        } else {
            1
        }
    }

    /// Builds the container entry for this payload.
    #[must_use]
    pub fn materialize(&self, average_chance: f32) -> ItemDropChance {
        let (min, max) = self.counts();
        ItemDropChance {
            item_id: self.item_id(),
            min_drop_count: min,
            max_drop_count: max.max(min),
            drop_chance: self.resolve_chance(average_chance),
            chance_regen_delay: 0.0,
        }
    }
}

impl fmt::Display for ChanceDrop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (min, max) = self.counts();
        match self {
            Self::Absolute(d) => write!(f, "Chance: {}, ", d.drop_chance)?,
            Self::Relative(d) => write!(f, "Rel.Chance: {:.2}, ", d.relative_chance)?,
        }
        write!(f, "{}x ({})", drop_count_text(min, max), self.item_id())
    }
}
