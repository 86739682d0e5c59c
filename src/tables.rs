//! Externally defined drop tables referenced by uid.
//!
//! Reference-based alterations pull drops out of these tables. The engine only
//! reads them; where they come from is up to the host.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::item::{BasicItemDrop, GuaranteedDrop, ItemDropChance, ItemId};

const fn default_qty() -> i32 {
    1
}

/// Guaranteed entry of a drop table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDrop {
    /// Dropped item.
    pub item_id: ItemId,
    /// Minimum quantity.
    #[serde(default = "default_qty")]
    pub min_qty: i32,
    /// Maximum quantity.
    #[serde(default = "default_qty")]
    pub max_qty: i32,
}

impl TableDrop {
    /// Creates a table entry.
    #[must_use]
    pub fn new(item_id: impl Into<ItemId>, min_qty: i32, max_qty: i32) -> Self {
        Self {
            item_id: item_id.into(),
            min_qty,
            max_qty,
        }
    }

    /// As an alteration payload.
    #[must_use]
    pub fn to_guaranteed(&self) -> GuaranteedDrop {
        GuaranteedDrop::new(self.item_id, self.min_qty, self.max_qty)
    }

    /// As a guaranteed container entry.
    #[must_use]
    pub fn to_basic(&self) -> BasicItemDrop {
        BasicItemDrop::new(self.item_id, self.min_qty, self.max_qty)
    }
}

/// Weighted entry of a random table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableChanceDrop {
    /// Dropped item.
    pub item_id: ItemId,
    /// Minimum quantity.
    #[serde(default = "default_qty")]
    pub min_qty: i32,
    /// Maximum quantity.
    #[serde(default = "default_qty")]
    pub max_qty: i32,
    /// Weight.
    #[serde(default = "default_qty")]
    pub dice_value: i32,
}

impl TableChanceDrop {
    /// Creates a weighted table entry.
    #[must_use]
    pub fn new(item_id: impl Into<ItemId>, min_qty: i32, max_qty: i32, dice_value: i32) -> Self {
        Self {
            item_id: item_id.into(),
            min_qty,
            max_qty,
            dice_value,
        }
    }

    /// As a chance container entry.
    #[must_use]
    pub fn to_chance(&self) -> ItemDropChance {
        ItemDropChance::new(self.item_id, self.min_qty, self.max_qty, self.dice_value)
    }
}

/// A group of weighted drops rolled together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomTable {
    /// Weighted entries.
    #[serde(default)]
    pub drops: Vec<TableChanceDrop>,
}

/// A named drop table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropTableDef {
    /// Unique table id.
    pub uid: String,
    /// Always dropped entries.
    #[serde(default)]
    pub guaranteed_drops: Vec<TableDrop>,
    /// Weighted groups.
    #[serde(default)]
    pub random_tables: Vec<RandomTable>,
}

impl DropTableDef {
    /// Creates an empty table.
    #[must_use]
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ..Self::default()
        }
    }

    /// Adds a guaranteed entry.
    #[must_use]
    pub fn with_guaranteed(mut self, drop: TableDrop) -> Self {
        self.guaranteed_drops.push(drop);
        self
    }

    /// Adds a weighted group.
    #[must_use]
    pub fn with_random(mut self, drops: Vec<TableChanceDrop>) -> Self {
        self.random_tables.push(RandomTable { drops });
        self
    }

    /// Returns true when the table yields nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guaranteed_drops.is_empty() && self.random_tables.is_empty()
    }
}

/// Lookup of drop tables by uid.
pub trait DropTableSource {
    /// Returns the table registered under `uid`.
    fn get(&self, uid: &str) -> Option<&DropTableDef>;

    /// Returns true if no tables are registered.
    fn is_empty(&self) -> bool;
}

/// Destination for drops generated directly into the live world.
///
/// Creating item objects is a host concern; the engine only decides which
/// tables to roll.
pub trait MaterializationTarget {
    /// Rolls `table` into the target.
    fn generate(&mut self, table: &DropTableDef);
}

/// Target that only records which tables were rolled.
#[derive(Debug, Default)]
pub struct RecordingTarget {
    /// Uids of rolled tables, in order.
    pub generated: Vec<String>,
}

impl MaterializationTarget for RecordingTarget {
    fn generate(&mut self, table: &DropTableDef) {
        self.generated.push(table.uid.clone());
    }
}

/// In-memory table registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InMemoryDropTables {
    tables: HashMap<String, DropTableDef>,
}

impl InMemoryDropTables {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table, replacing any table with the same uid.
    pub fn insert(&mut self, table: DropTableDef) -> Option<DropTableDef> {
        self.tables.insert(table.uid.clone(), table)
    }

    /// Number of registered tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }
}

impl FromIterator<DropTableDef> for InMemoryDropTables {
    fn from_iter<T: IntoIterator<Item = DropTableDef>>(iter: T) -> Self {
        let mut tables = Self::new();
        for table in iter {
            tables.insert(table);
        }
        tables
    }
}

impl DropTableSource for InMemoryDropTables {
    fn get(&self, uid: &str) -> Option<&DropTableDef> {
        self.tables.get(uid)
    }

    fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
