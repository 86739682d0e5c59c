//! Ops on guaranteed drop containers.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::item::{GuaranteedDrop, ItemId};
use crate::tables::DropTableSource;
use crate::wrapper::GuaranteedDropWrapper;

use super::{append_missing, empty_payload, remove_items, ApplyOutcome, DropperFilter};

/// Appends guaranteed drops the container does not hold yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddGuaranteedDrops {
    /// Container selection.
    #[serde(flatten)]
    pub filter: DropperFilter,
    /// Drops to add.
    #[serde(default)]
    pub drops: Vec<GuaranteedDrop>,
}

impl AddGuaranteedDrops {
    /// Creates the op.
    #[must_use]
    pub fn new(filter: DropperFilter, drops: Vec<GuaranteedDrop>) -> Self {
        Self { filter, drops }
    }

    pub(super) fn apply(&self, dropper: &mut GuaranteedDropWrapper<'_>) -> ApplyOutcome {
        append_missing(dropper, &self.drops, |d| d.item_id, GuaranteedDrop::materialize)
    }

    pub(super) fn validate(&self) -> Vec<ValidationError> {
        if self.drops.is_empty() {
            vec![empty_payload("Drops", "AddGuaranteedDrops")]
        } else {
            Vec::new()
        }
    }
}

impl fmt::Display for AddGuaranteedDrops {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guaranteed: {}, {} added drops", self.filter, self.drops.len())
    }
}

/// Overwrites counts of guaranteed drops already in the container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModifyGuaranteedDrops {
    /// Container selection.
    #[serde(flatten)]
    pub filter: DropperFilter,
    /// New values, keyed by item id.
    #[serde(default)]
    pub modified_drops: Vec<GuaranteedDrop>,
}

impl ModifyGuaranteedDrops {
    /// Creates the op.
    #[must_use]
    pub fn new(filter: DropperFilter, modified_drops: Vec<GuaranteedDrop>) -> Self {
        Self {
            filter,
            modified_drops,
        }
    }

    pub(super) fn apply(&self, dropper: &mut GuaranteedDropWrapper<'_>) -> ApplyOutcome {
        if self.modified_drops.is_empty() || !dropper.has_drops() {
            return ApplyOutcome::Skipped;
        }
        let modifications: HashMap<ItemId, &GuaranteedDrop> =
            self.modified_drops.iter().map(|d| (d.item_id, d)).collect();
        let mut changed = false;
        for drop in dropper.drops_mut() {
            if let Some(modification) = modifications.get(&drop.item_id) {
                changed |= modification.modify(drop);
            }
        }
        if !changed {
            return ApplyOutcome::Skipped;
        }
        dropper.set_has_changes();
        ApplyOutcome::Changed
    }

    pub(super) fn validate(&self) -> Vec<ValidationError> {
        if self.modified_drops.is_empty() {
            vec![empty_payload("ModifiedDrops", "ModifyGuaranteedDrops")]
        } else {
            Vec::new()
        }
    }
}

impl fmt::Display for ModifyGuaranteedDrops {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Guaranteed: {}, {} modified drops",
            self.filter,
            self.modified_drops.len()
        )
    }
}

/// Removes guaranteed drops by item id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoveGuaranteedDrops {
    /// Container selection.
    #[serde(flatten)]
    pub filter: DropperFilter,
    /// Items to remove.
    #[serde(default)]
    pub items_to_remove: Vec<ItemId>,
    #[serde(skip)]
    removal_set: OnceLock<HashSet<ItemId>>,
}

impl RemoveGuaranteedDrops {
    /// Creates the op.
    #[must_use]
    pub fn new(filter: DropperFilter, items_to_remove: Vec<ItemId>) -> Self {
        Self {
            filter,
            items_to_remove,
            removal_set: OnceLock::new(),
        }
    }

    pub(super) fn prepare(&mut self) {
        self.removal_set = OnceLock::new();
    }

    pub(super) fn apply(&self, dropper: &mut GuaranteedDropWrapper<'_>) -> ApplyOutcome {
        let items = self
            .removal_set
            .get_or_init(|| self.items_to_remove.iter().copied().collect());
        remove_items(dropper, items)
    }

    pub(super) fn validate(&self) -> Vec<ValidationError> {
        if self.items_to_remove.is_empty() {
            vec![empty_payload("ItemsToRemove", "RemoveGuaranteedDrops")]
        } else {
            Vec::new()
        }
    }
}

impl fmt::Display for RemoveGuaranteedDrops {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Guaranteed: {}, {} items to remove",
            self.filter,
            self.items_to_remove.len()
        )
    }
}

#[derive(Debug, Clone, Default)]
struct ResolvedTables {
    drops: Vec<GuaranteedDrop>,
    missing: Vec<String>,
}

/// Appends the guaranteed drops of referenced drop tables.
///
/// References are resolved once during activation and cached until the uid
/// list changes. Items already contributed by an earlier table are skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddGuaranteedFromDropTable {
    /// Container selection.
    #[serde(flatten)]
    pub filter: DropperFilter,
    #[serde(default)]
    drop_table_uids: Vec<String>,
    #[serde(skip)]
    resolved: Option<ResolvedTables>,
}

impl AddGuaranteedFromDropTable {
    /// Creates the op.
    #[must_use]
    pub fn new(filter: DropperFilter, drop_table_uids: Vec<String>) -> Self {
        Self {
            filter,
            drop_table_uids,
            resolved: None,
        }
    }

    /// Referenced table uids.
    #[must_use]
    pub fn drop_table_uids(&self) -> &[String] {
        &self.drop_table_uids
    }

    /// Replaces the referenced uids and drops resolved drops.
    pub fn set_drop_table_uids(&mut self, uids: Vec<String>) {
        self.drop_table_uids = uids;
        self.clear_cache();
    }

    /// Returns true once references were resolved.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    /// Resolved drops; empty before activation.
    #[must_use]
    pub fn drops(&self) -> &[GuaranteedDrop] {
        self.resolved.as_ref().map_or(&[], |r| r.drops.as_slice())
    }

    pub(super) fn missing(&self) -> &[String] {
        self.resolved.as_ref().map_or(&[], |r| r.missing.as_slice())
    }

    pub(super) fn clear_cache(&mut self) {
        self.resolved = None;
    }

    pub(super) fn resolve(&mut self, tables: &dyn DropTableSource) {
        self.resolved = Some(self.lookup(tables));
    }

    fn lookup(&self, tables: &dyn DropTableSource) -> ResolvedTables {
        let mut seen = HashSet::new();
        let mut resolved = ResolvedTables::default();
        for uid in &self.drop_table_uids {
            match tables.get(uid) {
                Some(table) => resolved.drops.extend(
                    table
                        .guaranteed_drops
                        .iter()
                        .filter(|d| seen.insert(d.item_id))
                        .map(|d| d.to_guaranteed()),
                ),
                None => resolved.missing.push(uid.clone()),
            }
        }
        resolved
    }

    pub(super) fn apply(&self, dropper: &mut GuaranteedDropWrapper<'_>) -> ApplyOutcome {
        append_missing(dropper, self.drops(), |d| d.item_id, GuaranteedDrop::materialize)
    }

    pub(super) fn validate(&self, tables: &dyn DropTableSource) -> Vec<ValidationError> {
        if self.drop_table_uids.is_empty() {
            return vec![empty_payload("DropTableUids", "AddGuaranteedFromDropTable")];
        }
        let resolved = self.lookup(tables);
        let mut errors: Vec<ValidationError> = resolved
            .missing
            .into_iter()
            .map(|uid| ValidationError::UnknownDropTable { uid })
            .collect();
        if resolved.drops.is_empty() {
            errors.push(empty_payload("Drops", "AddGuaranteedFromDropTable"));
        }
        errors
    }
}

impl fmt::Display for AddGuaranteedFromDropTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Guaranteed: {}, {} drop tables -> {} drops",
            self.filter,
            self.drop_table_uids.len(),
            self.drops().len()
        )
    }
}
