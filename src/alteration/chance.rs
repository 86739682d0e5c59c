//! Ops on chance drop containers.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::item::{AbsoluteChanceDrop, ChanceDrop, ItemId};
use crate::wrapper::ChanceDropWrapper;

use super::{append_missing, empty_payload, remove_items, ApplyOutcome, DropperFilter};

/// Appends weighted drops the container does not hold yet.
///
/// Relative weights are resolved against the container's average weight at
/// wrap time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddChanceDrops {
    /// Container selection.
    #[serde(flatten)]
    pub filter: DropperFilter,
    /// Drops to add.
    #[serde(default)]
    pub drops: Vec<ChanceDrop>,
}

impl AddChanceDrops {
    /// Creates the op.
    #[must_use]
    pub fn new(filter: DropperFilter, drops: Vec<ChanceDrop>) -> Self {
        Self { filter, drops }
    }

    pub(super) fn apply(&self, dropper: &mut ChanceDropWrapper<'_>) -> ApplyOutcome {
        let average = dropper.average_drop_chance();
        append_missing(dropper, &self.drops, ChanceDrop::item_id, |d| {
            d.materialize(average)
        })
        .require_change()
    }

    pub(super) fn validate(&self) -> Vec<ValidationError> {
        if self.drops.is_empty() {
            vec![empty_payload("Drops", "AddChanceDrops")]
        } else {
            Vec::new()
        }
    }
}

impl fmt::Display for AddChanceDrops {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Chance: {}, {} added drops", self.filter, self.drops.len())
    }
}

/// Overwrites counts and weights of drops already in the container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModifyChanceDrops {
    /// Container selection.
    #[serde(flatten)]
    pub filter: DropperFilter,
    /// New values, keyed by item id.
    #[serde(default)]
    pub modified_drops: Vec<AbsoluteChanceDrop>,
}

impl ModifyChanceDrops {
    /// Creates the op.
    #[must_use]
    pub fn new(filter: DropperFilter, modified_drops: Vec<AbsoluteChanceDrop>) -> Self {
        Self {
            filter,
            modified_drops,
        }
    }

    pub(super) fn apply(&self, dropper: &mut ChanceDropWrapper<'_>) -> ApplyOutcome {
        if self.modified_drops.is_empty() || !dropper.has_drops() {
            return ApplyOutcome::Skipped;
        }
        let modifications: HashMap<ItemId, &AbsoluteChanceDrop> =
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
            vec![empty_payload("ModifiedDrops", "ModifyChanceDrops")]
        } else {
            Vec::new()
        }
    }
}

impl fmt::Display for ModifyChanceDrops {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Chance: {}, {} modified drops",
            self.filter,
            self.modified_drops.len()
        )
    }
}

/// Removes weighted drops by item id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoveChanceDrops {
    /// Container selection.
    #[serde(flatten)]
    pub filter: DropperFilter,
    /// Items to remove.
    #[serde(default)]
    pub items_to_remove: Vec<ItemId>,
    #[serde(skip)]
    removal_set: OnceLock<HashSet<ItemId>>,
}

impl RemoveChanceDrops {
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

    pub(super) fn apply(&self, dropper: &mut ChanceDropWrapper<'_>) -> ApplyOutcome {
        let items = self
            .removal_set
            .get_or_init(|| self.items_to_remove.iter().copied().collect());
        remove_items(dropper, items)
    }

    pub(super) fn validate(&self) -> Vec<ValidationError> {
        if self.items_to_remove.is_empty() {
            vec![empty_payload("ItemsToRemove", "RemoveChanceDrops")]
        } else {
            Vec::new()
        }
    }
}

impl fmt::Display for RemoveChanceDrops {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Chance: {}, {} items to remove",
            self.filter,
            self.items_to_remove.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemDropChance;
    use crate::wrapper::memory::ItemGenerator;

    fn loot() -> ItemGenerator<ItemDropChance> {
        ItemGenerator::named(
            "Loot",
            vec![ItemDropChance::new(1, 1, 1, 5), ItemDropChance::new(2, 1, 1, 15)],
        )
    }

    #[test]
    fn relative_drop_uses_container_average() {
        let host = loot();
        let mut dropper = ChanceDropWrapper::simulated(0, &host);
        let op = AddChanceDrops::new(
            DropperFilter::any(),
            vec![ChanceDrop::relative(9, 1, 2, 0.5), ChanceDrop::absolute(1, 1, 1, 50)],
        );
        assert_eq!(op.apply(&mut dropper), ApplyOutcome::Changed);
        assert_eq!(dropper.drops().len(), 3);
        assert_eq!(dropper.drops()[2], ItemDropChance::new(9, 1, 2, 5));
        assert_eq!(op.apply(&mut dropper), ApplyOutcome::Skipped);
    }

    #[test]
    fn modify_overwrites_weight_and_resets_live_tables() {
        let mut host = loot();
        {
            let mut dropper = ChanceDropWrapper::live(0, &mut host);
            let op = ModifyChanceDrops::new(
                DropperFilter::any(),
                vec![AbsoluteChanceDrop::new(2, 1, 3, 15)],
            );
            assert_eq!(op.apply(&mut dropper), ApplyOutcome::Changed);
            assert_eq!(op.apply(&mut dropper), ApplyOutcome::Skipped);
        }
        assert_eq!(host.drops[1], ItemDropChance::new(2, 1, 3, 15));
        assert_eq!(host.resets, 1);
    }

    #[test]
    fn remove_disjoint_set_is_skipped() {
        let host = loot();
        let mut dropper = ChanceDropWrapper::simulated(0, &host);
        let op = RemoveChanceDrops::new(DropperFilter::any(), vec![ItemId(40)]);
        assert_eq!(op.apply(&mut dropper), ApplyOutcome::Skipped);
        assert!(!dropper.has_changes());
        assert!(op.validate().is_empty());
        assert_eq!(
            RemoveChanceDrops::default().validate(),
            vec![empty_payload("ItemsToRemove", "RemoveChanceDrops")]
        );
    }
}
