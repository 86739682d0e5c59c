//! Typed drop alterations.
//!
//! Every rule owns an ordered list of [`Alteration`]s. Mutation ops target
//! existing containers of one kind, selected by a [`DropperFilter`]; additional
//! ops synthesize whole containers from referenced drop tables.
//!
//! Matching always happens before mutation, and each `apply` either changes a
//! container completely or leaves it untouched.

mod additional;
mod chance;
mod guaranteed;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use additional::AdditionalDropTablesByUid;
pub use chance::{AddChanceDrops, ModifyChanceDrops, RemoveChanceDrops};
pub use guaranteed::{
    AddGuaranteedDrops, AddGuaranteedFromDropTable, ModifyGuaranteedDrops, RemoveGuaranteedDrops,
};

use crate::dropper_matcher::{dedup_matchers, DropperMatcher};
use crate::error::ValidationError;
use crate::item::{DropperKind, ItemDrop, ItemId};
use crate::tables::DropTableSource;
use crate::wrapper::{DropperRef, DropperWrapper};

const fn default_true() -> bool {
    true
}

/// Selects which containers of a holder a mutation op targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropperFilter {
    /// Generator name matchers; empty selects every container.
    #[serde(default)]
    pub matchers: Vec<DropperMatcher>,
    /// Stop after the first container that accepted the op.
    #[serde(default = "default_true")]
    pub first_match_only: bool,
}

impl Default for DropperFilter {
    fn default() -> Self {
        Self {
            matchers: Vec::new(),
            first_match_only: true,
        }
    }
}

impl DropperFilter {
    /// Filter selecting every container, first match only.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Filter with the given matchers, first match only.
    #[must_use]
    pub fn matching(matchers: Vec<DropperMatcher>) -> Self {
        Self {
            matchers,
            first_match_only: true,
        }
    }

    /// Sets the first-match-only policy.
    #[must_use]
    pub fn first_match_only(mut self, first_match_only: bool) -> Self {
        self.first_match_only = first_match_only;
        self
    }

    /// Returns true if a container with this generator name qualifies.
    #[must_use]
    pub fn is_match(&self, generator_name: Option<&str>) -> bool {
        self.matchers.is_empty() || self.matchers.iter().any(|m| m.is_match(generator_name))
    }

    /// Removes duplicate matchers and compiles patterns.
    pub fn prepare(&mut self) {
        dedup_matchers(&mut self.matchers);
        for matcher in &mut self.matchers {
            matcher.prepare();
        }
    }

    /// Configuration errors of the matchers.
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationError> {
        self.matchers.iter().filter_map(DropperMatcher::validate).collect()
    }
}

impl fmt::Display for DropperFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = if self.first_match_only { "first" } else { "all" };
        match self.matchers.as_slice() {
            [] if self.first_match_only => f.write_str("first changed dropper"),
            [] => f.write_str("all droppers"),
            [single] => write!(f, "{scope} matching '{single}'"),
            many => write!(f, "{scope} matching {} matchers", many.len()),
        }
    }
}

/// Result of applying an op to one container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The container did not take the op; later containers are still tried.
    Skipped,
    /// The container took the op but already had the requested state.
    Unchanged,
    /// The container was mutated.
    Changed,
}

impl ApplyOutcome {
    /// Returns true if the container was mutated.
    #[must_use]
    pub const fn changed(self) -> bool {
        matches!(self, Self::Changed)
    }

    /// Returns true if the container took the op, changed or not.
    #[must_use]
    pub const fn accepted(self) -> bool {
        !matches!(self, Self::Skipped)
    }

    /// Folds `Unchanged` into `Skipped` for ops that only claim a container they mutate.
    #[must_use]
    pub const fn require_change(self) -> Self {
        match self {
            Self::Unchanged => Self::Skipped,
            other => other,
        }
    }
}

/// Op families a rule partitions its alterations into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlterationFamily {
    /// Mutates guaranteed containers.
    Guaranteed,
    /// Mutates chance containers.
    Chance,
    /// Synthesizes new containers.
    Additional,
}

impl AlterationFamily {
    /// Returns true for families that mutate existing containers.
    #[must_use]
    pub const fn is_mutation(self) -> bool {
        matches!(self, Self::Guaranteed | Self::Chance)
    }
}

/// A single operation of a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Alteration {
    /// Appends guaranteed drops.
    AddGuaranteedDrops(AddGuaranteedDrops),
    /// Overwrites counts of guaranteed drops.
    ModifyGuaranteedDrops(ModifyGuaranteedDrops),
    /// Removes guaranteed drops by item id.
    RemoveGuaranteedDrops(RemoveGuaranteedDrops),
    /// Appends the guaranteed drops of referenced tables.
    AddGuaranteedFromDropTable(AddGuaranteedFromDropTable),
    /// Appends weighted drops.
    AddChanceDrops(AddChanceDrops),
    /// Overwrites counts and weights of weighted drops.
    ModifyChanceDrops(ModifyChanceDrops),
    /// Removes weighted drops by item id.
    RemoveChanceDrops(RemoveChanceDrops),
    /// Adds whole containers built from referenced tables.
    AdditionalDropTablesByUid(AdditionalDropTablesByUid),
    /// Unrecognized op type; never applied.
    #[serde(other)]
    Unknown,
}

impl Alteration {
    /// Type name used in logs and validation messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::AddGuaranteedDrops(_) => "AddGuaranteedDrops",
            Self::ModifyGuaranteedDrops(_) => "ModifyGuaranteedDrops",
            Self::RemoveGuaranteedDrops(_) => "RemoveGuaranteedDrops",
            Self::AddGuaranteedFromDropTable(_) => "AddGuaranteedFromDropTable",
            Self::AddChanceDrops(_) => "AddChanceDrops",
            Self::ModifyChanceDrops(_) => "ModifyChanceDrops",
            Self::RemoveChanceDrops(_) => "RemoveChanceDrops",
            Self::AdditionalDropTablesByUid(_) => "AdditionalDropTablesByUid",
            Self::Unknown => "Unknown",
        }
    }

    /// Family of this op; `None` for unrecognized ops.
    #[must_use]
    pub const fn family(&self) -> Option<AlterationFamily> {
        match self {
            Self::AddGuaranteedDrops(_)
            | Self::ModifyGuaranteedDrops(_)
            | Self::RemoveGuaranteedDrops(_)
            | Self::AddGuaranteedFromDropTable(_) => Some(AlterationFamily::Guaranteed),
            Self::AddChanceDrops(_) | Self::ModifyChanceDrops(_) | Self::RemoveChanceDrops(_) => {
                Some(AlterationFamily::Chance)
            }
            Self::AdditionalDropTablesByUid(_) => Some(AlterationFamily::Additional),
            Self::Unknown => None,
        }
    }

    /// Container filter of mutation ops.
    #[must_use]
    pub const fn filter(&self) -> Option<&DropperFilter> {
        match self {
            Self::AddGuaranteedDrops(op) => Some(&op.filter),
            Self::ModifyGuaranteedDrops(op) => Some(&op.filter),
            Self::RemoveGuaranteedDrops(op) => Some(&op.filter),
            Self::AddGuaranteedFromDropTable(op) => Some(&op.filter),
            Self::AddChanceDrops(op) => Some(&op.filter),
            Self::ModifyChanceDrops(op) => Some(&op.filter),
            Self::RemoveChanceDrops(op) => Some(&op.filter),
            Self::AdditionalDropTablesByUid(_) | Self::Unknown => None,
        }
    }

    fn filter_mut(&mut self) -> Option<&mut DropperFilter> {
        match self {
            Self::AddGuaranteedDrops(op) => Some(&mut op.filter),
            Self::ModifyGuaranteedDrops(op) => Some(&mut op.filter),
            Self::RemoveGuaranteedDrops(op) => Some(&mut op.filter),
            Self::AddGuaranteedFromDropTable(op) => Some(&mut op.filter),
            Self::AddChanceDrops(op) => Some(&mut op.filter),
            Self::ModifyChanceDrops(op) => Some(&mut op.filter),
            Self::RemoveChanceDrops(op) => Some(&mut op.filter),
            Self::AdditionalDropTablesByUid(_) | Self::Unknown => None,
        }
    }

    /// Whether the op stops after the first accepting container.
    #[must_use]
    pub fn first_match_only(&self) -> bool {
        self.filter().map_or(true, |f| f.first_match_only)
    }

    /// Builds derived state after deserialization and drops stale caches.
    pub fn prepare(&mut self) {
        if let Some(filter) = self.filter_mut() {
            filter.prepare();
        }
        match self {
            Self::RemoveGuaranteedDrops(op) => op.prepare(),
            Self::RemoveChanceDrops(op) => op.prepare(),
            Self::AddGuaranteedFromDropTable(op) => op.clear_cache(),
            _ => {}
        }
    }

    /// Resolves table references, then validates.
    pub fn activate(&mut self, tables: &dyn DropTableSource) -> Vec<ValidationError> {
        if let Self::AddGuaranteedFromDropTable(op) = self {
            op.resolve(tables);
        }
        self.validate(tables)
    }

    /// Collects configuration and reference errors.
    #[must_use]
    pub fn validate(&self, tables: &dyn DropTableSource) -> Vec<ValidationError> {
        let mut errors = self.filter().map(DropperFilter::validate).unwrap_or_default();
        match self {
            Self::AddGuaranteedDrops(op) => errors.extend(op.validate()),
            Self::ModifyGuaranteedDrops(op) => errors.extend(op.validate()),
            Self::RemoveGuaranteedDrops(op) => errors.extend(op.validate()),
            Self::AddGuaranteedFromDropTable(op) => errors.extend(op.validate(tables)),
            Self::AddChanceDrops(op) => errors.extend(op.validate()),
            Self::ModifyChanceDrops(op) => errors.extend(op.validate()),
            Self::RemoveChanceDrops(op) => errors.extend(op.validate()),
            Self::AdditionalDropTablesByUid(op) => errors.extend(op.validate(tables)),
            Self::Unknown => errors.push(ValidationError::UnknownAlteration),
        }
        errors
    }

    /// Referenced table uids that could not be resolved at activation.
    #[must_use]
    pub fn unresolved_references(&self) -> &[String] {
        match self {
            Self::AddGuaranteedFromDropTable(op) => op.missing(),
            _ => &[],
        }
    }

    /// The additional-drop op, if this is one.
    #[must_use]
    pub const fn as_additional(&self) -> Option<&AdditionalDropTablesByUid> {
        match self {
            Self::AdditionalDropTablesByUid(op) => Some(op),
            _ => None,
        }
    }

    /// Returns true if the op targets this container.
    #[must_use]
    pub fn is_match(&self, dropper: &DropperRef<'_, '_>) -> bool {
        let Some(filter) = self.filter() else {
            return false;
        };
        let kind = match self.family() {
            Some(AlterationFamily::Guaranteed) => DropperKind::Guaranteed,
            Some(AlterationFamily::Chance) => DropperKind::Chance,
            _ => return false,
        };
        if dropper.kind() != kind || !filter.is_match(dropper.generator_name()) {
            return false;
        }
        match (self, dropper) {
            (Self::AddGuaranteedDrops(op), _) => !op.drops.is_empty(),
            (Self::AddGuaranteedFromDropTable(op), _) => !op.drops().is_empty(),
            (Self::AddChanceDrops(op), _) => !op.drops.is_empty(),
            (Self::RemoveGuaranteedDrops(op), _) => !op.items_to_remove.is_empty(),
            (Self::RemoveChanceDrops(op), _) => !op.items_to_remove.is_empty(),
            (Self::ModifyGuaranteedDrops(op), DropperRef::Guaranteed(d)) => {
                overlaps(d.items(), op.modified_drops.iter().map(|m| m.item_id))
            }
            (Self::ModifyChanceDrops(op), DropperRef::Chance(d)) => {
                overlaps(d.items(), op.modified_drops.iter().map(|m| m.item_id))
            }
            _ => false,
        }
    }

    /// Applies the op to a container without checking the filter.
    ///
    /// A container of the wrong kind is skipped.
    pub fn apply(&self, dropper: DropperRef<'_, '_>) -> ApplyOutcome {
        match (self, dropper) {
            (Self::AddGuaranteedDrops(op), DropperRef::Guaranteed(d)) => op.apply(d),
            (Self::ModifyGuaranteedDrops(op), DropperRef::Guaranteed(d)) => op.apply(d),
            (Self::RemoveGuaranteedDrops(op), DropperRef::Guaranteed(d)) => op.apply(d),
            (Self::AddGuaranteedFromDropTable(op), DropperRef::Guaranteed(d)) => op.apply(d),
            (Self::AddChanceDrops(op), DropperRef::Chance(d)) => op.apply(d),
            (Self::ModifyChanceDrops(op), DropperRef::Chance(d)) => op.apply(d),
            (Self::RemoveChanceDrops(op), DropperRef::Chance(d)) => op.apply(d),
            _ => ApplyOutcome::Skipped,
        }
    }

    /// Applies the op iff it matches the container.
    pub fn try_apply(&self, dropper: DropperRef<'_, '_>) -> ApplyOutcome {
        if self.is_match(&dropper) {
            self.apply(dropper)
        } else {
            ApplyOutcome::Skipped
        }
    }
}

impl fmt::Display for Alteration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddGuaranteedDrops(op) => write!(f, "{op}"),
            Self::ModifyGuaranteedDrops(op) => write!(f, "{op}"),
            Self::RemoveGuaranteedDrops(op) => write!(f, "{op}"),
            Self::AddGuaranteedFromDropTable(op) => write!(f, "{op}"),
            Self::AddChanceDrops(op) => write!(f, "{op}"),
            Self::ModifyChanceDrops(op) => write!(f, "{op}"),
            Self::RemoveChanceDrops(op) => write!(f, "{op}"),
            Self::AdditionalDropTablesByUid(op) => write!(f, "{op}"),
            Self::Unknown => f.write_str("Unknown alteration"),
        }
    }
}

fn overlaps(items: &HashSet<ItemId>, mut ids: impl Iterator<Item = ItemId>) -> bool {
    ids.any(|id| items.contains(&id))
}

/// Appends one entry per payload item the container lacks.
///
/// Returns `Unchanged` when every item is already present.
fn append_missing<D, P>(
    dropper: &mut DropperWrapper<'_, D>,
    payload: &[P],
    item_id: impl Fn(&P) -> ItemId,
    materialize: impl Fn(&P) -> D,
) -> ApplyOutcome
where
    D: ItemDrop,
{
    if payload.is_empty() {
        return ApplyOutcome::Skipped;
    }
    let mut seen = HashSet::new();
    let additions: Vec<D> = payload
        .iter()
        .filter(|p| {
            let id = item_id(*p);
            !dropper.contains(id) && seen.insert(id)
        })
        .map(materialize)
        .collect();
    if additions.is_empty() {
        return ApplyOutcome::Unchanged;
    }
    dropper.drops_mut().extend(additions);
    dropper.set_has_changes();
    ApplyOutcome::Changed
}

/// Removes every entry whose item id is in `items`.
fn remove_items<D: ItemDrop>(
    dropper: &mut DropperWrapper<'_, D>,
    items: &HashSet<ItemId>,
) -> ApplyOutcome {
    if items.is_empty() || !dropper.has_drops() {
        return ApplyOutcome::Skipped;
    }
    let drops = dropper.drops_mut();
    let before = drops.len();
    drops.retain(|d| !items.contains(&d.item_id()));
    if drops.len() == before {
        return ApplyOutcome::Skipped;
    }
    dropper.set_has_changes();
    ApplyOutcome::Changed
}

fn empty_payload(field: &'static str, alteration: &'static str) -> ValidationError {
    ValidationError::EmptyPayload { field, alteration }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::HolderIdentity;
    use crate::item::{BasicItemDrop, ChanceDrop, GuaranteedDrop, ItemDropChance};
    use crate::tables::InMemoryDropTables;
    use crate::wrapper::memory::{InMemoryDropable, ItemGenerator};
    use crate::wrapper::DropableWrapper;

    fn two_pouches() -> InMemoryDropable {
        InMemoryDropable::new(HolderIdentity::named("Chest"))
            .with_guaranteed(ItemGenerator::named("Pouch", vec![BasicItemDrop::new(1, 1, 1)]))
            .with_guaranteed(ItemGenerator::named("Pouch", vec![BasicItemDrop::new(1, 1, 1)]))
            .with_chance(ItemGenerator::named("Loot", vec![ItemDropChance::new(2, 1, 1, 10)]))
    }

    #[test]
    fn filter_display() {
        assert_eq!(DropperFilter::any().to_string(), "first changed dropper");
        assert_eq!(DropperFilter::any().first_match_only(false).to_string(), "all droppers");
        assert_eq!(
            DropperFilter::matching(vec![DropperMatcher::exact("A")]).to_string(),
            "first matching 'Exact 'A''"
        );
        assert_eq!(
            DropperFilter::matching(vec![DropperMatcher::exact("A"), DropperMatcher::contains("B")])
                .first_match_only(false)
                .to_string(),
            "all matching 2 matchers"
        );
    }

    #[test]
    fn filter_prepare_dedups_matchers() {
        let mut filter = DropperFilter::matching(vec![
            DropperMatcher::exact("A"),
            DropperMatcher::exact("A"),
        ]);
        filter.prepare();
        assert_eq!(filter.matchers.len(), 1);
    }

    #[test]
    fn kind_guard_rejects_other_container_kind() {
        let host = two_pouches();
        let mut wrapper = DropableWrapper::simulated(&host);
        let op = Alteration::AddChanceDrops(AddChanceDrops::new(
            DropperFilter::any(),
            vec![ChanceDrop::absolute(5, 1, 1, 3)],
        ));
        let guaranteed = DropperRef::Guaranteed(&mut wrapper.guaranteed_droppers_mut()[0]);
        assert!(!op.is_match(&guaranteed));
        assert_eq!(op.apply(guaranteed), ApplyOutcome::Skipped);

        let chance = DropperRef::Chance(&mut wrapper.chance_droppers_mut()[0]);
        assert_eq!(op.try_apply(chance), ApplyOutcome::Changed);
    }

    #[test]
    fn add_is_idempotent() {
        let host = two_pouches();
        let mut wrapper = DropableWrapper::simulated(&host);
        let op = Alteration::AddGuaranteedDrops(AddGuaranteedDrops::new(
            DropperFilter::any(),
            vec![GuaranteedDrop::new(7, 1, 2), GuaranteedDrop::new(7, 3, 3)],
        ));
        let dropper = &mut wrapper.guaranteed_droppers_mut()[0];
        assert_eq!(op.try_apply(DropperRef::Guaranteed(&mut *dropper)), ApplyOutcome::Changed);
        assert_eq!(op.try_apply(DropperRef::Guaranteed(&mut *dropper)), ApplyOutcome::Unchanged);
        let ids: Vec<i32> = dropper.drops().iter().map(|d| d.item_id.get()).collect();
        assert_eq!(ids, vec![1, 7]);
    }

    #[test]
    fn unknown_tag_deserializes_to_unknown() {
        let json = r#"{"type":"shuffle_drops","seed":3}"#;
        let op: Alteration = serde_json::from_str(json).unwrap();
        assert!(matches!(op, Alteration::Unknown));
        assert!(op.family().is_none());
        assert_eq!(
            op.validate(&InMemoryDropTables::new()),
            vec![ValidationError::UnknownAlteration]
        );
    }

    #[test]
    fn deserializes_flattened_filter() {
        let json = r#"{
            "type": "remove_chance_drops",
            "matchers": [{"type": "generator_name", "name": "Loot", "match": "contains"}],
            "first_match_only": false,
            "items_to_remove": [2]
        }"#;
        let mut op: Alteration = serde_json::from_str(json).unwrap();
        op.prepare();
        assert!(!op.first_match_only());
        assert_eq!(op.to_string(), "Chance: all matching 'Contains 'Loot'', 1 items to remove");
    }

    #[test]
    fn filter_errors_are_reported() {
        let op = Alteration::RemoveGuaranteedDrops(RemoveGuaranteedDrops::new(
            DropperFilter::matching(vec![DropperMatcher::regex("(")]),
            vec![ItemId(1)],
        ));
        let errors = op.validate(&InMemoryDropTables::new());
        assert!(matches!(errors.as_slice(), [ValidationError::InvalidRegex { .. }]));
    }
}
