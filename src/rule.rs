//! Alteration rules.
//!
//! A rule pairs a target class and a constraint tree with an ordered list of
//! alterations. Rules move through a small lifecycle before they are used:
//!
//! ```text
//! Unloaded --prepare--> Applied --activate--> Validated --> Active
//! ```
//!
//! `prepare` injects owner hints and builds op caches; `activate` resolves
//! table references once every rule source is loaded and marks ops with
//! configuration errors as inert. Only `Active` rules are applied.

use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::alteration::{Alteration, AlterationFamily};
use crate::constraint::{Constraint, OwnerHint};
use crate::error::ValidationError;
use crate::identity::HolderIdentity;
use crate::region::RegionResolver;
use crate::tables::{DropTableSource, MaterializationTarget};
use crate::wrapper::DropableWrapper;

/// Class of holders a rule targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetType {
    /// Merchant inventories.
    Merchant,
    /// Chests, junk piles and other loot containers.
    LootContainer,
    /// Enemy and monster drops.
    EnemyOrMonster,
}

impl TargetType {
    /// Every target type.
    pub const ALL: [Self; 3] = [Self::Merchant, Self::LootContainer, Self::EnemyOrMonster];

    /// Owner lookup used by owner uid constraints of rules with this target.
    #[must_use]
    pub const fn owner_hint(self) -> OwnerHint {
        match self {
            Self::Merchant => OwnerHint::Merchant,
            Self::LootContainer => OwnerHint::TreasureChest,
            Self::EnemyOrMonster => OwnerHint::None,
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Merchant => "Merchant",
            Self::LootContainer => "LootContainer",
            Self::EnemyOrMonster => "EnemyOrMonster",
        })
    }
}

/// Lifecycle state of a rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleState {
    /// Freshly constructed, or without any alteration.
    #[default]
    Unloaded,
    /// Constraint tree and op caches are built.
    Applied,
    /// References were checked.
    Validated,
    /// Ready to be applied.
    Active,
}

/// Op indices per family, in declaration order.
#[derive(Debug, Clone, Default)]
struct Partitions {
    mutation: Vec<usize>,
    additional: Vec<usize>,
}

/// A target class, a constraint tree and an ordered list of alterations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlterationRule {
    uid: String,
    target_type: TargetType,
    #[serde(default)]
    matcher: Constraint,
    #[serde(default)]
    alterations: Vec<Alteration>,
    #[serde(skip)]
    state: RuleState,
    #[serde(skip)]
    inert: Vec<bool>,
    #[serde(skip)]
    partitions: OnceLock<Partitions>,
}

impl AlterationRule {
    /// Creates an unloaded rule matching nothing.
    #[must_use]
    pub fn new(uid: impl Into<String>, target_type: TargetType) -> Self {
        Self {
            uid: uid.into(),
            target_type,
            matcher: Constraint::default(),
            alterations: Vec::new(),
            state: RuleState::Unloaded,
            inert: Vec::new(),
            partitions: OnceLock::new(),
        }
    }

    /// Sets the constraint tree.
    #[must_use]
    pub fn with_matcher(mut self, matcher: Constraint) -> Self {
        self.matcher = matcher;
        self
    }

    /// Appends an alteration.
    #[must_use]
    pub fn with_alteration(mut self, alteration: Alteration) -> Self {
        self.alterations_mut().push(alteration);
        self
    }

    /// Stable unique id, conventionally `"<pack>.<file>"`.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Targeted holder class.
    #[must_use]
    pub const fn target_type(&self) -> TargetType {
        self.target_type
    }

    /// Constraint tree.
    #[must_use]
    pub const fn matcher(&self) -> &Constraint {
        &self.matcher
    }

    /// Alterations in declaration order.
    #[must_use]
    pub fn alterations(&self) -> &[Alteration] {
        &self.alterations
    }

    /// Mutable alterations.
    ///
    /// Drops cached partitions and inert marks; the rule must be prepared
    /// and activated again before it is applied.
    pub fn alterations_mut(&mut self) -> &mut Vec<Alteration> {
        self.reset();
        &mut self.alterations
    }

    /// Replaces the alterations.
    pub fn set_alterations(&mut self, alterations: Vec<Alteration>) {
        *self.alterations_mut() = alterations;
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn state(&self) -> RuleState {
        self.state
    }

    /// Returns true once the rule may be applied.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == RuleState::Active
    }

    /// Returns true if an op references a table the last activation could not find.
    #[must_use]
    pub fn has_unresolved_references(&self) -> bool {
        self.is_active()
            && self
                .alterations
                .iter()
                .any(|a| !a.unresolved_references().is_empty())
    }

    /// Returns true if the op at `index` was disabled by a configuration error.
    #[must_use]
    pub fn is_inert(&self, index: usize) -> bool {
        self.inert.get(index).copied().unwrap_or(false)
    }

    fn reset(&mut self) {
        self.partitions = OnceLock::new();
        self.inert.clear();
        self.state = RuleState::Unloaded;
    }

    /// Builds the constraint tree and op caches.
    ///
    /// A rule without alterations stays `Unloaded` and returns false.
    pub fn prepare(&mut self) -> bool {
        self.reset();
        if self.alterations.is_empty() {
            tracing::warn!(
                rule = %self.uid,
                "No Alterations configured for alteration rule '{}'!",
                self.uid
            );
            return false;
        }

        self.matcher.set_owner_hint(self.target_type.owner_hint());
        self.matcher.prepare();
        for alteration in &mut self.alterations {
            alteration.prepare();
        }
        self.state = RuleState::Applied;
        tracing::debug!(rule = %self.uid, class = %self.target_type, "Registered alteration rule");
        true
    }

    /// Resolves references, validates and activates a prepared rule.
    ///
    /// Ops with configuration errors become inert; reference errors are
    /// reported but leave the op enabled. Returns the formatted errors.
    pub fn activate(&mut self, tables: &dyn DropTableSource) -> Option<Vec<String>> {
        if self.state == RuleState::Unloaded {
            return self.validate(tables);
        }
        self.partitions = OnceLock::new();

        let mut errors = self.matcher.validate();
        let mut inert = Vec::with_capacity(self.alterations.len());
        for (i, alteration) in self.alterations.iter_mut().enumerate() {
            let op_errors = alteration.activate(tables);
            inert.push(op_errors.iter().any(|e| !e.is_reference()));
            errors.extend(op_errors.iter().map(|e| format!("Alterations[{i}]: {e}")));
        }
        self.inert = inert;
        self.state = RuleState::Validated;

        if !errors.is_empty() {
            let mut message = String::new();
            for error in &errors {
                message.push_str("\n  - ");
                message.push_str(error);
            }
            tracing::warn!(
                rule = %self.uid,
                "Following errors were reported when validating fields for {}:{message}",
                self.uid
            );
        }
        self.state = RuleState::Active;
        (!errors.is_empty()).then_some(errors)
    }

    /// Collects every validation error without changing the rule.
    #[must_use]
    pub fn validate(&self, tables: &dyn DropTableSource) -> Option<Vec<String>> {
        if self.alterations.is_empty() {
            return Some(vec![ValidationError::NoAlterations.to_string()]);
        }
        let mut errors = self.matcher.validate();
        for (i, alteration) in self.alterations.iter().enumerate() {
            errors.extend(
                alteration
                    .validate(tables)
                    .iter()
                    .map(|e| format!("Alterations[{i}]: {e}")),
            );
        }
        (!errors.is_empty()).then_some(errors)
    }

    fn partitions(&self) -> &Partitions {
        self.partitions.get_or_init(|| {
            let mut partitions = Partitions::default();
            for (i, alteration) in self.alterations.iter().enumerate() {
                match alteration.family() {
                    None => tracing::error!(
                        rule = %self.uid,
                        index = i,
                        "Unknown alteration type at index {i} in {}",
                        self.uid
                    ),
                    _ if self.is_inert(i) => {}
                    Some(family) if family.is_mutation() => partitions.mutation.push(i),
                    Some(_) => partitions.additional.push(i),
                }
            }
            partitions
        })
    }

    /// Returns true if an enabled op mutates existing containers.
    #[must_use]
    pub fn has_mutations(&self) -> bool {
        !self.partitions().mutation.is_empty()
    }

    /// Returns true if an enabled op adds containers.
    #[must_use]
    pub fn has_additional_drops(&self) -> bool {
        !self.partitions().additional.is_empty()
    }

    /// Returns true if the enabled ops include one of `family`.
    #[must_use]
    pub fn has_family(&self, family: AlterationFamily) -> bool {
        let partitions = self.partitions();
        partitions
            .mutation
            .iter()
            .chain(&partitions.additional)
            .any(|&i| self.alterations[i].family() == Some(family))
    }

    /// Evaluates the constraint tree.
    #[must_use]
    pub fn is_match(&self, holder: &HolderIdentity, regions: &RegionResolver) -> bool {
        self.matcher.is_match(holder, regions)
    }

    /// Applies every enabled mutation op to a matching holder.
    ///
    /// Returns true if this rule changed any container.
    pub fn try_update(&self, dropable: &mut DropableWrapper<'_>, regions: &RegionResolver) -> bool {
        if !self.is_active() {
            return false;
        }
        let mutations = &self.partitions().mutation;
        if mutations.is_empty() || !self.is_match(dropable.identity(), regions) {
            return false;
        }

        let mut changed = false;
        for &i in mutations {
            let alteration = &self.alterations[i];
            for uid in alteration.unresolved_references() {
                tracing::error!(
                    rule = %self.uid,
                    index = i,
                    "Unable to find drop table with UID '{uid}'!"
                );
            }

            let mut found = false;
            for dropper in dropable.droppers_mut() {
                let outcome = alteration.try_apply(dropper);
                changed |= outcome.changed();
                if outcome.accepted() {
                    found = true;
                    if alteration.first_match_only() {
                        break;
                    }
                }
            }
            if !found {
                tracing::warn!(
                    rule = %self.uid,
                    index = i,
                    "Alteration rule '{}' was unable to find ItemDropper for Alterations[{i}] {} for {dropable}",
                    self.uid,
                    alteration.type_name()
                );
            }
        }
        changed
    }

    /// Rolls the referenced tables of additional ops into `target`.
    ///
    /// Returns true once the rule matched the holder, even when none of its
    /// referenced tables exist in `tables`.
    pub fn try_generate_additional_items(
        &self,
        holder: &HolderIdentity,
        regions: &RegionResolver,
        tables: &dyn DropTableSource,
        target: &mut dyn MaterializationTarget,
    ) -> bool {
        if !self.is_active() || tables.is_empty() {
            return false;
        }
        let additional = &self.partitions().additional;
        if additional.is_empty() || !self.is_match(holder, regions) {
            return false;
        }
        for op in additional.iter().filter_map(|&i| self.alterations[i].as_additional()) {
            op.generate_additional_items(tables, target);
        }
        true
    }

    /// Appends the containers of additional ops to a matching holder.
    ///
    /// Returns how many containers were added.
    pub fn add_additional_droppers_to(
        &self,
        dropable: &mut DropableWrapper<'_>,
        regions: &RegionResolver,
        tables: &dyn DropTableSource,
    ) -> usize {
        if !self.is_active() || tables.is_empty() {
            return 0;
        }
        let additional = &self.partitions().additional;
        if additional.is_empty() || !self.is_match(dropable.identity(), regions) {
            return 0;
        }
        additional
            .iter()
            .filter_map(|&i| self.alterations[i].as_additional())
            .map(|op| op.add_additional_droppers(dropable, tables))
            .sum()
    }
}

impl fmt::Display for AlterationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.uid, self.target_type)
    }
}
