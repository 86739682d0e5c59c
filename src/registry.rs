//! Loaded rule set with per-class lookup caches.
//!
//! The registry is read-only while holders are processed. Loading and
//! reloading take `&mut self`, so a reload can never overlap a pass.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use crate::identity::HolderIdentity;
use crate::region::RegionResolver;
use crate::rule::AlterationRule;
use crate::rule::TargetType;
use crate::tables::{DropTableSource, MaterializationTarget};
use crate::wrapper::DropableWrapper;

type ClassCache = RwLock<HashMap<TargetType, Vec<usize>>>;

/// All loaded alteration rules.
#[derive(Default)]
pub struct AlterationRegistry {
    rules: Vec<AlterationRule>,
    regions: RegionResolver,
    mutation_cache: ClassCache,
    additional_cache: ClassCache,
}

impl fmt::Debug for AlterationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlterationRegistry")
            .field("rules", &self.rules.len())
            .field("regions", &self.regions)
            .finish_non_exhaustive()
    }
}

impl AlterationRegistry {
    /// Creates an empty registry with the built-in region table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry with a custom region resolver.
    #[must_use]
    pub fn with_regions(regions: RegionResolver) -> Self {
        Self {
            regions,
            ..Self::default()
        }
    }

    /// Region resolver used by region constraints.
    #[must_use]
    pub const fn regions(&self) -> &RegionResolver {
        &self.regions
    }

    /// Every registered rule, inert ones included.
    #[must_use]
    pub fn rules(&self) -> &[AlterationRule] {
        &self.rules
    }

    /// Rule registered under `uid`.
    #[must_use]
    pub fn get(&self, uid: &str) -> Option<&AlterationRule> {
        self.rules.iter().find(|r| r.uid() == uid)
    }

    /// Number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if no rule is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Registers rules, then runs the activation pass over them.
    ///
    /// A rule whose uid is already registered replaces the old one. Earlier
    /// rules with unresolved table references are activated again against
    /// `tables`. Returns the number of newly active rules.
    pub fn load(&mut self, rules: Vec<AlterationRule>, tables: &dyn DropTableSource) -> usize {
        let mut loaded = Vec::with_capacity(rules.len());
        for mut rule in rules {
            rule.prepare();
            if let Some(pos) = self.rules.iter().position(|r| r.uid() == rule.uid()) {
                tracing::warn!(rule = %rule.uid(), "Replacing already registered alteration rule");
                self.rules[pos] = rule;
                loaded.push(pos);
            } else {
                loaded.push(self.rules.len());
                self.rules.push(rule);
            }
        }
        loaded.sort_unstable();
        loaded.dedup();

        // References may point at tables registered by later sources, so
        // activation only starts once the whole batch is in.
        for &i in &loaded {
            self.rules[i].activate(tables);
        }
        // Rules from earlier batches may reference tables this source adds.
        for (i, rule) in self.rules.iter_mut().enumerate() {
            if loaded.binary_search(&i).is_err() && rule.has_unresolved_references() {
                tracing::debug!(
                    rule = %rule.uid(),
                    "Re-activating rule with unresolved drop tables"
                );
                rule.activate(tables);
            }
        }
        self.clear_caches();

        let active = loaded.iter().filter(|&&i| self.rules[i].is_active()).count();
        tracing::info!(loaded = loaded.len(), active, "Loaded alteration rules");
        active
    }

    /// Replaces the whole rule set.
    pub fn reload(&mut self, rules: Vec<AlterationRule>, tables: &dyn DropTableSource) -> usize {
        self.rules.clear();
        self.clear_caches();
        self.load(rules, tables)
    }

    fn clear_caches(&mut self) {
        self.mutation_cache = ClassCache::default();
        self.additional_cache = ClassCache::default();
    }

    fn cached<F>(&self, cache: &ClassCache, target: TargetType, qualifies: F) -> Vec<usize>
    where
        F: Fn(&AlterationRule) -> bool,
    {
        if let Ok(map) = cache.read() {
            if let Some(indices) = map.get(&target) {
                return indices.clone();
            }
        }
        let indices: Vec<usize> = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_active() && r.target_type() == target && qualifies(*r))
            .map(|(i, _)| i)
            .collect();
        if let Ok(mut map) = cache.write() {
            map.insert(target, indices.clone());
        }
        indices
    }

    /// Active rules for `target` with at least one mutation op, in load order.
    #[must_use]
    pub fn rules_for(&self, target: TargetType) -> Vec<&AlterationRule> {
        self.cached(&self.mutation_cache, target, AlterationRule::has_mutations)
            .into_iter()
            .map(|i| &self.rules[i])
            .collect()
    }

    /// Active rules for `target` with at least one additional-drop op.
    #[must_use]
    pub fn additional_rules_for(&self, target: TargetType) -> Vec<&AlterationRule> {
        self.cached(&self.additional_cache, target, AlterationRule::has_additional_drops)
            .into_iter()
            .map(|i| &self.rules[i])
            .collect()
    }

    /// Number of target classes with a cached lookup.
    #[must_use]
    pub fn cached_classes(&self) -> usize {
        let count = |cache: &ClassCache| cache.read().map(|m| m.len()).unwrap_or(0);
        count(&self.mutation_cache) + count(&self.additional_cache)
    }

    /// Aggregated validation errors, prefixed by rule uid.
    #[must_use]
    pub fn validate(&self, tables: &dyn DropTableSource) -> Option<Vec<String>> {
        let errors: Vec<String> = self
            .rules
            .iter()
            .flat_map(|rule| {
                rule.validate(tables)
                    .unwrap_or_default()
                    .into_iter()
                    .map(move |e| format!("{}: {e}", rule.uid()))
            })
            .collect();
        (!errors.is_empty()).then_some(errors)
    }

    /// Applies every matching rule for `target`; returns true if any changed the holder.
    pub fn try_update(&self, target: TargetType, dropable: &mut DropableWrapper<'_>) -> bool {
        let mut changed = false;
        for rule in self.rules_for(target) {
            changed |= rule.try_update(dropable, &self.regions);
        }
        changed
    }

    /// Runs the additional-drop rules for `target`; returns true if any rule matched.
    pub fn try_generate_additional_items(
        &self,
        target: TargetType,
        holder: &HolderIdentity,
        tables: &dyn DropTableSource,
        materialize: &mut dyn MaterializationTarget,
    ) -> bool {
        let mut generated = false;
        for rule in self.additional_rules_for(target) {
            generated |=
                rule.try_generate_additional_items(holder, &self.regions, tables, materialize);
        }
        generated
    }

    /// Appends the containers of additional-drop rules for `target`.
    pub fn add_additional_droppers_to(
        &self,
        target: TargetType,
        dropable: &mut DropableWrapper<'_>,
        tables: &dyn DropTableSource,
    ) -> usize {
        self.additional_rules_for(target)
            .into_iter()
            .map(|rule| rule.add_additional_droppers_to(dropable, &self.regions, tables))
            .sum()
    }
}
