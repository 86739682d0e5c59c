//! Patch sessions over holders handed over by the host.
//!
//! The patcher owns the registry and the table source, and knows which
//! merchant inventories were already patched in the current scene. Hosts call
//! into it from their own hooks; installing those hooks is not its concern.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::config::DropsConfig;
use crate::identity::HolderIdentity;
use crate::registry::AlterationRegistry;
use crate::report::{ItemCatalog, NoCatalog};
use crate::rule::{AlterationRule, TargetType};
use crate::tables::{DropTableSource, MaterializationTarget};
use crate::wrapper::{Dropable, DropableWrapper};

/// Result of patching one group of holders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupPatch {
    /// Whether any holder of the group changed.
    pub changed: bool,
    /// Multi-line report, built for dry runs and in debug mode.
    pub report: Option<String>,
}

fn action(changed: bool, simulate: bool) -> &'static str {
    match (changed, simulate) {
        (false, _) => "Will not update",
        (true, true) => "Would update",
        (true, false) => "Updated",
    }
}

fn merchant_label(identity: &HolderIdentity) -> String {
    format!("a merchant {identity}")
}

/// Applies the loaded rules to host holders.
pub struct DropsPatcher {
    config: DropsConfig,
    registry: AlterationRegistry,
    tables: Arc<dyn DropTableSource>,
    catalog: Arc<dyn ItemCatalog>,
    updated_merchants: HashSet<String>,
}

impl fmt::Debug for DropsPatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DropsPatcher")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("updated_merchants", &self.updated_merchants.len())
            .finish_non_exhaustive()
    }
}

impl DropsPatcher {
    /// Creates a patcher with an empty registry.
    pub fn new(config: DropsConfig, tables: Arc<dyn DropTableSource>) -> Self {
        Self {
            config,
            registry: AlterationRegistry::new(),
            tables,
            catalog: Arc::new(NoCatalog),
            updated_merchants: HashSet::new(),
        }
    }

    /// Uses `catalog` to name items in reports.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<dyn ItemCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Uses a prebuilt registry.
    #[must_use]
    pub fn with_registry(mut self, registry: AlterationRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Current config.
    #[must_use]
    pub const fn config(&self) -> &DropsConfig {
        &self.config
    }

    /// Replaces the config.
    pub fn set_config(&mut self, config: DropsConfig) {
        if config.enabled != self.config.enabled {
            tracing::info!(enabled = config.enabled, "Drop table patching toggled");
        }
        self.config = config;
    }

    /// Loaded rules.
    #[must_use]
    pub const fn registry(&self) -> &AlterationRegistry {
        &self.registry
    }

    /// Table source used for references.
    #[must_use]
    pub fn tables(&self) -> &dyn DropTableSource {
        self.tables.as_ref()
    }

    /// Registers rules; returns how many became active.
    pub fn load_rules(&mut self, rules: Vec<AlterationRule>) -> usize {
        self.registry.load(rules, self.tables.as_ref())
    }

    /// Replaces every rule; returns how many became active.
    pub fn reload_rules(&mut self, rules: Vec<AlterationRule>) -> usize {
        self.registry.reload(rules, self.tables.as_ref())
    }

    /// Aggregated validation errors of all rules.
    #[must_use]
    pub fn validate(&self) -> Option<Vec<String>> {
        self.registry.validate(self.tables.as_ref())
    }

    /// Returns true if the merchant inventory `uid` was patched in this scene.
    #[must_use]
    pub fn is_merchant_updated(&self, uid: &str) -> bool {
        self.updated_merchants.contains(uid)
    }

    /// Forgets every patched merchant inventory.
    pub fn on_scene_loaded(&mut self) {
        if !self.updated_merchants.is_empty() {
            tracing::debug!(
                count = self.updated_merchants.len(),
                "Clearing updated merchant inventories"
            );
        }
        self.updated_merchants.clear();
    }

    /// Scene hook that also sees the holders of the new scene.
    ///
    /// With `simulate` set, dry runs the merchants and every enemy group and
    /// returns their reports. Nothing is mutated either way.
    pub fn on_scene_loaded_with<H: Dropable>(
        &mut self,
        merchants: &[H],
        enemies: &[(String, Vec<H>)],
    ) -> Vec<String> {
        self.on_scene_loaded();
        if !self.config.enabled || !self.config.simulate {
            return Vec::new();
        }

        let mut reports = self.simulate_merchants(merchants);
        for (label, holders) in enemies {
            if let Some(report) = self
                .simulate_group(TargetType::EnemyOrMonster, label, holders)
                .report
            {
                reports.push(report);
            }
        }
        reports
    }

    /// Forgets a merchant inventory that was rebuilt by the host.
    pub fn on_merchant_initialized(&mut self, inventory_uid: &str) {
        if self.updated_merchants.remove(inventory_uid) {
            tracing::warn!(
                uid = %inventory_uid,
                "Merchant inventory (UID={inventory_uid}) was already updated before the merchant initialized!"
            );
        }
    }

    /// Wraps `holder` and applies the mutation rules of `target`.
    ///
    /// Returns the wrapper untouched when patching is disabled.
    pub fn patch_holder<'h>(
        &self,
        target: TargetType,
        holder: &'h mut dyn Dropable,
        simulate: bool,
    ) -> DropableWrapper<'h> {
        let mut wrapper = DropableWrapper::new(holder, simulate);
        if self.config.enabled {
            self.registry.try_update(target, &mut wrapper);
        }
        wrapper
    }

    /// Patches a merchant inventory once per scene.
    ///
    /// Returns true if the inventory changed.
    pub fn patch_merchant(&mut self, inventory: &mut dyn Dropable) -> bool {
        if !self.config.enabled {
            return false;
        }
        let identity = inventory.identity();
        let uid = identity.uid().map(str::to_owned);
        if uid.as_deref().is_some_and(|uid| self.is_merchant_updated(uid)) {
            return false;
        }
        if self.registry.rules_for(TargetType::Merchant).is_empty() {
            return false;
        }

        let wrapper = self.patch_holder(TargetType::Merchant, inventory, false);
        if !wrapper.has_changes() {
            return false;
        }
        if let Some(uid) = uid {
            self.updated_merchants.insert(uid);
        }
        if self.config.debug {
            tracing::info!(
                "Updated droptables for {}:\n{}",
                merchant_label(&identity),
                wrapper.info_report(0, self.catalog.as_ref())
            );
        } else {
            tracing::info!("Updated droptables for {}", merchant_label(&identity));
        }
        true
    }

    /// Patches every holder of one entity, such as the drop lists of a chest
    /// or a corpse.
    pub fn patch_group<H: Dropable>(
        &self,
        target: TargetType,
        label: &str,
        holders: &mut [H],
        simulate: bool,
    ) -> GroupPatch {
        if !self.config.enabled || holders.is_empty() {
            return GroupPatch::default();
        }
        let wrappers = holders
            .iter_mut()
            .enumerate()
            .map(|(i, holder)| DropableWrapper::new(holder, simulate).with_index(i))
            .collect();
        self.run_group(target, label, wrappers, simulate)
    }

    /// Dry run over a group the caller only holds shared references to.
    pub fn simulate_group<H: Dropable>(
        &self,
        target: TargetType,
        label: &str,
        holders: &[H],
    ) -> GroupPatch {
        if !self.config.enabled || holders.is_empty() {
            return GroupPatch::default();
        }
        let wrappers = holders
            .iter()
            .enumerate()
            .map(|(i, holder)| DropableWrapper::simulated(holder).with_index(i))
            .collect();
        self.run_group(target, label, wrappers, true)
    }

    fn run_group(
        &self,
        target: TargetType,
        label: &str,
        mut wrappers: Vec<DropableWrapper<'_>>,
        simulate: bool,
    ) -> GroupPatch {
        let rules = self.registry.rules_for(target);
        if rules.is_empty() {
            return GroupPatch::default();
        }

        let mut changed = false;
        for wrapper in &mut wrappers {
            for rule in &rules {
                changed |= rule.try_update(wrapper, self.registry.regions());
            }
        }

        if simulate || self.config.debug {
            let mut report = format!("{} {label}:\n", action(changed, simulate));
            for wrapper in &wrappers {
                if wrapper.has_changes() {
                    report.push_str(&wrapper.info_report(1, self.catalog.as_ref()));
                } else {
                    report.push_str(&format!("  {wrapper}\n"));
                }
            }
            tracing::info!("{report}");
            return GroupPatch {
                changed,
                report: Some(report),
            };
        }
        if changed {
            tracing::info!("Updated {label}");
        }
        GroupPatch {
            changed,
            report: None,
        }
    }

    /// Patches a batch of groups; returns how many changed.
    pub fn patch_groups<H: Dropable>(
        &self,
        target: TargetType,
        groups: &mut [(String, Vec<H>)],
        simulate: bool,
    ) -> usize {
        if !self.config.enabled {
            return 0;
        }
        tracing::info!(
            class = %target,
            "Starting droptable patcher for {} holder groups.",
            groups.len()
        );
        let mut changed = 0;
        for (label, holders) in groups.iter_mut() {
            if self.patch_group(target, label, holders, simulate).changed {
                changed += 1;
            }
        }
        tracing::info!(class = %target, changed, "Droptable patcher completed!");
        changed
    }

    /// Dry run over merchant inventories, additional drops included.
    ///
    /// Returns one report per inventory that would change.
    pub fn simulate_merchants<H: Dropable>(&self, inventories: &[H]) -> Vec<String> {
        if !self.config.enabled {
            return Vec::new();
        }
        let has_rules = !self.registry.rules_for(TargetType::Merchant).is_empty()
            || !self.registry.additional_rules_for(TargetType::Merchant).is_empty();
        if !has_rules {
            return Vec::new();
        }

        tracing::info!("Checking droptable alterations for {} merchants.", inventories.len());
        let mut reports = Vec::new();
        for inventory in inventories {
            let mut wrapper = DropableWrapper::simulated(inventory);
            self.registry.try_update(TargetType::Merchant, &mut wrapper);
            self.preview_additional(TargetType::Merchant, &mut wrapper);
            if wrapper.has_changes() {
                let report = format!(
                    "Would update droptables for {}:\n{}",
                    merchant_label(wrapper.identity()),
                    wrapper.info_report(0, self.catalog.as_ref())
                );
                tracing::info!("{report}");
                reports.push(report);
            }
        }
        reports
    }

    /// Rolls the additional-drop rules of `target` into `materialize`.
    pub fn generate_additional_items(
        &self,
        target: TargetType,
        holder: &HolderIdentity,
        materialize: &mut dyn MaterializationTarget,
    ) -> bool {
        if !self.config.enabled {
            return false;
        }
        let generated =
            self.registry
                .try_generate_additional_items(target, holder, self.tables.as_ref(), materialize);
        if generated {
            tracing::info!(class = %target, "Applied additional drops for {holder}");
        }
        generated
    }

    /// Appends the containers additional-drop rules would create.
    pub fn preview_additional(
        &self,
        target: TargetType,
        wrapper: &mut DropableWrapper<'_>,
    ) -> usize {
        self.registry
            .add_additional_droppers_to(target, wrapper, self.tables.as_ref())
    }
}
