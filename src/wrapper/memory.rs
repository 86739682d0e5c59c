//! In-memory host holder.
//!
//! Used by the dry-run tool, tests and benches in place of real game entities.

use serde::{Deserialize, Serialize};

use crate::identity::HolderIdentity;
use crate::item::{BasicItemDrop, ItemDropChance};

use super::{DropStore, Dropable, HostDroppers};

/// A named drop container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemGenerator<D> {
    /// Item generator name.
    #[serde(default)]
    pub name: Option<String>,
    /// Drops.
    #[serde(default = "Vec::new")]
    pub drops: Vec<D>,
    /// How many times roll tables were rebuilt.
    #[serde(skip)]
    pub resets: usize,
}

impl<D> ItemGenerator<D> {
    /// Creates a named container.
    #[must_use]
    pub fn named(name: impl Into<String>, drops: Vec<D>) -> Self {
        Self {
            name: Some(name.into()),
            drops,
            resets: 0,
        }
    }
}

impl<D> DropStore<D> for ItemGenerator<D> {
    fn generator_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn drops(&self) -> &[D] {
        &self.drops
    }

    fn drops_mut(&mut self) -> &mut Vec<D> {
        &mut self.drops
    }

    fn on_structure_changed(&mut self) {
        self.resets += 1;
    }
}

/// Holder whose containers live in plain vectors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryDropable {
    /// Identity fields.
    #[serde(default)]
    pub identity: HolderIdentity,
    /// Guaranteed containers.
    #[serde(default)]
    pub guaranteed: Vec<ItemGenerator<BasicItemDrop>>,
    /// Chance containers.
    #[serde(default)]
    pub chance: Vec<ItemGenerator<ItemDropChance>>,
}

impl InMemoryDropable {
    /// Creates a holder without containers.
    #[must_use]
    pub fn new(identity: HolderIdentity) -> Self {
        Self {
            identity,
            guaranteed: Vec::new(),
            chance: Vec::new(),
        }
    }

    /// Adds a guaranteed container.
    #[must_use]
    pub fn with_guaranteed(mut self, store: ItemGenerator<BasicItemDrop>) -> Self {
        self.guaranteed.push(store);
        self
    }

    /// Adds a chance container.
    #[must_use]
    pub fn with_chance(mut self, store: ItemGenerator<ItemDropChance>) -> Self {
        self.chance.push(store);
        self
    }
}

impl Dropable for InMemoryDropable {
    fn identity(&self) -> HolderIdentity {
        self.identity.clone()
    }

    fn guaranteed_stores(&self) -> Vec<&dyn DropStore<BasicItemDrop>> {
        self.guaranteed
            .iter()
            .map(|s| s as &dyn DropStore<BasicItemDrop>)
            .collect()
    }

    fn chance_stores(&self) -> Vec<&dyn DropStore<ItemDropChance>> {
        self.chance
            .iter()
            .map(|s| s as &dyn DropStore<ItemDropChance>)
            .collect()
    }

    fn stores_mut(&mut self) -> HostDroppers<'_> {
        HostDroppers {
            guaranteed: self
                .guaranteed
                .iter_mut()
                .map(|s| s as &mut dyn DropStore<BasicItemDrop>)
                .collect(),
            chance: self
                .chance
                .iter_mut()
                .map(|s| s as &mut dyn DropStore<ItemDropChance>)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_holder_with_defaults() {
        let json = r#"{
            "identity": {"name": "Chest", "scene": "Monsoon"},
            "chance": [{"name": "Loot", "drops": [{"item_id": 4, "drop_chance": 12}]}]
        }"#;
        let holder: InMemoryDropable = serde_json::from_str(json).unwrap();
        assert!(holder.guaranteed.is_empty());
        assert_eq!(holder.chance[0].drops[0], ItemDropChance::new(4, 1, 1, 12));
        assert_eq!(holder.chance_stores()[0].generator_name(), Some("Loot"));
    }

    #[test]
    fn split_borrows_cover_every_store() {
        let mut holder = InMemoryDropable::new(HolderIdentity::named("x"))
            .with_guaranteed(ItemGenerator::named("a", vec![]))
            .with_guaranteed(ItemGenerator::named("b", vec![]))
            .with_chance(ItemGenerator::named("c", vec![]));
        let stores = holder.stores_mut();
        assert_eq!(stores.guaranteed.len(), 2);
        assert_eq!(stores.chance.len(), 1);
    }
}
