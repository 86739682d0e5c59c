//! Per-container view over a holder's drop list.

use std::cell::OnceCell;
use std::collections::HashSet;
use std::fmt;

use crate::item::{BasicItemDrop, DropperKind, ItemDrop, ItemDropChance, ItemId};

use super::DropStore;

/// Where a container's drops physically live.
pub enum Backing<'a, D> {
    /// Aliases the host's store; mutations are real.
    Live(&'a mut dyn DropStore<D>),
    /// Private copy taken at wrap time.
    Simulated(Vec<D>),
    /// Container synthesized by an additional-drop rule.
    Additional(Vec<D>),
}

impl<D> fmt::Debug for Backing<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Live(_) => "Live",
            Self::Simulated(_) => "Simulated",
            Self::Additional(_) => "Additional",
        })
    }
}

/// Uniform view over one drop container.
#[derive(Debug)]
pub struct DropperWrapper<'a, D: ItemDrop> {
    index: usize,
    name: Option<String>,
    backing: Backing<'a, D>,
    has_changes: bool,
    items: OnceCell<HashSet<ItemId>>,
    average_drop_chance: f32,
}

/// View over a guaranteed drop container.
pub type GuaranteedDropWrapper<'a> = DropperWrapper<'a, BasicItemDrop>;

/// View over a chance drop container.
pub type ChanceDropWrapper<'a> = DropperWrapper<'a, ItemDropChance>;

impl<'a, D: ItemDrop> DropperWrapper<'a, D> {
    /// Wraps a live store.
    pub fn live(index: usize, store: &'a mut dyn DropStore<D>) -> Self {
        let average = average_weight(store.drops());
        Self::with_backing(index, None, Backing::Live(store), average)
    }

    /// Copies the drops of a store.
    pub fn simulated(index: usize, store: &dyn DropStore<D>) -> Self {
        let drops = store.drops().to_vec();
        let average = average_weight(&drops);
        let name = store.generator_name().map(str::to_string);
        Self::with_backing(index, name, Backing::Simulated(drops), average)
    }

    /// Creates an empty synthesized container.
    #[must_use]
    pub fn additional(index: usize, name: Option<String>) -> Self {
        Self::with_backing(index, name, Backing::Additional(Vec::new()), 1.0)
    }

    fn with_backing(
        index: usize,
        name: Option<String>,
        backing: Backing<'a, D>,
        average_drop_chance: f32,
    ) -> Self {
        Self {
            index,
            name,
            backing,
            has_changes: false,
            items: OnceCell::new(),
            average_drop_chance,
        }
    }

    /// Position within the holder's containers of the same kind.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Container kind.
    #[must_use]
    pub const fn kind(&self) -> DropperKind {
        D::KIND
    }

    /// Item generator name, read through to the host for live containers.
    #[must_use]
    pub fn generator_name(&self) -> Option<&str> {
        match &self.backing {
            Backing::Live(store) => store.generator_name(),
            Backing::Simulated(_) | Backing::Additional(_) => self.name.as_deref(),
        }
    }

    /// Returns true for containers that alias host state.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self.backing, Backing::Live(_))
    }

    /// Returns true for containers synthesized by additional-drop rules.
    #[must_use]
    pub const fn is_additional(&self) -> bool {
        matches!(self.backing, Backing::Additional(_))
    }

    /// Returns true once this container was changed.
    #[must_use]
    pub const fn has_changes(&self) -> bool {
        self.has_changes
    }

    /// Current drops.
    #[must_use]
    pub fn drops(&self) -> &[D] {
        match &self.backing {
            Backing::Live(store) => store.drops(),
            Backing::Simulated(drops) | Backing::Additional(drops) => drops,
        }
    }

    /// Mutable drops. Callers report mutations with [`Self::set_has_changes`].
    pub fn drops_mut(&mut self) -> &mut Vec<D> {
        match &mut self.backing {
            Backing::Live(store) => store.drops_mut(),
            Backing::Simulated(drops) | Backing::Additional(drops) => drops,
        }
    }

    /// Returns true if the container holds any drop.
    #[must_use]
    pub fn has_drops(&self) -> bool {
        !self.drops().is_empty()
    }

    /// Item ids present in the container, memoized until the next change.
    pub fn items(&self) -> &HashSet<ItemId> {
        self.items
            .get_or_init(|| self.drops().iter().map(ItemDrop::item_id).collect())
    }

    /// Returns true if the container holds `item_id`.
    #[must_use]
    pub fn contains(&self, item_id: ItemId) -> bool {
        self.items().contains(&item_id)
    }

    /// Records a mutation.
    ///
    /// Drops the memoized item set; a live chance container also tells the
    /// host to rebuild its roll tables.
    pub fn set_has_changes(&mut self) {
        self.has_changes = true;
        self.items.take();
        if D::KIND == DropperKind::Chance {
            if let Backing::Live(store) = &mut self.backing {
                store.on_structure_changed();
            }
        }
    }
}

impl ChanceDropWrapper<'_> {
    /// Average weight at wrap time, or 1 for an empty container.
    #[must_use]
    pub const fn average_drop_chance(&self) -> f32 {
        self.average_drop_chance
    }
}

#[allow(clippy::cast_precision_loss)]
fn average_weight<D: ItemDrop>(drops: &[D]) -> f32 {
    if drops.is_empty() {
        return 1.0;
    }
    let sum: i64 = drops.iter().filter_map(ItemDrop::weight).map(i64::from).sum();
    sum as f32 / drops.len() as f32
}

impl<D: ItemDrop> fmt::Display for DropperWrapper<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {}",
            D::KIND,
            self.index,
            self.generator_name().unwrap_or("?")
        )?;
        if self.is_additional() {
            f.write_str(" (additional)")
        } else if self.has_changes {
            f.write_str(" (altered)")
        } else {
            Ok(())
        }
    }
}

/// Mutable reference to a container of either kind.
#[derive(Debug)]
pub enum DropperRef<'w, 'a> {
    /// Guaranteed container.
    Guaranteed(&'w mut GuaranteedDropWrapper<'a>),
    /// Chance container.
    Chance(&'w mut ChanceDropWrapper<'a>),
}

impl DropperRef<'_, '_> {
    /// Kind of the referenced container.
    #[must_use]
    pub const fn kind(&self) -> DropperKind {
        match self {
            Self::Guaranteed(_) => DropperKind::Guaranteed,
            Self::Chance(_) => DropperKind::Chance,
        }
    }

    /// Generator name of the referenced container.
    #[must_use]
    pub fn generator_name(&self) -> Option<&str> {
        match self {
            Self::Guaranteed(d) => d.generator_name(),
            Self::Chance(d) => d.generator_name(),
        }
    }

    /// Item ids of the referenced container.
    #[must_use]
    pub fn items(&self) -> &HashSet<ItemId> {
        match self {
            Self::Guaranteed(d) => d.items(),
            Self::Chance(d) => d.items(),
        }
    }
}

impl fmt::Display for DropperRef<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guaranteed(d) => write!(f, "{d}"),
            Self::Chance(d) => write!(f, "{d}"),
        }
    }
}
