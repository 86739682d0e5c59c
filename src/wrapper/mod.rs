//! Projection of host holders into a uniform, mutable view.
//!
//! A [`DropableWrapper`] is built fresh for every trigger. In live mode its
//! containers alias the host's stores; in simulated mode they hold private
//! copies and the host is never touched. Alterations only ever see the wrapper.

mod dropper;
pub mod memory;

use std::fmt;

pub use dropper::{Backing, ChanceDropWrapper, DropperRef, DropperWrapper, GuaranteedDropWrapper};

use crate::identity::HolderIdentity;
use crate::item::{BasicItemDrop, ItemDropChance};

/// A host drop container.
pub trait DropStore<D> {
    /// Host label of the container.
    fn generator_name(&self) -> Option<&str> {
        None
    }

    /// Current drops.
    fn drops(&self) -> &[D];

    /// Mutable drops.
    fn drops_mut(&mut self) -> &mut Vec<D>;

    /// Called after the drop list of a live chance container changed.
    fn on_structure_changed(&mut self) {}
}

/// Mutable borrows of all containers of one holder.
pub struct HostDroppers<'a> {
    /// Guaranteed containers, in host order.
    pub guaranteed: Vec<&'a mut dyn DropStore<BasicItemDrop>>,
    /// Chance containers, in host order.
    pub chance: Vec<&'a mut dyn DropStore<ItemDropChance>>,
}

/// A host entity owning drop containers.
pub trait Dropable {
    /// Identity fields used by constraints.
    fn identity(&self) -> HolderIdentity;

    /// Guaranteed containers, in host order.
    fn guaranteed_stores(&self) -> Vec<&dyn DropStore<BasicItemDrop>>;

    /// Chance containers, in host order.
    fn chance_stores(&self) -> Vec<&dyn DropStore<ItemDropChance>>;

    /// Mutable borrows of every container at once.
    fn stores_mut(&mut self) -> HostDroppers<'_>;
}

/// Uniform view over one holder for one trigger.
#[derive(Debug)]
pub struct DropableWrapper<'a> {
    index: Option<usize>,
    simulated: bool,
    identity: HolderIdentity,
    has_changes: bool,
    guaranteed: Vec<GuaranteedDropWrapper<'a>>,
    chance: Vec<ChanceDropWrapper<'a>>,
}

impl<'a> DropableWrapper<'a> {
    /// Wraps a holder with containers aliasing its stores.
    pub fn live(holder: &'a mut dyn Dropable) -> Self {
        let identity = holder.identity();
        let HostDroppers { guaranteed, chance } = holder.stores_mut();
        Self {
            index: None,
            simulated: false,
            identity,
            has_changes: false,
            guaranteed: guaranteed
                .into_iter()
                .enumerate()
                .map(|(i, store)| DropperWrapper::live(i, store))
                .collect(),
            chance: chance
                .into_iter()
                .enumerate()
                .map(|(i, store)| DropperWrapper::live(i, store))
                .collect(),
        }
    }

    /// Wraps a copy of a holder's drops.
    pub fn simulated(holder: &dyn Dropable) -> Self {
        Self {
            index: None,
            simulated: true,
            identity: holder.identity(),
            has_changes: false,
            guaranteed: holder
                .guaranteed_stores()
                .into_iter()
                .enumerate()
                .map(|(i, store)| DropperWrapper::simulated(i, store))
                .collect(),
            chance: holder
                .chance_stores()
                .into_iter()
                .enumerate()
                .map(|(i, store)| DropperWrapper::simulated(i, store))
                .collect(),
        }
    }

    /// Wraps a holder live or simulated.
    pub fn new(holder: &'a mut dyn Dropable, simulate: bool) -> Self {
        if simulate {
            Self::simulated(holder)
        } else {
            Self::live(holder)
        }
    }

    /// Simulated wrapper with no containers.
    #[must_use]
    pub fn detached(identity: HolderIdentity) -> Self {
        Self {
            index: None,
            simulated: true,
            identity,
            has_changes: false,
            guaranteed: Vec::new(),
            chance: Vec::new(),
        }
    }

    /// Sets the position shown in reports.
    #[must_use]
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Position shown in reports.
    #[must_use]
    pub const fn index(&self) -> Option<usize> {
        self.index
    }

    /// Returns true when containers hold private copies.
    #[must_use]
    pub const fn is_simulated(&self) -> bool {
        self.simulated
    }

    /// Identity snapshot taken at wrap time.
    #[must_use]
    pub const fn identity(&self) -> &HolderIdentity {
        &self.identity
    }

    /// True if the holder itself or any of its containers changed.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.has_changes
            || self.guaranteed.iter().any(DropperWrapper::has_changes)
            || self.chance.iter().any(DropperWrapper::has_changes)
    }

    /// Marks the holder itself as changed.
    pub fn set_has_changes(&mut self) {
        self.has_changes = true;
    }

    /// Guaranteed containers.
    #[must_use]
    pub fn guaranteed_droppers(&self) -> &[GuaranteedDropWrapper<'a>] {
        &self.guaranteed
    }

    /// Mutable guaranteed containers.
    pub fn guaranteed_droppers_mut(&mut self) -> &mut [GuaranteedDropWrapper<'a>] {
        &mut self.guaranteed
    }

    /// Chance containers.
    #[must_use]
    pub fn chance_droppers(&self) -> &[ChanceDropWrapper<'a>] {
        &self.chance
    }

    /// Mutable chance containers.
    pub fn chance_droppers_mut(&mut self) -> &mut [ChanceDropWrapper<'a>] {
        &mut self.chance
    }

    /// Every container, guaranteed ones first.
    pub fn droppers_mut(&mut self) -> impl Iterator<Item = DropperRef<'_, 'a>> {
        self.guaranteed
            .iter_mut()
            .map(DropperRef::Guaranteed)
            .chain(self.chance.iter_mut().map(DropperRef::Chance))
    }

    /// Appends an empty synthesized guaranteed container.
    pub fn new_guaranteed_dropper(
        &mut self,
        name: Option<String>,
    ) -> &mut GuaranteedDropWrapper<'a> {
        let index = self.guaranteed.len();
        self.guaranteed.push(DropperWrapper::additional(index, name));
        let last = self.guaranteed.len() - 1;
        &mut self.guaranteed[last]
    }

    /// Appends an empty synthesized chance container.
    pub fn new_chance_dropper(&mut self, name: Option<String>) -> &mut ChanceDropWrapper<'a> {
        let index = self.chance.len();
        self.chance.push(DropperWrapper::additional(index, name));
        let last = self.chance.len() - 1;
        &mut self.chance[last]
    }
}

impl fmt::Display for DropableWrapper<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Dropable")?;
        if let Some(index) = self.index {
            write!(f, " {index}")?;
        }
        write!(f, ": {}", self.identity.name().unwrap_or(""))?;
        if self.has_changes() {
            f.write_str(" (altered)")?;
        }
        Ok(())
    }
}
