//! Multi-line holder reports for dry runs and debug logging.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::item::{drop_count_text, ItemDrop, ItemId};
use crate::wrapper::{DropableWrapper, DropperWrapper};

/// Resolves item ids to display names.
pub trait ItemCatalog {
    /// Display name of `item_id`, if known.
    fn item_name(&self, item_id: ItemId) -> Option<&str>;
}

/// Catalog that knows no items.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCatalog;

impl ItemCatalog for NoCatalog {
    fn item_name(&self, _item_id: ItemId) -> Option<&str> {
        None
    }
}

impl<S: std::hash::BuildHasher> ItemCatalog for HashMap<ItemId, String, S> {
    fn item_name(&self, item_id: ItemId) -> Option<&str> {
        self.get(&item_id).map(String::as_str)
    }
}

const UNKNOWN_ITEM: &str = "<unknown>";

fn pad(out: &mut String, indent: usize) {
    out.extend(std::iter::repeat(' ').take(indent * 2));
}

impl<D: ItemDrop> DropperWrapper<'_, D> {
    fn write_info(&self, out: &mut String, indent: usize, catalog: &dyn ItemCatalog) {
        pad(out, indent);
        let _ = writeln!(out, "- {self}:");
        for drop in self.drops() {
            pad(out, indent + 1);
            let (min, max) = drop.counts();
            let count = drop_count_text(min, max);
            let name = catalog.item_name(drop.item_id()).unwrap_or(UNKNOWN_ITEM);
            match drop.weight() {
                Some(chance) => {
                    let _ = writeln!(
                        out,
                        "- x{count:<6} Chance={chance:<2} {name} ({})",
                        drop.item_id()
                    );
                }
                None => {
                    let _ = writeln!(out, "- x{count:<6} {name} ({})", drop.item_id());
                }
            }
        }
    }
}

impl DropableWrapper<'_> {
    /// Renders the holder header followed by every container and its drops.
    ///
    /// ```text
    /// Dropable 0: Chest (altered):
    ///   - GuaranteedDrop 0: Pouch (altered):
    ///     - x1-3    Gold Ingot (6300030)
    ///   - DropTable 0: Loot:
    ///     - x1      Chance=10 Bread (4100010)
    /// ```
    #[must_use]
    pub fn info_report(&self, indent: usize, catalog: &dyn ItemCatalog) -> String {
        let mut out = String::new();
        pad(&mut out, indent);
        let _ = writeln!(out, "{self}:");
        for dropper in self.guaranteed_droppers() {
            dropper.write_info(&mut out, indent + 1, catalog);
        }
        for dropper in self.chance_droppers() {
            dropper.write_info(&mut out, indent + 1, catalog);
        }
        out
    }
}
