//! Additional drop containers built from referenced drop tables.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::tables::{DropTableSource, MaterializationTarget};
use crate::wrapper::DropableWrapper;

use super::empty_payload;

/// Adds one guaranteed container per table with guaranteed drops, and one
/// chance container per random group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalDropTablesByUid {
    /// Referenced table uids.
    #[serde(default)]
    pub uids: Vec<String>,
}

impl AdditionalDropTablesByUid {
    /// Creates the op.
    #[must_use]
    pub fn new(uids: Vec<String>) -> Self {
        Self { uids }
    }

    /// Rolls every referenced table into `target`; returns how many were found.
    pub fn generate_additional_items(
        &self,
        tables: &dyn DropTableSource,
        target: &mut dyn MaterializationTarget,
    ) -> usize {
        let mut generated = 0;
        for uid in &self.uids {
            match tables.get(uid) {
                Some(table) => {
                    target.generate(table);
                    generated += 1;
                }
                None => tracing::error!(uid = %uid, "Unable to find drop table with UID '{uid}'!"),
            }
        }
        generated
    }

    /// Appends synthesized containers to `dropable`; returns how many were added.
    pub fn add_additional_droppers(
        &self,
        dropable: &mut DropableWrapper<'_>,
        tables: &dyn DropTableSource,
    ) -> usize {
        let mut added = 0;
        for uid in &self.uids {
            let Some(table) = tables.get(uid) else {
                tracing::error!(uid = %uid, "Unable to find drop table with UID '{uid}'!");
                continue;
            };
            if !table.guaranteed_drops.is_empty() {
                let dropper =
                    dropable.new_guaranteed_dropper(Some(format!("SL_DropTable - {uid}")));
                dropper
                    .drops_mut()
                    .extend(table.guaranteed_drops.iter().map(|d| d.to_basic()));
                dropper.set_has_changes();
                added += 1;
            }
            for (i, random) in table.random_tables.iter().enumerate() {
                let dropper =
                    dropable.new_chance_dropper(Some(format!("SL_DropTable Random {i} - {uid}")));
                dropper
                    .drops_mut()
                    .extend(random.drops.iter().map(|d| d.to_chance()));
                dropper.set_has_changes();
                added += 1;
            }
        }
        added
    }

    pub(super) fn validate(&self, tables: &dyn DropTableSource) -> Vec<ValidationError> {
        if self.uids.is_empty() {
            return vec![empty_payload("Uids", "AdditionalDropTablesByUid")];
        }
        self.uids
            .iter()
            .filter_map(|uid| match tables.get(uid) {
                None => Some(ValidationError::UnknownDropTable { uid: uid.clone() }),
                Some(table) if table.is_empty() => {
                    Some(ValidationError::DropTableWithoutDrops { uid: uid.clone() })
                }
                Some(_) => None,
            })
            .collect()
    }
}

impl fmt::Display for AdditionalDropTablesByUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.uids.as_slice() {
            [] => f.write_str("Additional: no drop table references"),
            [uid] => write!(f, "Additional: drop table {uid}"),
            uids => write!(f, "Additional: {} drop table references", uids.len()),
        }
    }
}
