//! Identity snapshot of a droppable holder.
//!
//! Constraints are evaluated against this snapshot rather than against the
//! host entity, so matching never needs access to the host's object graph.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity fields of a holder, captured when it is wrapped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderIdentity {
    /// Display name of the holder object.
    #[serde(default)]
    pub name: Option<String>,
    /// Unique id of the holder object.
    #[serde(default)]
    pub uid: Option<String>,
    /// Scene the holder lives in.
    #[serde(default)]
    pub scene: Option<String>,
    /// Holder uid of the owning treasure chest, when owned by one.
    #[serde(default)]
    pub chest_owner_uid: Option<String>,
    /// Holder uid of the owning merchant, when owned by one.
    #[serde(default)]
    pub merchant_owner_uid: Option<String>,
}

impl HolderIdentity {
    /// Creates an identity with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Sets the unique id.
    #[must_use]
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Sets the scene name.
    #[must_use]
    pub fn in_scene(mut self, scene: impl Into<String>) -> Self {
        self.scene = Some(scene.into());
        self
    }

    /// Marks the holder as owned by the treasure chest with `uid`.
    #[must_use]
    pub fn owned_by_chest(mut self, uid: impl Into<String>) -> Self {
        self.chest_owner_uid = Some(uid.into());
        self
    }

    /// Marks the holder as owned by the merchant with `uid`.
    #[must_use]
    pub fn owned_by_merchant(mut self, uid: impl Into<String>) -> Self {
        self.merchant_owner_uid = Some(uid.into());
        self
    }

    /// Name, when present and non-empty.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        non_empty(self.name.as_deref())
    }

    /// Uid, when present and non-empty.
    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        non_empty(self.uid.as_deref())
    }

    /// Scene, when present and non-empty.
    #[must_use]
    pub fn scene(&self) -> Option<&str> {
        non_empty(self.scene.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

impl fmt::Display for HolderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (UID={})", self.name().unwrap_or("?"), self.uid().unwrap_or(""))
    }
}
