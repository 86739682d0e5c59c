//! Constraint trees selecting which holders a rule applies to.
//!
//! A constraint is either a group (`All`, `Any`) owning child constraints, or
//! a leaf comparing one holder attribute. Trees are evaluated against a
//! [`HolderIdentity`] snapshot.
//!
//! Empty groups are asymmetric on purpose: `All([])` matches nothing while
//! `Any([])` matches everything.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::HolderIdentity;
use crate::region::{Region, RegionResolver};

/// Prefix required on merchant drop uids.
pub const MERCHANT_DROP_PREFIX: &str = "MerchantDrop_";

/// Which owner lookup an owner-uid leaf performs.
///
/// Set by the enclosing rule from its target type; never deserialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OwnerHint {
    /// Try the chest owner first, then the merchant owner.
    #[default]
    None,
    /// Only compare against the owning treasure chest.
    TreasureChest,
    /// Only compare against the owning merchant.
    Merchant,
}

/// Node of a constraint tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Constraint {
    /// Matches iff non-empty and every child matches.
    All {
        /// Child constraints.
        #[serde(default)]
        constraints: Vec<Constraint>,
    },
    /// Matches iff empty or any child matches.
    Any {
        /// Child constraints.
        #[serde(default)]
        constraints: Vec<Constraint>,
    },
    /// Holder name contains the value.
    DropableName {
        /// Substring to look for.
        name: String,
    },
    /// Holder uid is a merchant drop uid containing the value.
    MerchantDropName {
        /// Substring to look for.
        name: String,
    },
    /// Owning chest or merchant has exactly this holder uid.
    OwnerUid {
        /// Owner holder uid.
        uid: String,
        /// Owner lookup restriction.
        #[serde(skip)]
        hint: OwnerHint,
    },
    /// Scene name contains the value.
    Scene {
        /// Substring to look for.
        scene: String,
    },
    /// Scene belongs to the region.
    Region {
        /// Required region.
        region: Region,
    },
}

impl Default for Constraint {
    fn default() -> Self {
        Self::all(Vec::new())
    }
}

impl Constraint {
    /// Creates an `All` group.
    #[must_use]
    pub fn all(constraints: Vec<Self>) -> Self {
        Self::All { constraints }
    }

    /// Creates an `Any` group.
    #[must_use]
    pub fn any(constraints: Vec<Self>) -> Self {
        Self::Any { constraints }
    }

    /// Creates a holder name leaf.
    #[must_use]
    pub fn dropable_name(name: impl Into<String>) -> Self {
        Self::DropableName { name: name.into() }
    }

    /// Creates a merchant drop name leaf.
    #[must_use]
    pub fn merchant_drop_name(name: impl Into<String>) -> Self {
        Self::MerchantDropName { name: name.into() }
    }

    /// Creates an owner uid leaf without a hint.
    #[must_use]
    pub fn owner_uid(uid: impl Into<String>) -> Self {
        Self::OwnerUid {
            uid: uid.into(),
            hint: OwnerHint::None,
        }
    }

    /// Creates a scene leaf.
    #[must_use]
    pub fn scene(scene: impl Into<String>) -> Self {
        Self::Scene { scene: scene.into() }
    }

    /// Creates a region leaf.
    #[must_use]
    pub const fn region(region: Region) -> Self {
        Self::Region { region }
    }

    /// Children of a group, `None` for leaves.
    #[must_use]
    pub fn children(&self) -> Option<&[Self]> {
        match self {
            Self::All { constraints } | Self::Any { constraints } => Some(constraints),
            _ => None,
        }
    }

    /// Returns true for `All` and `Any`.
    #[must_use]
    pub const fn is_group(&self) -> bool {
        matches!(self, Self::All { .. } | Self::Any { .. })
    }

    /// Evaluates the tree against a holder.
    #[must_use]
    pub fn is_match(&self, holder: &HolderIdentity, regions: &RegionResolver) -> bool {
        match self {
            Self::All { constraints } => {
                !constraints.is_empty() && constraints.iter().all(|c| c.is_match(holder, regions))
            }
            Self::Any { constraints } => {
                constraints.is_empty() || constraints.iter().any(|c| c.is_match(holder, regions))
            }
            Self::DropableName { name } => holder.name().is_some_and(|n| n.contains(name.as_str())),
            Self::MerchantDropName { name } => holder
                .uid()
                .is_some_and(|uid| {
                    uid.starts_with(MERCHANT_DROP_PREFIX) && uid.contains(name.as_str())
                }),
            Self::OwnerUid { uid, hint } => match_owner(uid, *hint, holder),
            Self::Scene { scene } => holder.scene().is_some_and(|s| s.contains(scene.as_str())),
            Self::Region { region } => holder
                .scene()
                .and_then(|scene| regions.region_of(scene))
                .is_some_and(|r| r == *region),
        }
    }

    /// Pre-order traversal over this node and all descendants.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        Iter { stack: vec![self] }
    }

    /// Visits this node and all descendants in pre-order.
    pub fn visit_mut<F: FnMut(&mut Self)>(&mut self, f: &mut F) {
        f(self);
        if let Self::All { constraints } | Self::Any { constraints } = self {
            for child in constraints {
                child.visit_mut(f);
            }
        }
    }

    /// Sets the owner lookup hint on every owner uid leaf.
    pub fn set_owner_hint(&mut self, owner_hint: OwnerHint) {
        self.visit_mut(&mut |node| {
            if let Self::OwnerUid { hint, .. } = node {
                *hint = owner_hint;
            }
        });
    }

    /// Normalizes leaf values (trims surrounding whitespace).
    pub fn prepare(&mut self) {
        self.visit_mut(&mut |node| match node {
            Self::DropableName { name } | Self::MerchantDropName { name } => trim_in_place(name),
            Self::OwnerUid { uid, .. } => trim_in_place(uid),
            Self::Scene { scene } => trim_in_place(scene),
            _ => {}
        });
    }

    /// Collects human-readable errors for empty leaf values.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        match self {
            Self::All { constraints } | Self::Any { constraints } => {
                let group = self.group_name();
                constraints
                    .iter()
                    .enumerate()
                    .flat_map(|(i, child)| {
                        child
                            .validate()
                            .into_iter()
                            .map(move |error| format!("Match{group}[{i}]: {error}"))
                    })
                    .collect()
            }
            _ => self.leaf_error().map(|e| vec![e.to_string()]).unwrap_or_default(),
        }
    }

    fn leaf_error(&self) -> Option<ValidationError> {
        let (leaf, value) = match self {
            Self::DropableName { name } => ("DropableName", name),
            Self::MerchantDropName { name } => ("MerchantDropName", name),
            Self::OwnerUid { uid, .. } => ("OwnerUid", uid),
            Self::Scene { scene } => ("Scene", scene),
            _ => return None,
        };
        value
            .trim()
            .is_empty()
            .then_some(ValidationError::EmptyConstraint { leaf })
    }

    const fn group_name(&self) -> &'static str {
        match self {
            Self::Any { .. } => "Any",
            _ => "All",
        }
    }
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

fn match_owner(uid: &str, hint: OwnerHint, holder: &HolderIdentity) -> bool {
    let chest = matches!(hint, OwnerHint::None | OwnerHint::TreasureChest);
    let merchant = matches!(hint, OwnerHint::None | OwnerHint::Merchant);

    // The first owner found decides; a chest owner shadows a merchant owner.
    if let Some(owner) = holder.chest_owner_uid.as_deref().filter(|_| chest) {
        return owner == uid;
    }
    if let Some(owner) = holder.merchant_owner_uid.as_deref().filter(|_| merchant) {
        return owner == uid;
    }
    false
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All { constraints } | Self::Any { constraints } => {
                write!(f, "{}(", self.group_name())?;
                for (i, child) in constraints.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str(")")
            }
            Self::DropableName { name } => write!(f, "name={name}"),
            Self::MerchantDropName { name } => write!(f, "merchant-drop={name}"),
            Self::OwnerUid { uid, .. } => write!(f, "holder-uid={uid}"),
            Self::Scene { scene } => write!(f, "scene={scene}"),
            Self::Region { region } => write!(f, "region={region}"),
        }
    }
}

/// Pre-order iterator over a constraint tree.
#[derive(Debug)]
pub struct Iter<'a> {
    stack: Vec<&'a Constraint>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Constraint;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        if let Some(children) = node.children() {
            self.stack.extend(children.iter().rev());
        }
        Some(node)
    }
}
