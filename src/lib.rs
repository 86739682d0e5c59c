//! # DropTables - Declarative Drop Table Alterations
//!
//! DropTables matches drop-bearing holders (merchant inventories, loot
//! containers, corpses) against boolean constraint trees and applies ordered,
//! typed alterations to their item drops. Every alteration can run live or
//! simulated, and tracks whether it changed anything.
//!
//! ## Core Concepts
//!
//! - **Rule**: A target class, a constraint tree and a list of alterations
//! - **Alteration**: A typed add, modify or remove op on guaranteed or chance drops
//! - **DropableWrapper**: A live or simulated view over one holder's containers
//! - **Registry**: Loaded rules, indexed by target class
//!
//! ## Usage
//!
//! ```rust,ignore
//! use droptables::{AlterationRegistry, DropableWrapper, InMemoryDropTables, TargetType};
//! use droptables::serialization::rules_from_json;
//!
//! let tables = InMemoryDropTables::new();
//! let mut registry = AlterationRegistry::new();
//! registry.load(rules_from_json(json)?, &tables);
//!
//! // Dry run: the holder is never touched.
//! let mut wrapper = DropableWrapper::simulated(&chest);
//! if registry.try_update(TargetType::LootContainer, &mut wrapper) {
//!     println!("{}", wrapper.info_report(0, &droptables::NoCatalog));
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Values and matching
pub mod constraint;
pub mod dropper_matcher;
pub mod error;
pub mod identity;
pub mod item;
pub mod region;
pub mod tables;

// Alterations and their targets
pub mod alteration;
pub mod report;
pub mod wrapper;

// Rules and sessions
pub mod config;
pub mod patcher;
pub mod registry;
pub mod rule;
pub mod serialization;

// Re-export primary types at crate root for convenience
pub use alteration::{
    AddChanceDrops, AddGuaranteedDrops, AddGuaranteedFromDropTable, AdditionalDropTablesByUid,
    Alteration, AlterationFamily, ApplyOutcome, DropperFilter, ModifyChanceDrops,
    ModifyGuaranteedDrops, RemoveChanceDrops, RemoveGuaranteedDrops,
};
pub use config::DropsConfig;
pub use constraint::{Constraint, OwnerHint};
pub use dropper_matcher::{DropperMatcher, GeneratorNameMatcher, MatchType};
pub use error::{AlterationError, AlterationResult, ValidationError};
pub use identity::HolderIdentity;
pub use item::{
    AbsoluteChanceDrop, BasicItemDrop, ChanceDrop, DropperKind, GuaranteedDrop, ItemDrop,
    ItemDropChance, ItemId, RelativeChanceDrop,
};
pub use patcher::{DropsPatcher, GroupPatch};
pub use region::{Region, RegionResolver};
pub use registry::AlterationRegistry;
pub use report::{ItemCatalog, NoCatalog};
pub use rule::{AlterationRule, RuleState, TargetType};
pub use tables::{
    DropTableDef, DropTableSource, InMemoryDropTables, MaterializationTarget, RandomTable,
    RecordingTarget, TableChanceDrop, TableDrop,
};
pub use wrapper::memory::{InMemoryDropable, ItemGenerator};
pub use wrapper::{
    ChanceDropWrapper, DropStore, Dropable, DropableWrapper, DropperRef, DropperWrapper,
    GuaranteedDropWrapper, HostDroppers,
};
