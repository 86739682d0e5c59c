//! JSON helpers for rule sets, drop tables and configs.
//!
//! Serde does the work; these helpers keep error mapping and formatting in
//! one place.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{AlterationError, AlterationResult};
use crate::rule::AlterationRule;
use crate::tables::{DropTableDef, InMemoryDropTables};

fn to_json<T: Serialize>(what: &'static str, value: &T) -> AlterationResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| AlterationError::Serialize {
        what,
        message: e.to_string(),
    })
}

fn from_json<T: DeserializeOwned>(what: &'static str, s: &str) -> AlterationResult<T> {
    serde_json::from_str(s).map_err(|e| AlterationError::Deserialize {
        what,
        message: e.to_string(),
    })
}

/// Reads a file and deserializes it as JSON.
pub fn read_json<T: DeserializeOwned>(what: &'static str, path: &Path) -> AlterationResult<T> {
    let text = fs::read_to_string(path).map_err(|source| AlterationError::Io {
        path: path.display().to_string(),
        source,
    })?;
    from_json(what, &text)
}

/// Serializes a value as pretty JSON into a file.
pub fn write_json<T: Serialize>(
    what: &'static str,
    path: &Path,
    value: &T,
) -> AlterationResult<()> {
    let text = to_json(what, value)?;
    fs::write(path, text).map_err(|source| AlterationError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Serializes a rule set to pretty JSON.
pub fn rules_to_json(rules: &[AlterationRule]) -> AlterationResult<String> {
    to_json("alteration rules", &rules)
}

/// Deserializes a rule set from JSON.
///
/// Rules come back `Unloaded`; load them into a registry before use.
pub fn rules_from_json(s: &str) -> AlterationResult<Vec<AlterationRule>> {
    from_json("alteration rules", s)
}

/// Deserializes a list of drop tables from JSON.
pub fn tables_from_json(s: &str) -> AlterationResult<InMemoryDropTables> {
    let tables: Vec<DropTableDef> = from_json("drop tables", s)?;
    Ok(tables.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alteration::Alteration;
    use crate::rule::TargetType;
    use crate::tables::DropTableSource;

    const RULES: &str = r#"[
        {
            "uid": "pack.merchants",
            "target_type": "Merchant",
            "matcher": {"type": "any", "constraints": [{"type": "scene", "scene": "Berg"}]},
            "alterations": [
                {"type": "remove_guaranteed_drops", "items_to_remove": [3, 7]},
                {"type": "add_chance_drops", "first_match_only": false, "drops": [
                    {"type": "relative", "item_id": 9, "relative_chance": 0.5}
                ]}
            ]
        }
    ]"#;

    #[test]
    fn parses_rule_sets() {
        let rules = rules_from_json(RULES).unwrap();
        assert_eq!(rules.len(), 1);
        let rule = &rules[0];
        assert_eq!(rule.uid(), "pack.merchants");
        assert_eq!(rule.target_type(), TargetType::Merchant);
        assert!(matches!(rule.alterations()[0], Alteration::RemoveGuaranteedDrops(_)));
        assert!(!rule.alterations()[1].first_match_only());

        let json = rules_to_json(&rules).unwrap();
        assert!(rules_from_json(&json).is_ok());
    }

    #[test]
    fn parses_tables() {
        let tables = tables_from_json(
            r#"[{"uid": "t.gold", "guaranteed_drops": [{"item_id": 1, "min_qty": 1, "max_qty": 2}]}]"#,
        )
        .unwrap();
        assert!(tables.get("t.gold").is_some());
        assert!(!tables.is_empty());
    }

    #[test]
    fn malformed_json_reports_what_failed() {
        let err = rules_from_json("{").unwrap_err();
        assert!(matches!(err, AlterationError::Deserialize { what: "alteration rules", .. }));
    }

    #[test]
    fn file_helpers_roundtrip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        let rules = rules_from_json(RULES).unwrap();
        write_json("alteration rules", &path, &rules).unwrap();
        let read: Vec<AlterationRule> = read_json("alteration rules", &path).unwrap();
        assert_eq!(read[0].uid(), "pack.merchants");

        let missing =
            read_json::<Vec<AlterationRule>>("alteration rules", &dir.path().join("nope.json"));
        assert!(missing.unwrap_err().is_io());
    }
}
