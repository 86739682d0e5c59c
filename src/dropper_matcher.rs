//! Matchers selecting which drop containers of a holder an alteration targets.
//!
//! The constraint tree picks holders; these matchers pick containers inside a
//! holder by their item generator name.

use std::collections::HashSet;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// How a generator name is compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Names must be equal.
    #[default]
    Exact,
    /// Container name contains the value.
    Contains,
    /// Container name matches the value as a regular expression.
    Regex,
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Exact => "Exact",
            Self::Contains => "Contains",
            Self::Regex => "Regex",
        })
    }
}

/// Matches a container by its item generator name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorNameMatcher {
    /// Name, substring or pattern depending on `match_type`.
    pub name: String,
    /// Comparison mode.
    #[serde(default, rename = "match")]
    pub match_type: MatchType,
    #[serde(skip)]
    compiled: Option<Regex>,
}

impl GeneratorNameMatcher {
    /// Creates a matcher.
    #[must_use]
    pub fn new(name: impl Into<String>, match_type: MatchType) -> Self {
        let mut matcher = Self {
            name: name.into(),
            match_type,
            compiled: None,
        };
        matcher.prepare();
        matcher
    }

    fn prepare(&mut self) {
        self.compiled = match self.match_type {
            MatchType::Regex => Regex::new(&self.name).ok(),
            MatchType::Exact | MatchType::Contains => None,
        };
    }

    fn is_match(&self, generator_name: Option<&str>) -> bool {
        let Some(name) = generator_name.filter(|n| !n.is_empty()) else {
            return false;
        };
        match self.match_type {
            MatchType::Exact => self.name == name,
            MatchType::Contains => name.contains(self.name.as_str()),
            MatchType::Regex => self.compiled.as_ref().is_some_and(|re| re.is_match(name)),
        }
    }

    fn validate(&self) -> Option<ValidationError> {
        if self.name.is_empty() {
            return Some(ValidationError::EmptyGeneratorName {
                match_type: self.match_type.to_string(),
            });
        }
        if self.match_type == MatchType::Regex {
            if let Err(e) = Regex::new(&self.name) {
                return Some(ValidationError::InvalidRegex {
                    pattern: self.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
        None
    }
}

impl fmt::Display for GeneratorNameMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.match_type, self.name)
    }
}

/// Container matcher variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DropperMatcher {
    /// Match by item generator name.
    GeneratorName(GeneratorNameMatcher),
}

impl DropperMatcher {
    /// Creates an exact generator name matcher.
    #[must_use]
    pub fn exact(name: impl Into<String>) -> Self {
        Self::GeneratorName(GeneratorNameMatcher::new(name, MatchType::Exact))
    }

    /// Creates a substring generator name matcher.
    #[must_use]
    pub fn contains(name: impl Into<String>) -> Self {
        Self::GeneratorName(GeneratorNameMatcher::new(name, MatchType::Contains))
    }

    /// Creates a regex generator name matcher.
    #[must_use]
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::GeneratorName(GeneratorNameMatcher::new(pattern, MatchType::Regex))
    }

    /// Returns true if the container with this generator name is selected.
    #[must_use]
    pub fn is_match(&self, generator_name: Option<&str>) -> bool {
        match self {
            Self::GeneratorName(m) => m.is_match(generator_name),
        }
    }

    /// Builds derived state (compiled patterns) after deserialization.
    pub fn prepare(&mut self) {
        match self {
            Self::GeneratorName(m) => m.prepare(),
        }
    }

    /// Returns the configuration error of this matcher, if any.
    #[must_use]
    pub fn validate(&self) -> Option<ValidationError> {
        match self {
            Self::GeneratorName(m) => m.validate(),
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::GeneratorName(_) => "generator_name",
        }
    }
}

impl fmt::Display for DropperMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GeneratorName(m) => write!(f, "{m}"),
        }
    }
}

/// Removes matchers equal by (kind, display form), keeping first occurrences.
pub fn dedup_matchers(matchers: &mut Vec<DropperMatcher>) {
    let mut seen = HashSet::new();
    matchers.retain(|m| seen.insert((m.kind(), m.to_string())));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_contains() {
        assert!(DropperMatcher::exact("Pouch").is_match(Some("Pouch")));
        assert!(!DropperMatcher::exact("Pouch").is_match(Some("Pouch 2")));
        assert!(DropperMatcher::contains("Pouch").is_match(Some("Big Pouch 2")));
        assert!(!DropperMatcher::contains("Pouch").is_match(None));
        assert!(!DropperMatcher::contains("").is_match(Some("")));
    }

    #[test]
    fn regex_is_compiled_after_deserialize() {
        let json = r#"{"type":"generator_name","name":"^Loot[0-9]+$","match":"regex"}"#;
        let mut matcher: DropperMatcher = serde_json::from_str(json).unwrap();
        assert!(!matcher.is_match(Some("Loot12")));
        matcher.prepare();
        assert!(matcher.is_match(Some("Loot12")));
        assert!(!matcher.is_match(Some("Loot12b")));
    }

    #[test]
    fn validate_flags_empty_and_bad_patterns() {
        assert!(DropperMatcher::exact("a").validate().is_none());
        assert!(matches!(
            DropperMatcher::exact("").validate(),
            Some(ValidationError::EmptyGeneratorName { .. })
        ));
        assert!(matches!(
            DropperMatcher::regex("(").validate(),
            Some(ValidationError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn dedup_uses_kind_and_display() {
        let mut matchers = vec![
            DropperMatcher::exact("A"),
            DropperMatcher::contains("A"),
            DropperMatcher::exact("A"),
        ];
        dedup_matchers(&mut matchers);
        let rendered: Vec<String> = matchers.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["Exact 'A'", "Contains 'A'"]);
    }
}
