//! Error types for drop-table alterations.
//!
//! Errors are strongly typed using thiserror. Validation problems are not
//! propagated as `Err` through the matching pipeline; they are collected as
//! human-readable strings during the activation pass so that one broken rule
//! never prevents the others from running.

use thiserror::Error;

/// Problems found while validating rules, constraints and alterations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{leaf} should not be empty! Leave matcher list empty to match any.")]
    EmptyConstraint {
        leaf: &'static str,
    },

    #[error("Empty list of {field} for {alteration}!")]
    EmptyPayload {
        field: &'static str,
        alteration: &'static str,
    },

    #[error("Item generator name for {match_type} matcher should not be empty!")]
    EmptyGeneratorName {
        match_type: String,
    },

    #[error("Invalid regex '{pattern}': {reason}")]
    InvalidRegex {
        pattern: String,
        reason: String,
    },

    #[error("Unable to find drop table with UID '{uid}'!")]
    UnknownDropTable {
        uid: String,
    },

    #[error("Drop table with UID '{uid}' does not contain any drops!")]
    DropTableWithoutDrops {
        uid: String,
    },

    #[error("Unrecognized alteration type")]
    UnknownAlteration,

    #[error("No Alterations configured!")]
    NoAlterations,
}

impl ValidationError {
    /// Returns true if the error comes from an unresolved cross-reference.
    ///
    /// Reference errors are reported but do not make the owning alteration
    /// inert: the remaining references still contribute drops.
    #[must_use]
    pub const fn is_reference(&self) -> bool {
        matches!(
            self,
            Self::UnknownDropTable { .. } | Self::DropTableWithoutDrops { .. }
        )
    }
}

/// Top-level error type for fallible I/O around the engine.
#[derive(Debug, Error)]
pub enum AlterationError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to serialize {what}: {message}")]
    Serialize {
        what: &'static str,
        message: String,
    },

    #[error("Failed to deserialize {what}: {message}")]
    Deserialize {
        what: &'static str,
        message: String,
    },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl AlterationError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this error came from reading or writing a file.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

/// Result type alias for fallible alteration operations.
pub type AlterationResult<T> = Result<T, AlterationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_constraint_message() {
        let err = ValidationError::EmptyConstraint { leaf: "Scene" };
        let msg = format!("{err}");
        assert_eq!(
            msg,
            "Scene should not be empty! Leave matcher list empty to match any."
        );
    }

    #[test]
    fn test_empty_payload_message() {
        let err = ValidationError::EmptyPayload {
            field: "ItemsToRemove",
            alteration: "RemoveChanceDrops",
        };
        assert_eq!(
            format!("{err}"),
            "Empty list of ItemsToRemove for RemoveChanceDrops!"
        );
    }

    #[test]
    fn test_reference_classification() {
        assert!(ValidationError::UnknownDropTable { uid: "a".into() }.is_reference());
        assert!(ValidationError::DropTableWithoutDrops { uid: "a".into() }.is_reference());
        assert!(!ValidationError::UnknownAlteration.is_reference());
        assert!(!ValidationError::EmptyConstraint { leaf: "OwnerUid" }.is_reference());
    }

    #[test]
    fn test_alteration_error_from_validation() {
        let err: AlterationError = ValidationError::UnknownAlteration.into();
        assert!(err.is_validation());
        assert!(!err.is_io());
        assert!(format!("{err}").contains("Unrecognized alteration type"));
    }

    #[test]
    fn test_alteration_error_internal() {
        let err = AlterationError::internal("unexpected state");
        assert!(!err.is_validation());
        assert!(format!("{err}").contains("unexpected state"));
    }
}
