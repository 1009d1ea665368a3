//! Error types for the CRM data layer.

use std::fmt;

use thiserror::Error;

/// Which store a missing record was looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Contact,
    Deal,
    Activity,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Contact => "contact",
            RecordKind::Deal => "deal",
            RecordKind::Activity => "activity",
        };
        f.write_str(name)
    }
}

/// Errors raised by the stores, the merge resolver and fixture loading.
#[derive(Debug, Error)]
pub enum CrmError {
    /// No record with this identifier exists in the store.
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: u32 },

    /// Create/update input rejected by store validation.
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// Unknown field-choice key path (e.g. `"foo"` or `"customFields."`).
    #[error("invalid field key: {0:?}")]
    InvalidFieldKey(String),

    /// Seed data could not be parsed.
    #[error("fixture error: {0}")]
    Fixture(#[from] serde_json::Error),

    /// Seed file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrmError {
    pub fn contact_not_found(id: u32) -> Self {
        CrmError::NotFound {
            kind: RecordKind::Contact,
            id,
        }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        CrmError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Every identifier up to `u32::MAX` has been handed out.
    pub fn ids_exhausted(kind: RecordKind) -> Self {
        CrmError::Validation {
            field: "Id",
            message: format!("no {} identifiers left", kind),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CrmError::NotFound { .. })
    }
}

/// Result type for CRM operations.
pub type CrmResult<T> = Result<T, CrmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = CrmError::contact_not_found(999);
        assert_eq!(err.to_string(), "contact 999 not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_validation_message() {
        let err = CrmError::validation("email", "Email is required");
        assert_eq!(err.to_string(), "invalid email: Email is required");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_ids_exhausted_message() {
        let err = CrmError::ids_exhausted(RecordKind::Activity);
        assert_eq!(err.to_string(), "invalid Id: no activity identifiers left");
    }

    #[test]
    fn test_deal_not_found_message() {
        let err = CrmError::NotFound {
            kind: RecordKind::Deal,
            id: 3,
        };
        assert_eq!(err.to_string(), "deal 3 not found");
    }
}
