use thiserror::Error;

/// Result alias used across the crate.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors surfaced by the invoice core.
///
/// Every variant corresponds to a stable error kind the boundary can map
/// onto its own response shapes; the variants carry a short message plus
/// optional structured details.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoreError {
    /// Malformed input: NIP, date, amount, quantity, enum value, text field.
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        /// Per-field issues when more than one field is involved.
        issues: Vec<ValidationIssue>,
    },

    /// A referenced entity does not exist.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Unique-constraint clash: duplicate invoice number or NIP.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Deleting an entity other rows still point at.
    #[error("{entity} is still referenced by existing invoices")]
    ReferenceInUse { entity: &'static str },

    /// The external XSD validator rejected the generated document.
    #[error("FA(3) schema validation failed: {stderr}")]
    Fa3ValidationFailed { stderr: String },

    /// Filesystem or external-process failure; artifact steps may be retried.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invariant violation: a bug, not a caller error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Single-message validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            issues: Vec::new(),
        }
    }

    /// Validation error tied to one field.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let issue = ValidationIssue::new(field, message);
        Self::Validation {
            message: issue.to_string(),
            issues: vec![issue],
        }
    }

    /// Validation error aggregating several field issues.
    pub fn issues(issues: Vec<ValidationIssue>) -> Self {
        let message = issues
            .iter()
            .map(ValidationIssue::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Self::Validation { message, issues }
    }
}

/// A single validation issue with field path and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Dot-separated path to the invalid field (e.g. "items[1].quantity").
    pub field: String,
    /// Human-readable error description.
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ffi::{SQLITE_CONSTRAINT_PRIMARYKEY, SQLITE_CONSTRAINT_UNIQUE};

        match &err {
            rusqlite::Error::SqliteFailure(e, message)
                if e.extended_code == SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                CoreError::Conflict(
                    message
                        .clone()
                        .unwrap_or_else(|| "unique constraint violated".into()),
                )
            }
            _ => CoreError::Internal(format!("database error: {err}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_error_carries_issue() {
        let err = CoreError::field("nip", "must be exactly 10 digits");
        match err {
            CoreError::Validation { message, issues } => {
                assert_eq!(issues.len(), 1);
                assert_eq!(issues[0].field, "nip");
                assert!(message.contains("10 digits"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn issues_join_messages() {
        let err = CoreError::issues(vec![
            ValidationIssue::new("name", "must not be empty"),
            ValidationIssue::new("unit", "too long"),
        ]);
        assert!(err.to_string().contains("name: must not be empty"));
        assert!(err.to_string().contains("unit: too long"));
    }
}
