//! Errors raised by lifecycle records before anything reaches storage.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Deterministic rule violations of models, jobs and identifiers.
///
/// Storage and numeric failures have their own error types in `infra` and
/// `ai`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A caller-supplied value was rejected.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A record would leave a consistent state (e.g. finalising a job twice).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Stored version differs from the one the writer read.
    #[error("version conflict (expected {expected}, actual {actual})")]
    VersionConflict { expected: u64, actual: u64 },

    /// Lifecycle transition not allowed from the current status.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        assert_eq!(
            DomainError::validation("name is blank").to_string(),
            "validation failed: name is blank"
        );
        assert_eq!(
            DomainError::VersionConflict { expected: 2, actual: 3 }.to_string(),
            "version conflict (expected 2, actual 3)"
        );
    }
}
