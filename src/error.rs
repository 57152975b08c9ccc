//! Error types for ranking, reranking and session orchestration.
//!
//! Every failure carries an [`ErrorKind`] so callers can decide whether to
//! halt a pipeline stage or carry on with the last good state. Feedback on a
//! docno that is no longer ranked is deliberately *not* an error: the
//! reranker returns its input unchanged.

use std::time::Duration;
use thiserror::Error;

/// Result type for trialrank operations.
pub type Result<T> = std::result::Result<T, RankError>;

/// Coarse classification of a [`RankError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid `topn`/`nmax`, normalization bounds or session settings.
    Configuration,
    /// A similarity matrix that does not belong to the ranked list it is applied to.
    InvariantViolation,
    /// Retrieval, translation, expansion or similarity call failed or timed out.
    CollaboratorFailure,
    /// Empty query, feedback without an active search, and similar caller mistakes.
    InvalidInput,
}

#[derive(Debug, Error)]
pub enum RankError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("similarity matrix has {matrix} rows but the ranked list has {ranked} entries")]
    DimensionMismatch { matrix: usize, ranked: usize },

    #[error("similarity matrix snapshot does not match ranked list at position {position}: expected {expected}, found {found}")]
    SnapshotMismatch {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("malformed similarity matrix: {0}")]
    MalformedMatrix(String),

    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: &'static str,
        message: String,
    },

    #[error("{collaborator} timed out after {elapsed:?}")]
    Timeout {
        collaborator: &'static str,
        elapsed: Duration,
    },

    #[error("query is empty")]
    EmptyQuery,

    #[error("no active search in this session")]
    NoActiveSearch,
}

impl RankError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::DimensionMismatch { .. }
            | Self::SnapshotMismatch { .. }
            | Self::MalformedMatrix(_) => ErrorKind::InvariantViolation,
            Self::Collaborator { .. } | Self::Timeout { .. } => ErrorKind::CollaboratorFailure,
            Self::EmptyQuery | Self::NoActiveSearch => ErrorKind::InvalidInput,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn collaborator(collaborator: &'static str, message: impl ToString) -> Self {
        Self::Collaborator {
            collaborator,
            message: message.to_string(),
        }
    }

    /// Whether retrying the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::CollaboratorFailure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(RankError::config("topn").kind(), ErrorKind::Configuration);
        assert_eq!(
            RankError::DimensionMismatch { matrix: 2, ranked: 3 }.kind(),
            ErrorKind::InvariantViolation
        );
        assert_eq!(
            RankError::Timeout {
                collaborator: "retriever",
                elapsed: Duration::from_millis(10)
            }
            .kind(),
            ErrorKind::CollaboratorFailure
        );
        assert_eq!(RankError::EmptyQuery.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_only_collaborator_errors_retry() {
        assert!(RankError::collaborator("translator", "503").is_retryable());
        assert!(!RankError::NoActiveSearch.is_retryable());
        assert!(!RankError::MalformedMatrix("ragged".into()).is_retryable());
    }

    #[test]
    fn test_display_mentions_collaborator() {
        let err = RankError::collaborator("retriever", "index not loaded");
        assert_eq!(err.to_string(), "retriever failed: index not loaded");
    }
}
