//! # Memory Errors
//!
//! Typed failures for the three memory sources. A missing profile or an empty
//! chat history is never an error; those are empty results.

use serde::{Deserialize, Serialize};

/// What went wrong inside a relational store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageErrorKind {
    /// Connection or transport failure
    Unavailable,
    /// A stored row could not be decoded
    Malformed,
}

/// Failure of a single memory source call
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MemoryError {
    #[error("storage error ({kind:?}): {message}")]
    Storage {
        kind: StorageErrorKind,
        message: String,
    },
    #[error("embedding error: {0}")]
    Embedding(String),
    #[error("vector index unavailable: {0}")]
    IndexUnavailable(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl MemoryError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Storage {
            kind: StorageErrorKind::Unavailable,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Storage {
            kind: StorageErrorKind::Malformed,
            message: message.into(),
        }
    }

    /// Invalid arguments abort the caller instead of degrading a field
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

impl From<rusqlite::Error> for MemoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::IntegralValueOutOfRange(..) => Self::malformed(err.to_string()),
            other => Self::unavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_failures_map_to_unavailable() {
        let err: MemoryError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(
            err,
            MemoryError::Storage {
                kind: StorageErrorKind::Unavailable,
                ..
            }
        ));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_invalid_argument_is_fatal() {
        assert!(MemoryError::InvalidArgument("k must be positive".into()).is_fatal());
        assert!(!MemoryError::Embedding("timeout".into()).is_fatal());
    }
}
