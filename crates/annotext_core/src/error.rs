//! Engine error types for ranges, decorations, actions and storage.

use crate::decoration::DecorationId;
use crate::range::Range;
use thiserror::Error;

/// Top-level engine error type.
///
/// Range and layout errors fail the specific operation. Dangling references
/// abort a single action without touching state or history.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid range {range}: {reason}")]
    InvalidRange { range: Range, reason: String },

    #[error("Range {range} is out of bounds for a block of {len} chars")]
    OutOfBounds { range: Range, len: usize },

    #[error("Dangling reference to {0}")]
    DanglingReference(DecorationId),

    #[error("Decoration {0} already exists")]
    DuplicateDecoration(DecorationId),

    #[error("Conflicting edit: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] redb::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Storage error: {0}")]
    StorageMessage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No collection is open")]
    NoSession,
}

impl EngineError {
    /// Build an [`EngineError::InvalidRange`] from a range and reason.
    pub fn invalid_range(range: Range, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            range,
            reason: reason.into(),
        }
    }
}

impl From<redb::DatabaseError> for EngineError {
    fn from(value: redb::DatabaseError) -> Self {
        Self::Database(value.into())
    }
}

impl From<redb::TransactionError> for EngineError {
    fn from(value: redb::TransactionError) -> Self {
        Self::Database(value.into())
    }
}

impl From<redb::TableError> for EngineError {
    fn from(value: redb::TableError) -> Self {
        Self::Database(value.into())
    }
}

impl From<redb::StorageError> for EngineError {
    fn from(value: redb::StorageError) -> Self {
        Self::Database(value.into())
    }
}

impl From<redb::CommitError> for EngineError {
    fn from(value: redb::CommitError) -> Self {
        Self::Database(value.into())
    }
}
