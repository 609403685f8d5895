//! Storage error types
//!
//! Defines all errors that can occur in the storage layer.

use crate::lock::LockType;
use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors that can occur in the store
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite reported an error not covered by a more specific variant
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Requested row does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Unique or foreign-key constraint rejected the write
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Input failed a domain rule
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation is not allowed in the row's current status
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Ayat cannot be recorded because a partial hafalan blocks it
    #[error("Ayat {ayat} is locked ({lock})")]
    AyatLocked { ayat: u32, lock: LockType },

    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => StorageError::NotFound("Record".to_string()),
            rusqlite::Error::SqliteFailure(e, msg) if e.code == ErrorCode::ConstraintViolation => {
                StorageError::Constraint(msg.unwrap_or_else(|| e.to_string()))
            }
            other => StorageError::Database(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::NotFound("Kaca 7".to_string());
        assert_eq!(err.to_string(), "Kaca 7 not found");

        let err = StorageError::AyatLocked {
            ayat: 4,
            lock: LockType::Sequential,
        };
        assert_eq!(err.to_string(), "Ayat 4 is locked (sequential)");
    }

    #[test]
    fn test_no_rows_maps_to_not_found() {
        let err: StorageError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let storage_err: StorageError = io_err.into();
        assert!(matches!(storage_err, StorageError::Io(_)));
    }
}
