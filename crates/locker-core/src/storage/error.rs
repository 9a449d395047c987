//! Storage error handling
//!
//! Provides typed errors for store operations with descriptive messages
//! and recovery suggestions.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::ValidationError;

/// A stored or imported value could not be decoded
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The tag column of a bookmark is not a JSON array of strings
    #[error("Malformed tag encoding {value:?}: {source}")]
    Tags {
        value: String,
        #[source]
        source: serde_json::Error,
    },

    /// A backup document could not be parsed
    #[error("Malformed backup document: {0}")]
    Snapshot(#[source] serde_json::Error),

    /// A stored timestamp is outside the representable range
    #[error("Invalid timestamp in column '{column}': {millis}")]
    Timestamp { column: &'static str, millis: i64 },
}

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// A record failed validation before reaching the database
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A stored value or backup document could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The store worker has shut down
    #[error("Store is closed")]
    Closed,

    /// The store worker thread could not be started
    #[error("Failed to start store worker: {0}")]
    Worker(#[source] io::Error),

    /// Failed to create data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Permission denied accessing path
    #[error("Permission denied: cannot access '{path}'. Check file permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Disk is full or quota exceeded
    #[error(
        "Disk full or quota exceeded while writing to '{path}'. Free up disk space and try again."
    )]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read file
    #[error("Failed to read '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write file
    #[error("Failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// File not found (when expected to exist)
    #[error("File not found: '{path}'")]
    NotFound { path: PathBuf },
}

impl StoreError {
    /// Create an error from a write-side I/O error with path context
    ///
    /// Classifies the error based on its kind (permission, disk full, etc.)
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StoreError::PermissionDenied {
                path,
                source: error,
            },
            io::ErrorKind::NotFound => StoreError::NotFound { path },
            _ if is_disk_full_error(&error) => StoreError::DiskFull {
                path,
                source: error,
            },
            _ => StoreError::WriteError {
                path,
                source: error,
            },
        }
    }

    /// Create an error from a read-side I/O error with path context
    pub fn from_read_io(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StoreError::PermissionDenied {
                path,
                source: error,
            },
            io::ErrorKind::NotFound => StoreError::NotFound { path },
            _ => StoreError::ReadError {
                path,
                source: error,
            },
        }
    }

    /// True for failures of the backup file itself rather than the store
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            StoreError::CreateDirectory { .. }
                | StoreError::PermissionDenied { .. }
                | StoreError::DiskFull { .. }
                | StoreError::ReadError { .. }
                | StoreError::WriteError { .. }
                | StoreError::NotFound { .. }
        )
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StoreError::DiskFull { .. }
                | StoreError::PermissionDenied { .. }
                | StoreError::Validation(_)
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StoreError::DiskFull { .. } => Some("Free up disk space and try again."),
            StoreError::PermissionDenied { .. } => {
                Some("Check file and directory permissions. You may need to run with different permissions or change ownership.")
            }
            StoreError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            StoreError::Decode(DecodeError::Snapshot(_)) => {
                Some("The file is not a Bookmark Locker backup. Nothing was changed.")
            }
            StoreError::Validation(_) => Some("Correct the input and try again."),
            _ => None,
        }
    }
}

/// Check if an I/O error indicates disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_classification() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err = StoreError::from_io(io_err, PathBuf::from("/test/path"));

        assert!(matches!(err, StoreError::PermissionDenied { .. }));
        assert!(err.is_recoverable());
        assert!(err.is_io());
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_not_found_classification() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err = StoreError::from_read_io(io_err, PathBuf::from("/missing/backup.json"));

        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(err.is_io());
    }

    #[test]
    fn test_disk_full_detection() {
        let io_err = io::Error::new(io::ErrorKind::Other, "No space left on device");
        let err = StoreError::from_io(io_err, PathBuf::from("/full/disk"));

        assert!(matches!(err, StoreError::DiskFull { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_read_error_is_not_write_error() {
        let io_err = io::Error::new(io::ErrorKind::InvalidData, "stream did not contain valid UTF-8");
        let err = StoreError::from_read_io(io_err, PathBuf::from("/data/backup.json"));

        assert!(matches!(err, StoreError::ReadError { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_malformed_snapshot_display() {
        let source = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err = StoreError::from(DecodeError::Snapshot(source));

        assert!(err.to_string().contains("Malformed backup document"));
        assert!(!err.is_io());
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_validation_display() {
        let err = StoreError::from(ValidationError::BlankUrl);
        assert!(err.to_string().contains("URL cannot be empty"));
    }
}
