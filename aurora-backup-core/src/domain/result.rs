//! Result and error types for the core library

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unable to create wallet backup. Storage container not found")]
    ContainerNotFound,

    #[error("You have no wallet backups")]
    NoBackupsFound,

    #[error("Unable to create wallet backup. Database file not found")]
    DbFileNotFound,

    #[error("Failed to create wallet backup archive: {0}")]
    ArchiveCreationFailed(String),

    #[error("Unable to unarchive wallet from backup: {0}")]
    UnzipError(String),

    #[error("Unable to restore wallet. Identity error: {0}")]
    IdentityDerivationFailed(String),

    #[error("Wallet public identity is not available")]
    IdentityUnavailable,

    #[error("Invalid wallet identity: {0}")]
    InvalidIdentity(String),

    #[error("Unable to create backup folder: {0}")]
    UnableToCreateBackupFolder(String),

    #[error("A wallet database already exists at {0}")]
    WalletAlreadyExists(PathBuf),

    #[error("Another backup is already being created")]
    BackupInProgress,

    #[error("Backup download did not complete within {0:?}")]
    DownloadTimedOut(Duration),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an archive creation error
    pub fn archive(msg: impl ToString) -> Self {
        Self::ArchiveCreationFailed(msg.to_string())
    }

    /// Create an extraction error
    pub fn unzip(msg: impl ToString) -> Self {
        Self::UnzipError(msg.to_string())
    }

    /// Create a database error
    pub fn database(msg: impl ToString) -> Self {
        Self::Database(msg.to_string())
    }
}

impl From<duckdb::Error> for Error {
    fn from(e: duckdb::Error) -> Self {
        Self::Database(e.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result with optional context (for JSON output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: None,
        }
    }

    /// Attach a context value
    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
        self
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::fail(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_result_ok() {
        let result: OperationResult<i32> = OperationResult::ok(42);
        assert!(result.success);
        assert_eq!(result.data, Some(42));
        assert!(result.error.is_none());
    }

    #[test]
    fn test_from_result() {
        let err: Result<i32> = Err(Error::NoBackupsFound);
        let result: OperationResult<i32> = err.into();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("You have no wallet backups"));
    }

    #[test]
    fn test_with_context() {
        let result = OperationResult::ok(1).with_context("folder", serde_json::json!("abcd"));
        let context = result.context.unwrap();
        assert_eq!(context["folder"], "abcd");
    }
}
