//! Backup engine errors.
//!
//! One variant per failure a caller has to tell apart. `ClearFailed` and
//! `InsertFailed` leave the store partially restored and are never retried or
//! rolled back by the engine.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::store::StoreError;
use crate::model::TableName;

/// Longest statement excerpt carried by [`BackupError::InsertFailed`]
const PREVIEW_CHARS: usize = 80;

/// Why a backup file name was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NameRejection {
    #[error("name must look like backup_YYYYMMDD_HHMMSS.sql")]
    PatternMismatch,
    #[error("name must not contain path separators or parent segments")]
    PathTraversal,
    #[error("timestamp portion is not a valid date and time")]
    InvalidTimestamp,
}

/// Errors surfaced by backup, listing, download, restore and delete operations
#[derive(Debug, Error)]
pub enum BackupError {
    /// The store failed while a table was exported; nothing was written.
    #[error("failed to read table `{table}`: {source}")]
    ReadFailure {
        table: TableName,
        #[source]
        source: StoreError,
    },

    /// The artifact could not be persisted; no partial file is left behind.
    #[error("failed to write backup file {}: {source}", .path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The retention cap is reached; an old backup must be deleted first.
    #[error("backup limit reached ({limit}), delete an old backup first")]
    RetentionExceeded { limit: usize },

    /// The file name does not match the artifact pattern.
    #[error("invalid backup file name '{name}': {reason}")]
    InvalidName { name: String, reason: NameRejection },

    /// The file name is well-formed but no such artifact exists.
    #[error("backup file '{name}' does not exist")]
    NotFound { name: String },

    /// An uploaded dump lacks the product marker; nothing was touched.
    #[error("invalid backup file: missing '{marker}' marker")]
    InvalidFormat { marker: &'static str },

    /// Disabling referential-integrity checks failed; nothing was touched.
    #[error("failed to toggle foreign key checks: {source}")]
    EngineError {
        #[source]
        source: StoreError,
    },

    /// Clearing a table failed; earlier tables in the clear order are empty.
    #[error("failed to clear table `{table}`: {source}")]
    ClearFailed {
        table: TableName,
        #[source]
        source: StoreError,
    },

    /// A replayed insertion failed; statements before it have been applied.
    #[error("statement #{position} failed ({preview}): {source}")]
    InsertFailed {
        position: usize,
        preview: String,
        #[source]
        source: StoreError,
    },

    /// The backup directory could not be created, listed or read.
    #[error("backup storage error at {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl BackupError {
    /// Whether the failure was caused by the request rather than the system
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            BackupError::InvalidName { .. }
                | BackupError::NotFound { .. }
                | BackupError::InvalidFormat { .. }
                | BackupError::RetentionExceeded { .. }
        )
    }

    /// Whether the store was left partially restored
    pub fn requires_manual_intervention(&self) -> bool {
        matches!(
            self,
            BackupError::ClearFailed { .. } | BackupError::InsertFailed { .. }
        )
    }

    /// Short, single-line excerpt of a statement for error messages
    pub fn statement_preview(statement: &str) -> String {
        let flat: String = statement
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect();
        let flat = flat.trim();

        if flat.chars().count() > PREVIEW_CHARS {
            let head: String = flat.chars().take(PREVIEW_CHARS).collect();
            format!("{}...", head)
        } else {
            flat.to_string()
        }
    }
}

/// Result type alias for backup engine operations.
pub type BackupResult<T> = Result<T, BackupError>;
