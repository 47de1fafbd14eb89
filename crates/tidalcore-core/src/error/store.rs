//! Store collaborator errors.

use thiserror::Error;

/// Failures reported by a [`crate::store::Store`] implementation
///
/// Messages are expected to be sanitised already; see
/// [`crate::sanitization::DatabaseErrorSanitizer`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or opened
    #[error("store connection failed: {0}")]
    Connection(String),

    /// A statement or query was rejected by the store
    #[error("statement failed: {0}")]
    Query(String),

    /// A row could not be decoded into a record
    #[error("invalid row data: {0}")]
    InvalidData(String),
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
