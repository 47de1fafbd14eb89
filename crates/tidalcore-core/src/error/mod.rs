//! Error Types
//!
//! Errors are split by concern:
//! - `store`: failures reported by the store collaborator
//! - `backup`: the backup engine taxonomy surfaced to callers
//!
//! Configuration errors live next to the configuration in [`crate::config`].

mod backup;
mod store;

pub use backup::{BackupError, BackupResult, NameRejection};
pub use store::{StoreError, StoreResult};

pub use crate::config::ConfigError;
