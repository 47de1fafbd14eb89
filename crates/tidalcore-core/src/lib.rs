//! # TidalCore Core
//!
//! Shared building blocks for the TidalCore backup engine: the records of the
//! three backed-up tables, the [`Store`] contract the engine reads from and
//! replays into, the error taxonomy, and runtime configuration.
//!
//! This crate performs no I/O of its own apart from reading a configuration
//! file. The engine lives in `tidalcore-backup`.
//!
//! ## Example
//!
//! ```rust
//! use tidalcore_core::{TableName, TABLES};
//!
//! // Export order is fixed: accounts first, visits last.
//! let order: Vec<TableName> = TABLES.iter().map(|spec| spec.table).collect();
//! assert_eq!(order, vec![TableName::Users, TableName::Checkins, TableName::Visits]);
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod sanitization;
pub mod store;

pub use config::{BackupSettings, TidalConfig};
pub use error::{BackupError, BackupResult, ConfigError, NameRejection, StoreError, StoreResult};
pub use model::{Account, Checkin, DumpRecord, SqlValue, TableName, Visit};
pub use store::{Row, Store, TABLES, TableSpec};

/// Substring every dump header carries; uploaded dumps without it are refused.
pub const PRODUCT_MARKER: &str = "TidalCore Database Backup";
