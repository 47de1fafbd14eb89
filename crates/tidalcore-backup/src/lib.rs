//! # TidalCore Backup
//!
//! Full-store SQL dumps for TidalCore: composing a dump of the backed-up
//! tables, keeping a bounded set of dump files on disk, and restoring a store
//! from a stored dump or from uploaded dump text.
//!
//! ## Components
//!
//! - **[escape]**: quoting of text values
//! - **[serializer]**: one delete-then-insert block per table
//! - **[composer]**: header, integrity toggles and all table blocks
//! - **[splitter]**: quote-aware statement splitting
//! - **[restore]**: validate, suspend integrity checks, clear, replay
//! - **[retention]**: naming, retention cap, listing, safe path resolution
//! - **[BackupService]**: the six caller-facing operations
//!
//! ## Feature Flags
//!
//! - `sqlite` (default): [`SqliteStore`], a bundled SQLite store
//!
//! ## Example
//!
//! ```rust
//! # #[cfg(feature = "sqlite")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use tidalcore_backup::{ArtifactStore, BackupService, SqliteStore};
//!
//! let dir = tempfile::tempdir()?;
//! let store = SqliteStore::open_in_memory()?;
//! let service = BackupService::new(store, ArtifactStore::new(dir.path(), 10));
//!
//! let info = service.create_backup()?;
//! assert!(info.filename.starts_with("backup_"));
//! service.restore_backup(&info.filename)?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "sqlite"))]
//! # fn main() {}
//! ```

pub use tidalcore_core::{BackupError, BackupResult, PRODUCT_MARKER, Store};

pub mod composer;
pub mod escape;
pub mod restore;
pub mod retention;
pub mod serializer;
pub mod splitter;

mod service;
pub use service::BackupService;

pub use composer::{DumpDocument, compose_dump, compose_dump_at};
pub use restore::{DumpSource, RestorePhase, RestoreReport, restore};
pub use retention::{ArtifactStore, BackupInfo};

#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
