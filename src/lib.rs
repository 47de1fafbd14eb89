//! # TidalCore
//!
//! Backup, retention and restore for the TidalCore check-in service.
//!
//! The workspace splits into:
//!
//! - [`model`], [`store`], [`error`] and [`config`]: records, the [`Store`]
//!   contract, the error taxonomy and configuration
//! - [`backup`]: dump composition, statement splitting, restore replay and
//!   artifact retention, plus the SQLite store (feature `sqlite`)
//! - [`http`]: the axum routes over [`BackupService`] (feature `http`)
//!
//! ```rust
//! use tidalcore::{ArtifactStore, BackupService, SqliteStore};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let service = BackupService::new(
//!     SqliteStore::open_in_memory().unwrap(),
//!     ArtifactStore::new(dir.path().join("backups"), 10),
//! );
//!
//! let created = service.create_backup().unwrap();
//! let report = service.restore_backup(&created.filename).unwrap();
//! assert_eq!(report.executed, 0);
//! ```

pub use tidalcore_backup as backup;
pub use tidalcore_core::{config, error, model, store};
#[cfg(feature = "http")]
pub use tidalcore_http as http;

pub use tidalcore_backup::{
    ArtifactStore, BackupInfo, BackupService, DumpDocument, DumpSource, RestoreReport,
    compose_dump, restore,
};
#[cfg(feature = "sqlite")]
pub use tidalcore_backup::SqliteStore;
pub use tidalcore_core::{
    BackupError, BackupResult, PRODUCT_MARKER, Store, StoreError, TABLES, TableName, TidalConfig,
};
