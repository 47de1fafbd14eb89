//! Caller-facing backup operations
//!
//! [`BackupService`] ties the composer, the restore orchestrator and the
//! artifact store to one [`Store`]. It performs no locking of its own;
//! callers that share it across threads must serialise access.

use std::path::PathBuf;

use tidalcore_core::{BackupResult, Store};
use tracing::info;

use crate::composer::compose_dump;
use crate::restore::{DumpSource, RestoreReport, restore};
use crate::retention::{ArtifactStore, BackupInfo};

pub struct BackupService<S> {
    store: S,
    artifacts: ArtifactStore,
}

impl<S: Store> BackupService<S> {
    pub fn new(store: S, artifacts: ArtifactStore) -> Self {
        Self { store, artifacts }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Dump every backed-up table into a new artifact
    ///
    /// Fails with `RetentionExceeded` when the cap is reached. Nothing is
    /// written unless the whole dump was composed.
    pub fn create_backup(&self) -> BackupResult<BackupInfo> {
        self.artifacts.enforce_retention()?;

        let document = compose_dump(&self.store)?;
        let filename = ArtifactStore::create_name_at(document.generated_at());
        let info = self.artifacts.persist(&filename, document.as_bytes())?;

        info!(filename = %info.filename, size = info.size, "Backup created");
        Ok(info)
    }

    /// Stored artifacts, most recent first
    pub fn list_backups(&self) -> BackupResult<Vec<BackupInfo>> {
        self.artifacts.list()
    }

    /// Path of an existing artifact, for download
    pub fn backup_path(&self, filename: &str) -> BackupResult<PathBuf> {
        self.artifacts.resolve_path(filename)
    }

    /// Replace the store contents with those of a stored artifact
    pub fn restore_backup(&self, filename: &str) -> BackupResult<RestoreReport> {
        let dump = self.artifacts.read(filename)?;
        let report = restore(&self.store, &dump, DumpSource::Managed)?;
        info!(filename = %filename, executed = report.executed, "Backup restored");
        Ok(report)
    }

    /// Replace the store contents with those of caller-supplied dump text
    ///
    /// The text must carry the product marker; it is refused before any
    /// table is touched otherwise.
    pub fn restore_from_upload(&self, dump: &str) -> BackupResult<RestoreReport> {
        let report = restore(&self.store, dump, DumpSource::Uploaded)?;
        info!(
            bytes = dump.len(),
            executed = report.executed,
            "Backup restored from upload"
        );
        Ok(report)
    }

    /// Remove a stored artifact
    pub fn delete_backup(&self, filename: &str) -> BackupResult<()> {
        self.artifacts.delete(filename)
    }
}
