//! Shared handler state

use std::sync::{Arc, Mutex};

use tidalcore_backup::BackupService;
use tidalcore_core::config::UploadSettings;
use tidalcore_core::{BackupResult, Store};

use crate::error::{ApiError, ApiResult};

/// State shared by every handler
///
/// The engine is synchronous and does no locking of its own. All operations
/// run on the blocking pool behind one mutex, so a restore never interleaves
/// with a create or another restore.
pub struct AppState<S> {
    service: Arc<Mutex<BackupService<S>>>,
    upload: Arc<UploadSettings>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            upload: Arc::clone(&self.upload),
        }
    }
}

impl<S: Store + Send + 'static> AppState<S> {
    pub fn new(service: BackupService<S>, upload: UploadSettings) -> Self {
        Self {
            service: Arc::new(Mutex::new(service)),
            upload: Arc::new(upload),
        }
    }

    pub fn upload_settings(&self) -> &UploadSettings {
        &self.upload
    }

    /// Run `op` against the service on the blocking pool
    pub async fn run<T, F>(&self, op: F) -> ApiResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&BackupService<S>) -> BackupResult<T> + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        tokio::task::spawn_blocking(move || {
            let guard = service
                .lock()
                .map_err(|_| ApiError::Internal("backup service lock poisoned".to_string()))?;
            op(&*guard).map_err(ApiError::from)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("backup task failed: {}", e)))?
    }
}
