//! Router configuration and server loop

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use tidalcore_core::Store;
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::info;

use crate::handlers::{
    create_backup, delete_backup, download_backup, list_backups, restore_backup, upload_backup,
};
use crate::state::AppState;

/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

/// Build the backup API router
pub fn router<S: Store + Send + 'static>(state: AppState<S>) -> Router {
    let body_limit = state
        .upload_settings()
        .max_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    Router::new()
        .route(
            "/api/backups",
            get(list_backups::<S>).post(create_backup::<S>),
        )
        .route("/api/backups/upload", post(upload_backup::<S>))
        .route("/api/backups/{filename}", delete(delete_backup::<S>))
        .route(
            "/api/backups/{filename}/download",
            get(download_backup::<S>),
        )
        .route("/api/backups/{filename}/restore", post(restore_backup::<S>))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
}

/// Serve `app` on `listener` until Ctrl-C
pub async fn serve(listener: TcpListener, app: Router) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    info!(addr = %addr, "TidalCore backup API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
}
