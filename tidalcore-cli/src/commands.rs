//! Command implementations

use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tidalcore_backup::{ArtifactStore, BackupService, RestoreReport, SqliteStore};
use tidalcore_core::{BackupError, StoreError, TidalConfig};
use tidalcore_http::upload::{check_file_name, check_size};
use tidalcore_http::{AppState, UploadRejection, validate_upload};
use tracing::info;

use crate::BackupCommands;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to open database: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error("upload rejected: {0}")]
    Upload(#[from] UploadRejection),

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("failed to encode listing: {0}")]
    Json(#[from] serde_json::Error),
}

fn open_service(config: &TidalConfig) -> Result<BackupService<SqliteStore>, CliError> {
    let store = SqliteStore::open(&config.database.path)?;
    let artifacts = ArtifactStore::from_settings(&config.backup);
    Ok(BackupService::new(store, artifacts))
}

fn print_report(report: &RestoreReport) {
    println!(
        "Restore complete: {} insert statements executed, {} skipped",
        report.executed, report.skipped
    );
}

/// Run one `tidalcore backup` subcommand to completion
pub fn run_backup_command(command: BackupCommands, config: &TidalConfig) -> Result<(), CliError> {
    let service = open_service(config)?;

    match command {
        BackupCommands::Create => {
            let backup = service.create_backup()?;
            println!("{} ({} bytes)", backup.filename, backup.size);
        }
        BackupCommands::List { json } => {
            let backups = service.list_backups()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&backups)?);
            } else if backups.is_empty() {
                println!("No backups in {}", service.artifacts().directory().display());
            } else {
                for backup in &backups {
                    println!(
                        "{}  {:>10}  {}",
                        backup.filename,
                        backup.size,
                        backup.created_at.format("%Y-%m-%d %H:%M:%S")
                    );
                }
            }
        }
        BackupCommands::Path { filename } => {
            println!("{}", service.backup_path(&filename)?.display());
        }
        BackupCommands::Restore { filename } => {
            let report = service.restore_backup(&filename)?;
            print_report(&report);
        }
        BackupCommands::Upload { file } => {
            let read_error = |source: std::io::Error| CliError::Read {
                path: file.clone(),
                source,
            };
            let file_name = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            // Refuse before buffering the file.
            check_file_name(&file_name, &config.upload)?;
            check_size(fs::metadata(&file).map_err(read_error)?.len(), &config.upload)?;

            let content = fs::read(&file).map_err(read_error)?;
            let dump = validate_upload(&file_name, content, &config.upload)?;
            let report = service.restore_from_upload(&dump)?;
            print_report(&report);
        }
        BackupCommands::Delete { filename } => {
            service.delete_backup(&filename)?;
            println!("Deleted {}", filename);
        }
    }

    Ok(())
}

/// Serve the HTTP API until Ctrl-C
pub fn run_serve(config: &TidalConfig) -> Result<(), CliError> {
    let service = open_service(config)?;
    let state = AppState::new(service, config.upload.clone());
    let app = tidalcore_http::router(state);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
        info!(
            bind = %config.server.bind,
            backup_dir = %config.backup.directory.display(),
            "Starting TidalCore backup API"
        );
        tidalcore_http::serve(listener, app).await
    })?;

    Ok(())
}
