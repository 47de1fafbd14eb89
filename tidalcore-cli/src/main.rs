use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tidalcore_core::TidalConfig;
use tidalcore_core::config::{LogFormat, LoggingSettings};

mod commands;

use commands::{run_backup_command, run_serve};

#[derive(Parser, Debug)]
#[command(name = "tidalcore", version)]
#[command(about = "TidalCore - database backup, restore and retention")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true, default_value = "tidalcore.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the backup HTTP API
    Serve,
    /// Manage backup artifacts
    Backup {
        #[command(subcommand)]
        backup_command: BackupCommands,
    },
}

#[derive(Subcommand, Debug)]
enum BackupCommands {
    /// Compose a dump and store it as a new artifact
    Create,
    /// List stored artifacts, newest first
    List {
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the resolved path of an artifact
    Path {
        /// Artifact name, e.g. backup_20240101_120000.sql
        filename: String,
    },
    /// Restore the database from a stored artifact
    Restore {
        /// Artifact name
        filename: String,
    },
    /// Restore the database from a dump file anywhere on disk
    Upload {
        /// Dump file to restore from
        file: PathBuf,
    },
    /// Delete a stored artifact
    Delete {
        /// Artifact name
        filename: String,
    },
}

fn init_logging(settings: &LoggingSettings) {
    // RUST_LOG wins over the configured level.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    let _ = match settings.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}

fn main() {
    let cli = Cli::parse();

    let config = match TidalConfig::load(Some(&cli.config)) {
        Ok(config) => config,
        Err(e) => {
            init_logging(&LoggingSettings::default());
            tracing::error!(error = %e, path = ?cli.config, "Failed to load configuration");
            std::process::exit(1);
        }
    };
    init_logging(&config.logging);

    let result = match cli.command {
        Commands::Serve => run_serve(&config),
        Commands::Backup { backup_command } => run_backup_command(backup_command, &config),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Command failed");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_backup_subcommands() {
        let cli = Cli::try_parse_from(["tidalcore", "backup", "list", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Backup {
                backup_command: BackupCommands::List { json: true }
            }
        ));
        assert_eq!(cli.config, PathBuf::from("tidalcore.toml"));

        let cli = Cli::try_parse_from([
            "tidalcore",
            "--config",
            "/etc/tidalcore.toml",
            "backup",
            "restore",
            "backup_20240101_120000.sql",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/tidalcore.toml"));
        match cli.command {
            Commands::Backup {
                backup_command: BackupCommands::Restore { filename },
            } => assert_eq!(filename, "backup_20240101_120000.sql"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_missing_artifact_name_is_rejected() {
        assert!(Cli::try_parse_from(["tidalcore", "backup", "delete"]).is_err());
    }
}
