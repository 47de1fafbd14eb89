//! Artifact naming, retention and storage
//!
//! [`ArtifactStore`] is the only writer and deleter of the backup directory.
//! Every name that reaches the file system from outside goes through
//! [`validate_name`] first, so no caller-supplied string is ever joined onto
//! the directory unchecked.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};
use serde::Serialize;
use tempfile::NamedTempFile;
use tidalcore_core::{BackupError, BackupResult, BackupSettings, NameRejection};
use tracing::{debug, info, warn};

/// Prefix of every artifact file name
pub const BACKUP_PREFIX: &str = "backup_";

/// Suffix of every artifact file name
pub const BACKUP_SUFFIX: &str = ".sql";

/// Timestamp layout between prefix and suffix, second precision
pub const NAME_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A stored artifact as reported to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupInfo {
    pub filename: String,
    /// Size in bytes
    pub size: u64,
    /// Modification time reported by the file system
    pub created_at: DateTime<Local>,
}

/// Check that `name` is exactly `backup_YYYYMMDD_HHMMSS.sql`
///
/// Runs before any file-system access. Returns the timestamp encoded in the
/// name.
///
/// # Examples
///
/// ```rust
/// use tidalcore_backup::retention::validate_name;
///
/// assert!(validate_name("backup_20240102_030405.sql").is_ok());
/// assert!(validate_name("../../etc/passwd").is_err());
/// ```
pub fn validate_name(name: &str) -> BackupResult<NaiveDateTime> {
    let reject = |reason| BackupError::InvalidName {
        name: name.to_string(),
        reason,
    };

    let Some(stamp) = name
        .strip_prefix(BACKUP_PREFIX)
        .and_then(|rest| rest.strip_suffix(BACKUP_SUFFIX))
    else {
        return Err(reject(NameRejection::PatternMismatch));
    };

    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(reject(NameRejection::PathTraversal));
    }

    // chrono accepts signs and wider years for %Y, so pin the shape first.
    let shape_ok = stamp.len() == 15
        && stamp.bytes().enumerate().all(|(i, b)| {
            if i == 8 {
                b == b'_'
            } else {
                b.is_ascii_digit()
            }
        });
    if !shape_ok {
        return Err(reject(NameRejection::InvalidTimestamp));
    }

    NaiveDateTime::parse_from_str(stamp, NAME_TIME_FORMAT)
        .map_err(|_| reject(NameRejection::InvalidTimestamp))
}

/// Manages the backup directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    directory: PathBuf,
    max_backups: usize,
}

impl ArtifactStore {
    pub fn new(directory: impl Into<PathBuf>, max_backups: usize) -> Self {
        Self {
            directory: directory.into(),
            max_backups,
        }
    }

    pub fn from_settings(settings: &BackupSettings) -> Self {
        Self::new(settings.directory.clone(), settings.max_backups)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn max_backups(&self) -> usize {
        self.max_backups
    }

    /// Name for an artifact created now
    pub fn create_name() -> String {
        Self::create_name_at(Local::now().naive_local())
    }

    /// Name for an artifact created at `at`
    ///
    /// Two artifacts created within the same second get the same name.
    pub fn create_name_at(at: NaiveDateTime) -> String {
        format!(
            "{}{}{}",
            BACKUP_PREFIX,
            at.format(NAME_TIME_FORMAT),
            BACKUP_SUFFIX
        )
    }

    /// Create the backup directory if needed
    pub fn ensure_dir(&self) -> BackupResult<()> {
        fs::create_dir_all(&self.directory).map_err(|source| self.storage_error(source))
    }

    /// Fail with [`BackupError::RetentionExceeded`] if the cap is reached
    ///
    /// Returns the current artifact count otherwise. Nothing is evicted.
    pub fn enforce_retention(&self) -> BackupResult<usize> {
        let count = self.list()?.len();
        if count >= self.max_backups {
            warn!(count, limit = self.max_backups, "Backup retention cap reached");
            return Err(BackupError::RetentionExceeded {
                limit: self.max_backups,
            });
        }
        Ok(count)
    }

    /// Stored artifacts, most recent first
    ///
    /// Entries that do not match the artifact pattern, are not regular files,
    /// or cannot be stat'ed are skipped.
    pub fn list(&self) -> BackupResult<Vec<BackupInfo>> {
        self.ensure_dir()?;

        let entries = fs::read_dir(&self.directory).map_err(|source| self.storage_error(source))?;

        let mut backups = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Failed to read backup directory entry");
                    continue;
                }
            };

            let Some(filename) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if validate_name(&filename).is_err() {
                continue;
            }

            // DirEntry::metadata does not follow symlinks.
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(filename = %filename, error = %e, "Failed to stat backup file");
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            let modified = match metadata.modified() {
                Ok(modified) => modified,
                Err(e) => {
                    warn!(filename = %filename, error = %e, "Failed to read backup file time");
                    continue;
                }
            };

            backups.push(BackupInfo {
                filename,
                size: metadata.len(),
                created_at: DateTime::<Local>::from(modified),
            });
        }

        backups.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.filename.cmp(&a.filename))
        });

        Ok(backups)
    }

    /// Resolve a caller-supplied name to the path of an existing artifact
    pub fn resolve_path(&self, name: &str) -> BackupResult<PathBuf> {
        validate_name(name)?;

        let path = self.directory.join(name);
        match fs::symlink_metadata(&path) {
            Ok(metadata) if metadata.is_file() => Ok(path),
            Ok(_) => Err(BackupError::NotFound {
                name: name.to_string(),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(BackupError::NotFound {
                name: name.to_string(),
            }),
            Err(source) => Err(BackupError::Storage { path, source }),
        }
    }

    /// Read an artifact as UTF-8 text
    pub fn read(&self, name: &str) -> BackupResult<String> {
        let path = self.resolve_path(name)?;
        fs::read_to_string(&path).map_err(|source| BackupError::Storage { path, source })
    }

    /// Write `contents` as artifact `name`
    ///
    /// The bytes go to a temporary file in the backup directory that is then
    /// linked into place without replacing an existing artifact. On failure
    /// the temporary file is removed and no artifact appears.
    pub fn persist(&self, name: &str, contents: &[u8]) -> BackupResult<BackupInfo> {
        validate_name(name)?;
        self.ensure_dir()?;

        let path = self.directory.join(name);
        let write_failure = |source: io::Error| BackupError::WriteFailure {
            path: path.clone(),
            source,
        };

        let mut file = NamedTempFile::new_in(&self.directory).map_err(write_failure)?;
        file.write_all(contents).map_err(write_failure)?;
        file.as_file().sync_all().map_err(write_failure)?;
        let file = file
            .persist_noclobber(&path)
            .map_err(|e| write_failure(e.error))?;

        let metadata = file.metadata().map_err(write_failure)?;
        let created_at = metadata
            .modified()
            .map(DateTime::<Local>::from)
            .unwrap_or_else(|_| Local::now());

        debug!(filename = %name, bytes = contents.len(), "Persisted backup file");
        Ok(BackupInfo {
            filename: name.to_string(),
            size: metadata.len(),
            created_at,
        })
    }

    /// Remove an artifact permanently
    pub fn delete(&self, name: &str) -> BackupResult<()> {
        let path = self.resolve_path(name)?;
        fs::remove_file(&path).map_err(|source| BackupError::Storage { path, source })?;
        info!(filename = %name, "Backup deleted");
        Ok(())
    }

    fn storage_error(&self, source: io::Error) -> BackupError {
        BackupError::Storage {
            path: self.directory.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn at(day: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(12, 0, second)
            .unwrap()
    }

    fn store(max: usize) -> (TempDir, ArtifactStore) {
        let dir = TempDir::new().unwrap();
        let artifacts = ArtifactStore::new(dir.path().join("backups"), max);
        (dir, artifacts)
    }

    #[test]
    fn test_create_name_pattern() {
        assert_eq!(
            ArtifactStore::create_name_at(at(2, 7)),
            "backup_20240102_120007.sql"
        );
        assert!(validate_name(&ArtifactStore::create_name()).is_ok());
    }

    #[rstest]
    #[case("../../etc/passwd", NameRejection::PatternMismatch)]
    #[case("backup_1/../x.sql", NameRejection::PathTraversal)]
    #[case("backup_..\\20240101_000000.sql", NameRejection::PathTraversal)]
    #[case("backup_x.sql", NameRejection::InvalidTimestamp)]
    #[case("backup_20240101_000000.txt", NameRejection::PatternMismatch)]
    #[case("backup_20241301_000000.sql", NameRejection::InvalidTimestamp)]
    #[case("backup_+2024101_000000.sql", NameRejection::InvalidTimestamp)]
    #[case("notes.sql", NameRejection::PatternMismatch)]
    fn test_validate_name_rejects(#[case] name: &str, #[case] expected: NameRejection) {
        match validate_name(name) {
            Err(BackupError::InvalidName { reason, .. }) => assert_eq!(reason, expected),
            other => panic!("expected rejection for {name}, got {other:?}"),
        }
    }

    #[test]
    fn test_persist_read_and_delete() {
        let (_dir, artifacts) = store(10);
        let name = ArtifactStore::create_name_at(at(1, 0));

        let info = artifacts.persist(&name, b"-- dump\n").unwrap();
        assert_eq!(info.filename, name);
        assert_eq!(info.size, 8);
        assert_eq!(artifacts.read(&name).unwrap(), "-- dump\n");

        artifacts.delete(&name).unwrap();
        assert!(matches!(
            artifacts.resolve_path(&name),
            Err(BackupError::NotFound { .. })
        ));
    }

    #[test]
    fn test_persist_does_not_clobber() {
        let (_dir, artifacts) = store(10);
        let name = ArtifactStore::create_name_at(at(1, 0));

        artifacts.persist(&name, b"first").unwrap();
        let err = artifacts.persist(&name, b"second").unwrap_err();

        assert!(matches!(err, BackupError::WriteFailure { .. }));
        assert_eq!(artifacts.read(&name).unwrap(), "first");
        // The temporary file was cleaned up.
        assert_eq!(fs::read_dir(artifacts.directory()).unwrap().count(), 1);
    }

    #[test]
    fn test_list_filters_and_sorts() {
        let (_dir, artifacts) = store(10);
        artifacts.ensure_dir().unwrap();
        let dir = artifacts.directory();

        for second in [1, 3, 2] {
            let path = dir.join(ArtifactStore::create_name_at(at(5, second)));
            fs::write(&path, "x").unwrap();
            let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + second as u64);
            fs::File::options()
                .write(true)
                .open(&path)
                .unwrap()
                .set_modified(mtime)
                .unwrap();
        }
        fs::write(dir.join("notes.txt"), "foreign").unwrap();
        fs::write(dir.join("backup_latest.sql"), "foreign").unwrap();
        fs::create_dir(dir.join("backup_20240101_000000.sql")).unwrap();

        let names: Vec<String> = artifacts
            .list()
            .unwrap()
            .into_iter()
            .map(|info| info.filename)
            .collect();

        assert_eq!(
            names,
            vec![
                "backup_20240105_120003.sql",
                "backup_20240105_120002.sql",
                "backup_20240105_120001.sql",
            ]
        );
    }

    #[test]
    fn test_list_creates_missing_directory() {
        let (_dir, artifacts) = store(10);
        assert!(!artifacts.directory().exists());
        assert!(artifacts.list().unwrap().is_empty());
        assert!(artifacts.directory().is_dir());
    }

    #[test]
    fn test_enforce_retention() {
        let (_dir, artifacts) = store(2);
        assert_eq!(artifacts.enforce_retention().unwrap(), 0);

        artifacts
            .persist(&ArtifactStore::create_name_at(at(1, 0)), b"a")
            .unwrap();
        artifacts
            .persist(&ArtifactStore::create_name_at(at(1, 1)), b"b")
            .unwrap();

        assert!(matches!(
            artifacts.enforce_retention(),
            Err(BackupError::RetentionExceeded { limit: 2 })
        ));
    }

    #[test]
    fn test_resolve_rejects_directory_with_artifact_name() {
        let (_dir, artifacts) = store(10);
        artifacts.ensure_dir().unwrap();
        let name = ArtifactStore::create_name_at(at(3, 0));
        fs::create_dir(artifacts.directory().join(&name)).unwrap();

        assert!(matches!(
            artifacts.resolve_path(&name),
            Err(BackupError::NotFound { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_refuses_symlink() {
        let (dir, artifacts) = store(10);
        artifacts.ensure_dir().unwrap();
        let target = dir.path().join("secret.txt");
        fs::write(&target, "secret").unwrap();
        let name = ArtifactStore::create_name_at(at(4, 0));
        std::os::unix::fs::symlink(&target, artifacts.directory().join(&name)).unwrap();

        assert!(matches!(
            artifacts.resolve_path(&name),
            Err(BackupError::NotFound { .. })
        ));
        assert!(artifacts.list().unwrap().is_empty());
    }
}
