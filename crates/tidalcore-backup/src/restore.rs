//! Restore orchestration
//!
//! Phases: `Idle → ValidatingSource → IntegrityDisabled → Clearing →
//! Replaying → IntegrityRestored`. Once integrity checks are suspended an
//! [`IntegrityGuard`] is alive, and its `Drop` re-enables them on every exit
//! path, including early returns and unwinding.
//!
//! Nothing is rolled back. A failure while clearing or replaying leaves the
//! store partially restored and is reported as such.

use serde::Serialize;
use tidalcore_core::{BackupError, BackupResult, PRODUCT_MARKER, Store, TABLES};
use tracing::{debug, error, info, warn};

use crate::composer::{INTEGRITY_OFF, INTEGRITY_ON};
use crate::splitter::split_statements;

const INSERT_KEYWORDS: &[&str] = &["INSERT", "REPLACE"];
const DEFINITION_KEYWORDS: &[&str] = &["SET", "CREATE", "ALTER", "DROP", "LOCK", "UNLOCK"];
const CLEAR_KEYWORDS: &[&str] = &["DELETE", "TRUNCATE"];

/// Where a dump came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpSource {
    /// A stored artifact created by this engine
    Managed,
    /// Text supplied by a caller; must carry the product marker
    Uploaded,
}

/// Progress of a restore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestorePhase {
    Idle,
    ValidatingSource,
    IntegrityDisabled,
    Clearing,
    Replaying,
    IntegrityRestored,
}

/// How a statement is treated during replay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Whitespace only
    Empty,
    /// Nothing but `--` comment lines
    CommentOnly,
    /// Executed against the store
    Insertion,
    /// Integrity toggle or schema statement, handled by the orchestrator itself
    Definition,
    /// Table clear, already performed in dependency order
    Clear,
    /// Unrecognised leading keyword
    Other,
}

/// Counts of replayed and skipped statements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub executed: usize,
    pub skipped: usize,
}

/// Classify a statement by its leading keyword.
///
/// Leading `--` comment lines and surrounding whitespace are removed first;
/// the returned slice is the statement body that would be executed. Keywords
/// match case-insensitively and as whole words.
///
/// # Examples
///
/// ```rust
/// use tidalcore_backup::restore::{classify, StatementKind};
///
/// let (kind, body) = classify("\n-- Table: users\nDELETE FROM `users`");
/// assert_eq!(kind, StatementKind::Clear);
/// assert_eq!(body, "DELETE FROM `users`");
/// ```
pub fn classify(statement: &str) -> (StatementKind, &str) {
    let body = strip_leading_comments(statement);
    if body.is_empty() {
        let kind = if statement.trim().is_empty() {
            StatementKind::Empty
        } else {
            StatementKind::CommentOnly
        };
        return (kind, body);
    }

    let keyword_end = body
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(body.len());
    let keyword = &body[..keyword_end];
    let is_one_of = |list: &[&str]| list.iter().any(|k| keyword.eq_ignore_ascii_case(k));

    let kind = if is_one_of(INSERT_KEYWORDS) {
        StatementKind::Insertion
    } else if is_one_of(DEFINITION_KEYWORDS) {
        StatementKind::Definition
    } else if is_one_of(CLEAR_KEYWORDS) {
        StatementKind::Clear
    } else {
        StatementKind::Other
    };

    (kind, body)
}

fn strip_leading_comments(statement: &str) -> &str {
    let mut rest = statement.trim_start();
    while rest.starts_with("--") {
        match rest.find('\n') {
            Some(newline) => rest = rest[newline + 1..].trim_start(),
            None => return "",
        }
    }
    rest.trim_end()
}

/// Keeps referential-integrity checks suspended while alive
///
/// Dropping the guard issues the re-enable toggle. A failure there cannot be
/// propagated and is logged instead.
pub struct IntegrityGuard<'a> {
    store: &'a dyn Store,
}

impl<'a> IntegrityGuard<'a> {
    /// Suspend checks, failing with [`BackupError::EngineError`] if the store refuses
    pub fn suspend(store: &'a dyn Store) -> BackupResult<Self> {
        store
            .execute(INTEGRITY_OFF)
            .map_err(|source| BackupError::EngineError { source })?;
        debug!("Foreign key checks suspended");
        Ok(Self { store })
    }
}

impl Drop for IntegrityGuard<'_> {
    fn drop(&mut self) {
        match self.store.execute(INTEGRITY_ON) {
            Ok(_) => debug!("Foreign key checks re-enabled"),
            Err(e) => warn!(error = %e, "Failed to re-enable foreign key checks"),
        }
    }
}

/// Replaces the contents of the backed-up tables with those of a dump
pub struct Restorer<'a> {
    store: &'a dyn Store,
    phase: RestorePhase,
}

impl<'a> Restorer<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self {
            store,
            phase: RestorePhase::Idle,
        }
    }

    pub fn phase(&self) -> RestorePhase {
        self.phase
    }

    /// Validate, clear and replay `dump` against the store
    pub fn run(&mut self, dump: &str, source: DumpSource) -> BackupResult<RestoreReport> {
        let result = self.replace_contents(dump, source);

        // The guard has been dropped by now if it was ever created.
        let suspended = !matches!(
            self.phase,
            RestorePhase::Idle | RestorePhase::ValidatingSource
        );
        let failed_in = self.phase;
        if suspended {
            self.phase = RestorePhase::IntegrityRestored;
        }

        match &result {
            Ok(report) => info!(
                executed = report.executed,
                skipped = report.skipped,
                "Restore completed"
            ),
            Err(e) if e.requires_manual_intervention() => error!(
                phase = ?failed_in,
                error = %e,
                "Restore failed, store is partially restored"
            ),
            Err(e) => error!(phase = ?failed_in, error = %e, "Restore failed"),
        }

        result
    }

    fn replace_contents(&mut self, dump: &str, source: DumpSource) -> BackupResult<RestoreReport> {
        self.phase = RestorePhase::ValidatingSource;
        if source == DumpSource::Uploaded && !dump.contains(PRODUCT_MARKER) {
            return Err(BackupError::InvalidFormat {
                marker: PRODUCT_MARKER,
            });
        }

        let _guard = IntegrityGuard::suspend(self.store)?;
        self.phase = RestorePhase::IntegrityDisabled;

        self.phase = RestorePhase::Clearing;
        for spec in TABLES.iter().rev() {
            self.store
                .clear_table(spec.table)
                .map_err(|source| BackupError::ClearFailed {
                    table: spec.table,
                    source,
                })?;
            debug!(table = %spec.table, "Cleared table");
        }

        self.phase = RestorePhase::Replaying;
        self.replay(dump)
    }

    fn replay(&self, dump: &str) -> BackupResult<RestoreReport> {
        let mut report = RestoreReport::default();

        for (index, statement) in split_statements(dump).enumerate() {
            let position = index + 1;
            let (kind, body) = classify(statement);

            match kind {
                StatementKind::Empty | StatementKind::CommentOnly => {}
                StatementKind::Definition | StatementKind::Clear => report.skipped += 1,
                StatementKind::Other => {
                    debug!(
                        position,
                        statement = %BackupError::statement_preview(body),
                        "Skipping unrecognised statement"
                    );
                    report.skipped += 1;
                }
                StatementKind::Insertion => {
                    self.store
                        .execute(body)
                        .map_err(|source| BackupError::InsertFailed {
                            position,
                            preview: BackupError::statement_preview(body),
                            source,
                        })?;
                    report.executed += 1;
                }
            }
        }

        Ok(report)
    }
}

/// Restore `dump` into `store`
pub fn restore(store: &dyn Store, dump: &str, source: DumpSource) -> BackupResult<RestoreReport> {
    Restorer::new(store).run(dump, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::cell::RefCell;
    use tidalcore_core::{Account, Checkin, StoreError, StoreResult, TableName, Visit};

    #[derive(Default)]
    struct LogStore {
        calls: RefCell<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl LogStore {
        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl Store for LogStore {
        fn read_accounts(&self) -> StoreResult<Vec<Account>> {
            Ok(Vec::new())
        }
        fn read_checkins(&self) -> StoreResult<Vec<Checkin>> {
            Ok(Vec::new())
        }
        fn read_visits(&self) -> StoreResult<Vec<Visit>> {
            Ok(Vec::new())
        }
        fn clear_table(&self, table: TableName) -> StoreResult<()> {
            self.calls.borrow_mut().push(format!("clear {}", table));
            Ok(())
        }
        fn execute(&self, statement: &str) -> StoreResult<usize> {
            self.calls.borrow_mut().push(statement.to_string());
            match self.fail_on {
                Some(needle) if statement.contains(needle) => {
                    Err(StoreError::Query("rejected".to_string()))
                }
                _ => Ok(1),
            }
        }
    }

    #[rstest]
    #[case("INSERT INTO `users` VALUES (1)", StatementKind::Insertion)]
    #[case("  insert into t values (1)  ", StatementKind::Insertion)]
    #[case("REPLACE INTO t VALUES (1)", StatementKind::Insertion)]
    #[case("SET FOREIGN_KEY_CHECKS = 0", StatementKind::Definition)]
    #[case("DROP TABLE users", StatementKind::Definition)]
    #[case("DELETE FROM `users`", StatementKind::Clear)]
    #[case("truncate table visits", StatementKind::Clear)]
    #[case("SELECT 1", StatementKind::Other)]
    #[case("INSERTED_ROWS = 3", StatementKind::Other)]
    #[case("SETTINGS", StatementKind::Other)]
    #[case("   \n\t", StatementKind::Empty)]
    #[case("-- only a comment", StatementKind::CommentOnly)]
    #[case("-- Table: users\n-- again\n", StatementKind::CommentOnly)]
    fn test_classify(#[case] statement: &str, #[case] expected: StatementKind) {
        assert_eq!(classify(statement).0, expected);
    }

    #[test]
    fn test_classify_strips_comment_prefix() {
        let (kind, body) = classify("\n\n-- Table: visits\nINSERT INTO `visits` VALUES (1)\n");
        assert_eq!(kind, StatementKind::Insertion);
        assert_eq!(body, "INSERT INTO `visits` VALUES (1)");
    }

    #[test]
    fn test_only_insertions_are_executed() {
        let store = LogStore::default();
        let dump = "-- TidalCore Database Backup\n\nSET FOREIGN_KEY_CHECKS = 0;\n\
                    -- Table: users\nDELETE FROM `users`;\n\
                    INSERT INTO `users` (`id`) VALUES\n(1);\n\nSET FOREIGN_KEY_CHECKS = 1;\n";

        let report = restore(&store, dump, DumpSource::Uploaded).unwrap();
        assert_eq!(report, RestoreReport { executed: 1, skipped: 3 });
        assert_eq!(
            store.calls(),
            vec![
                INTEGRITY_OFF.to_string(),
                "clear visits".to_string(),
                "clear checkins".to_string(),
                "clear users".to_string(),
                "INSERT INTO `users` (`id`) VALUES\n(1)".to_string(),
                INTEGRITY_ON.to_string(),
            ]
        );
    }

    #[test]
    fn test_insert_failure_reports_position_and_reenables() {
        let store = LogStore {
            fail_on: Some("(2)"),
            ..Default::default()
        };
        let dump = "INSERT INTO t VALUES (1);\n;INSERT INTO t VALUES (2);INSERT INTO t VALUES (3);";

        let mut restorer = Restorer::new(&store);
        let err = restorer.run(dump, DumpSource::Managed).unwrap_err();

        match err {
            BackupError::InsertFailed {
                position, preview, ..
            } => {
                assert_eq!(position, 3);
                assert_eq!(preview, "INSERT INTO t VALUES (2)");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(restorer.phase(), RestorePhase::IntegrityRestored);
        let calls = store.calls();
        assert_eq!(calls.last().map(String::as_str), Some(INTEGRITY_ON));
        assert!(!calls.iter().any(|c| c.contains("(3)")));
    }

    #[test]
    fn test_suspend_failure_is_engine_error() {
        let store = LogStore {
            fail_on: Some("FOREIGN_KEY_CHECKS = 0"),
            ..Default::default()
        };

        let mut restorer = Restorer::new(&store);
        let err = restorer
            .run("INSERT INTO t VALUES (1);", DumpSource::Managed)
            .unwrap_err();

        assert!(matches!(err, BackupError::EngineError { .. }));
        assert_eq!(restorer.phase(), RestorePhase::ValidatingSource);
        assert_eq!(store.calls(), vec![INTEGRITY_OFF.to_string()]);
    }

    #[test]
    fn test_managed_dump_needs_no_marker() {
        let store = LogStore::default();
        let report = restore(&store, "INSERT INTO t VALUES (1);", DumpSource::Managed).unwrap();
        assert_eq!(report.executed, 1);
    }

    #[test]
    fn test_guard_reenables_on_drop() {
        let store = LogStore::default();
        {
            let _guard = IntegrityGuard::suspend(&store).unwrap();
        }
        assert_eq!(
            store.calls(),
            vec![INTEGRITY_OFF.to_string(), INTEGRITY_ON.to_string()]
        );
    }

    #[test]
    fn test_report_serializes_counts() {
        let store = LogStore::default();
        let report = restore(
            &store,
            "DELETE FROM `users`;\nINSERT INTO `users` VALUES (1);\nSELECT 1;",
            DumpSource::Managed,
        )
        .unwrap();

        let json = serde_json::to_value(report).unwrap();
        assert_eq!(json, serde_json::json!({ "executed": 1, "skipped": 2 }));
    }
}
