//! SQLite store
//!
//! One connection behind a mutex. `PRAGMA foreign_keys` is per connection, so
//! the integrity toggle, the clears and the replayed insertions of a restore
//! must all run on the same one.

pub mod dialect;
pub mod migration;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};
use tidalcore_core::model::TIMESTAMP_FORMAT;
use tidalcore_core::sanitization::DatabaseErrorSanitizer;
use tidalcore_core::{Account, Checkin, Store, StoreError, StoreResult, TableName, Visit};
use tracing::debug;

use self::dialect::{Translated, translate};
use self::migration::MigrationEngine;

/// Busy timeout applied to every connection, in milliseconds
const BUSY_TIMEOUT_MS: u32 = 5000;

/// SQLite implementation of [`Store`]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and bring its schema up to date
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = Self::validate_database_path(path.as_ref())?;
        let conn = Connection::open(&path)
            .map_err(|e| StoreError::Connection(Self::sanitize_error(&e)))?;
        Self::configure(&conn, true)?;
        MigrationEngine::new().migrate(&conn)?;

        debug!(path = ?path, "Opened SQLite store");
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path),
        })
    }

    /// Private in-memory database, mainly for tests
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Connection(Self::sanitize_error(&e)))?;
        Self::configure(&conn, false)?;
        MigrationEngine::new().migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Validate database path for security (prevent path traversal attacks)
    fn validate_database_path(path: &Path) -> StoreResult<PathBuf> {
        let canonical_path = path.canonicalize().unwrap_or_else(|_| {
            // The file may not exist yet; canonicalise its parent instead.
            match (path.parent(), path.file_name()) {
                (Some(parent), Some(name)) if parent.exists() => parent
                    .canonicalize()
                    .map(|p| p.join(name))
                    .unwrap_or_else(|_| path.to_path_buf()),
                _ => path.to_path_buf(),
            }
        });

        let path_str = canonical_path.to_string_lossy();
        if path_str.contains("..") || path_str.contains("//") {
            return Err(StoreError::Connection(
                "Invalid database path: path traversal detected".to_string(),
            ));
        }

        match canonical_path.extension().and_then(|ext| ext.to_str()) {
            Some("db" | "sqlite" | "sqlite3") => Ok(canonical_path),
            Some(_) => Err(StoreError::Connection(
                "Invalid database path: only .db, .sqlite, and .sqlite3 files allowed".to_string(),
            )),
            None => Err(StoreError::Connection(
                "Invalid database path: file extension required".to_string(),
            )),
        }
    }

    fn configure(conn: &Connection, wal_mode: bool) -> StoreResult<()> {
        let timeout_pragma = format!("PRAGMA busy_timeout = {};", BUSY_TIMEOUT_MS);

        let mut pragmas = Vec::new();
        if wal_mode {
            pragmas.push("PRAGMA journal_mode = WAL;");
        }
        pragmas.push("PRAGMA synchronous = NORMAL;");
        pragmas.push(&timeout_pragma);
        pragmas.push("PRAGMA foreign_keys = ON;");

        conn.execute_batch(&pragmas.join("\n")).map_err(|e| {
            StoreError::Connection(format!(
                "Failed to configure SQLite: {}",
                Self::sanitize_error(&e)
            ))
        })
    }

    /// Sanitize error messages to prevent information disclosure
    pub(crate) fn sanitize_error(error: &rusqlite::Error) -> String {
        match error {
            rusqlite::Error::QueryReturnedNoRows => "No rows returned".to_string(),
            rusqlite::Error::InvalidColumnIndex(_) => "Invalid column index".to_string(),
            rusqlite::Error::InvalidColumnName(_) => "Invalid column name".to_string(),
            rusqlite::Error::InvalidPath(_) => "Invalid database path".to_string(),
            rusqlite::Error::InvalidColumnType(_, _, _) => "Invalid column type".to_string(),
            rusqlite::Error::IntegralValueOutOfRange(_, _) => "Value out of range".to_string(),
            rusqlite::Error::FromSqlConversionFailure(_, _, _) => {
                "Stored value could not be decoded".to_string()
            }
            _ => DatabaseErrorSanitizer::sanitize(error),
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Connection("SQLite connection lock poisoned".to_string()))
    }

    fn query_error(e: rusqlite::Error) -> StoreError {
        debug!(category = DatabaseErrorSanitizer::categorize(&e), "SQLite statement failed");
        StoreError::Query(Self::sanitize_error(&e))
    }

    fn read_error(e: rusqlite::Error) -> StoreError {
        let undecodable = matches!(
            e,
            rusqlite::Error::FromSqlConversionFailure(..)
                | rusqlite::Error::IntegralValueOutOfRange(..)
                | rusqlite::Error::InvalidColumnType(..)
        );
        if undecodable {
            StoreError::InvalidData(Self::sanitize_error(&e))
        } else {
            Self::query_error(e)
        }
    }

    /// Insert an account row
    pub fn insert_account(&self, account: &Account) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (id, username, display_name, password_hash, is_admin, title,
                                streak, max_streak, total_checkin, last_checkin,
                                created_at, updated_at, deleted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                to_sql_id(account.id)?,
                account.username,
                account.display_name,
                account.password_hash,
                account.is_admin,
                account.title,
                account.streak,
                account.max_streak,
                account.total_checkin,
                account.last_checkin.map(format_timestamp),
                format_timestamp(account.created_at),
                format_timestamp(account.updated_at),
                account.deleted_at.map(format_timestamp),
            ],
        )
        .map_err(Self::query_error)?;
        Ok(())
    }

    /// Insert a check-in row; the referenced account must exist
    pub fn insert_checkin(&self, checkin: &Checkin) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO checkins (id, user_id, duration, cycles, checked_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                to_sql_id(checkin.id)?,
                to_sql_id(checkin.user_id)?,
                checkin.duration,
                checkin.cycles,
                format_timestamp(checkin.checked_at),
                format_timestamp(checkin.created_at),
            ],
        )
        .map_err(Self::query_error)?;
        Ok(())
    }

    /// Insert a visit row
    pub fn insert_visit(&self, visit: &Visit) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO visits (id, visitor_id, user_agent, visited_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                to_sql_id(visit.id)?,
                visit.visitor_id,
                visit.user_agent,
                visit.visited_date,
                format_timestamp(visit.created_at),
            ],
        )
        .map_err(Self::query_error)?;
        Ok(())
    }

    /// Mark an account as deleted without removing its row
    ///
    /// Returns `false` if no live account has this id.
    pub fn soft_delete_account(&self, id: u64, at: NaiveDateTime) -> StoreResult<bool> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE users SET deleted_at = ?1, updated_at = ?1
                 WHERE id = ?2 AND deleted_at IS NULL",
                params![format_timestamp(at), to_sql_id(id)?],
            )
            .map_err(Self::query_error)?;
        Ok(changed == 1)
    }

    /// Number of rows in `table`
    pub fn count(&self, table: TableName) -> StoreResult<u64> {
        let conn = self.lock()?;
        let sql = format!("SELECT COUNT(*) FROM \"{}\"", table.as_str());
        let count: i64 = conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(Self::query_error)?;
        Ok(count.max(0) as u64)
    }
}

impl Store for SqliteStore {
    fn read_accounts(&self) -> StoreResult<Vec<Account>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, username, display_name, password_hash, is_admin, title,
                        streak, max_streak, total_checkin, last_checkin,
                        created_at, updated_at, deleted_at
                 FROM users ORDER BY id",
            )
            .map_err(Self::query_error)?;

        let rows = stmt
            .query_map([], |row| {
                Ok(Account {
                    id: get_id(row, 0)?,
                    username: row.get(1)?,
                    display_name: row.get(2)?,
                    password_hash: row.get(3)?,
                    is_admin: row.get(4)?,
                    title: row.get(5)?,
                    streak: row.get(6)?,
                    max_streak: row.get(7)?,
                    total_checkin: row.get(8)?,
                    last_checkin: get_optional_timestamp(row, 9)?,
                    created_at: get_timestamp(row, 10)?,
                    updated_at: get_timestamp(row, 11)?,
                    deleted_at: get_optional_timestamp(row, 12)?,
                })
            })
            .map_err(Self::query_error)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Self::read_error)
    }

    fn read_checkins(&self) -> StoreResult<Vec<Checkin>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, duration, cycles, checked_at, created_at
                 FROM checkins ORDER BY id",
            )
            .map_err(Self::query_error)?;

        let rows = stmt
            .query_map([], |row| {
                Ok(Checkin {
                    id: get_id(row, 0)?,
                    user_id: get_id(row, 1)?,
                    duration: row.get(2)?,
                    cycles: row.get(3)?,
                    checked_at: get_timestamp(row, 4)?,
                    created_at: get_timestamp(row, 5)?,
                })
            })
            .map_err(Self::query_error)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Self::read_error)
    }

    fn read_visits(&self) -> StoreResult<Vec<Visit>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, visitor_id, user_agent, visited_date, created_at
                 FROM visits ORDER BY id",
            )
            .map_err(Self::query_error)?;

        let rows = stmt
            .query_map([], |row| {
                Ok(Visit {
                    id: get_id(row, 0)?,
                    visitor_id: row.get(1)?,
                    user_agent: row.get(2)?,
                    visited_date: row.get(3)?,
                    created_at: get_timestamp(row, 4)?,
                })
            })
            .map_err(Self::query_error)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Self::read_error)
    }

    fn clear_table(&self, table: TableName) -> StoreResult<()> {
        let conn = self.lock()?;
        let sql = format!("DELETE FROM \"{}\"", table.as_str());
        let removed = conn.execute(&sql, []).map_err(Self::query_error)?;
        debug!(table = %table, rows = removed, "Cleared SQLite table");
        Ok(())
    }

    fn execute(&self, statement: &str) -> StoreResult<usize> {
        let translated = translate(statement)?;
        let conn = self.lock()?;

        match translated {
            Translated::ForeignKeys(enabled) => {
                conn.pragma_update(None, "foreign_keys", enabled)
                    .map_err(Self::query_error)?;
                Ok(0)
            }
            Translated::Sql(sql) => conn.execute(&sql, []).map_err(Self::query_error),
        }
    }
}

fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn to_sql_id(id: u64) -> StoreResult<i64> {
    i64::try_from(id).map_err(|_| StoreError::InvalidData(format!("id {} out of range", id)))
}

fn get_id(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let raw: i64 = row.get(idx)?;
    u64::try_from(raw).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, raw))
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn get_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    parse_timestamp(idx, &raw)
}

fn get_optional_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| parse_timestamp(idx, &raw)).transpose()
}
