//! Schema migrations for the SQLite store

use rusqlite::{Connection, params};
use tidalcore_core::{StoreError, StoreResult};
use tracing::debug;

use super::SqliteStore;

/// Migration engine for SQLite
pub struct MigrationEngine {
    migrations: Vec<Migration>,
}

/// Individual migration definition
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    pub description: String,
    pub up: String,
}

impl Default for MigrationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationEngine {
    pub fn new() -> Self {
        Self {
            migrations: Self::default_migrations(),
        }
    }

    fn default_migrations() -> Vec<Migration> {
        vec![
            Migration {
                version: 1,
                description: "Create users table".to_string(),
                up: r#"
                    CREATE TABLE IF NOT EXISTS users (
                        id INTEGER PRIMARY KEY,
                        username TEXT NOT NULL UNIQUE,
                        display_name TEXT NOT NULL,
                        password_hash TEXT NOT NULL,
                        is_admin INTEGER NOT NULL DEFAULT 0,
                        title TEXT NOT NULL DEFAULT '',
                        streak INTEGER NOT NULL DEFAULT 0,
                        max_streak INTEGER NOT NULL DEFAULT 0,
                        total_checkin INTEGER NOT NULL DEFAULT 0,
                        last_checkin TEXT,
                        created_at TEXT NOT NULL,
                        updated_at TEXT NOT NULL,
                        deleted_at TEXT
                    );

                    CREATE INDEX IF NOT EXISTS idx_users_deleted_at ON users(deleted_at);
                "#
                .to_string(),
            },
            Migration {
                version: 2,
                description: "Create checkins table".to_string(),
                up: r#"
                    CREATE TABLE IF NOT EXISTS checkins (
                        id INTEGER PRIMARY KEY,
                        user_id INTEGER NOT NULL,
                        duration INTEGER NOT NULL,
                        cycles INTEGER NOT NULL,
                        checked_at TEXT NOT NULL,
                        created_at TEXT NOT NULL,
                        FOREIGN KEY(user_id) REFERENCES users(id)
                    );

                    CREATE INDEX IF NOT EXISTS idx_checkins_user_id ON checkins(user_id);
                    CREATE INDEX IF NOT EXISTS idx_checkins_checked_at ON checkins(checked_at);
                "#
                .to_string(),
            },
            Migration {
                version: 3,
                description: "Create visits table".to_string(),
                up: r#"
                    CREATE TABLE IF NOT EXISTS visits (
                        id INTEGER PRIMARY KEY,
                        visitor_id TEXT NOT NULL,
                        user_agent TEXT NOT NULL DEFAULT '',
                        visited_date TEXT NOT NULL,
                        created_at TEXT NOT NULL
                    );

                    CREATE INDEX IF NOT EXISTS idx_visits_visitor_id ON visits(visitor_id);
                    CREATE INDEX IF NOT EXISTS idx_visits_visited_date ON visits(visited_date);
                "#
                .to_string(),
            },
        ]
    }

    /// Latest schema version this engine knows about
    pub fn latest_version(&self) -> u32 {
        self.migrations.iter().map(|m| m.version).max().unwrap_or(0)
    }

    /// Highest applied version, 0 for a fresh database
    pub fn current_version(&self, conn: &Connection) -> StoreResult<u32> {
        conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| migration_error("Failed to read schema version", &e))
    }

    /// Apply every pending migration
    pub fn migrate(&self, conn: &Connection) -> StoreResult<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            )",
            [],
        )
        .map_err(|e| migration_error("Failed to create migrations table", &e))?;

        let current = self.current_version(conn)?;
        for migration in &self.migrations {
            if migration.version > current {
                self.apply_migration(conn, migration)?;
            }
        }

        Ok(())
    }

    fn apply_migration(&self, conn: &Connection, migration: &Migration) -> StoreResult<()> {
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| migration_error("Failed to start migration transaction", &e))?;

        tx.execute_batch(&migration.up)
            .map_err(|e| migration_error(&format!("Migration {} failed", migration.version), &e))?;

        tx.execute(
            "INSERT INTO schema_migrations (version, description) VALUES (?1, ?2)",
            params![migration.version, migration.description],
        )
        .map_err(|e| {
            migration_error(
                &format!("Failed to record migration {}", migration.version),
                &e,
            )
        })?;

        tx.commit().map_err(|e| {
            migration_error(
                &format!("Failed to commit migration {}", migration.version),
                &e,
            )
        })?;

        debug!(
            version = migration.version,
            description = %migration.description,
            "Applied migration"
        );
        Ok(())
    }
}

fn migration_error(context: &str, e: &rusqlite::Error) -> StoreError {
    StoreError::Query(format!("{}: {}", context, SqliteStore::sanitize_error(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        let engine = MigrationEngine::new();

        engine.migrate(&conn).unwrap();
        engine.migrate(&conn).unwrap();

        assert_eq!(engine.current_version(&conn).unwrap(), 3);
        assert_eq!(engine.latest_version(), 3);

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master \
                 WHERE type = 'table' AND name IN ('users', 'checkins', 'visits')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }

    #[test]
    fn test_migration_failure_is_sanitized() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY);")
            .unwrap();

        let err = MigrationEngine::new().migrate(&conn).unwrap_err();
        match err {
            StoreError::Query(message) => {
                assert!(
                    message.starts_with("Migration 1 failed: Database error: "),
                    "unexpected message: {message}"
                );
                assert!(message.contains("deleted_at"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
