//! Dump composition
//!
//! A dump is a header comment block carrying [`PRODUCT_MARKER`], the
//! integrity toggle that disables checks, one block per table in
//! [`TABLES`] order, and the toggle that re-enables checks.

use chrono::{Local, NaiveDateTime};
use tidalcore_core::model::TIMESTAMP_FORMAT;
use tidalcore_core::{BackupResult, PRODUCT_MARKER, Store, TABLES};
use tracing::debug;

use crate::serializer::export_table;

/// Statement that suspends referential-integrity enforcement
pub const INTEGRITY_OFF: &str = "SET FOREIGN_KEY_CHECKS = 0";

/// Statement that restores referential-integrity enforcement
pub const INTEGRITY_ON: &str = "SET FOREIGN_KEY_CHECKS = 1";

/// A fully composed dump, never mutated after composition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpDocument {
    text: String,
    generated_at: NaiveDateTime,
}

impl DumpDocument {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// Local time written into the header
    pub fn generated_at(&self) -> NaiveDateTime {
        self.generated_at
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Whether `text` carries the product marker required for uploaded dumps
pub fn has_marker(text: &str) -> bool {
    text.contains(PRODUCT_MARKER)
}

/// Compose a dump of every backed-up table, stamped with the current local time
pub fn compose_dump(store: &dyn Store) -> BackupResult<DumpDocument> {
    compose_dump_at(store, Local::now().naive_local())
}

/// Compose a dump stamped with `generated_at`
///
/// The first table read failure aborts composition and is returned as is.
pub fn compose_dump_at(
    store: &dyn Store,
    generated_at: NaiveDateTime,
) -> BackupResult<DumpDocument> {
    let mut text = String::new();

    text.push_str(&format!("-- {}\n", PRODUCT_MARKER));
    text.push_str(&format!(
        "-- Generated at: {}\n",
        generated_at.format(TIMESTAMP_FORMAT)
    ));
    text.push_str("-- This file can be used to restore the database\n\n");
    text.push_str(&format!("{};\n\n", INTEGRITY_OFF));

    for spec in TABLES.iter() {
        text.push_str(&export_table(store, spec)?);
    }

    text.push_str(&format!("{};\n", INTEGRITY_ON));

    debug!(bytes = text.len(), "Composed dump");
    Ok(DumpDocument { text, generated_at })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tidalcore_core::{Account, BackupError, Checkin, StoreError, StoreResult, TableName, Visit};

    struct FixedStore {
        fail_visits: bool,
    }

    impl Store for FixedStore {
        fn read_accounts(&self) -> StoreResult<Vec<Account>> {
            let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(3, 4, 5)
                .unwrap();
            Ok(vec![Account {
                id: 1,
                username: "alice".to_string(),
                display_name: "Alice".to_string(),
                password_hash: "$2a$10$abc".to_string(),
                is_admin: false,
                title: String::new(),
                streak: 0,
                max_streak: 0,
                total_checkin: 0,
                last_checkin: None,
                created_at: ts,
                updated_at: ts,
                deleted_at: None,
            }])
        }
        fn read_checkins(&self) -> StoreResult<Vec<Checkin>> {
            Ok(Vec::new())
        }
        fn read_visits(&self) -> StoreResult<Vec<Visit>> {
            if self.fail_visits {
                Err(StoreError::Connection("gone".to_string()))
            } else {
                Ok(Vec::new())
            }
        }
        fn clear_table(&self, _table: TableName) -> StoreResult<()> {
            Ok(())
        }
        fn execute(&self, _statement: &str) -> StoreResult<usize> {
            Ok(0)
        }
    }

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 30)
            .unwrap()
            .and_hms_opt(23, 59, 1)
            .unwrap()
    }

    #[test]
    fn test_header_and_toggles() {
        let doc = compose_dump_at(&FixedStore { fail_visits: false }, at()).unwrap();
        let text = doc.as_str();

        assert!(text.starts_with(
            "-- TidalCore Database Backup\n\
             -- Generated at: 2024-06-30 23:59:01\n\
             -- This file can be used to restore the database\n\
             \n\
             SET FOREIGN_KEY_CHECKS = 0;\n"
        ));
        assert!(text.ends_with("SET FOREIGN_KEY_CHECKS = 1;\n"));
        assert!(has_marker(text));
        assert_eq!(doc.generated_at(), at());
    }

    #[test]
    fn test_tables_in_fixed_order() {
        let doc = compose_dump_at(&FixedStore { fail_visits: false }, at()).unwrap();
        let text = doc.as_str();

        let users = text.find("-- Table: users").unwrap();
        let checkins = text.find("-- Table: checkins").unwrap();
        let visits = text.find("-- Table: visits").unwrap();
        assert!(users < checkins && checkins < visits);
        assert!(text.contains("INSERT INTO `users`"));
        assert!(!text.contains("INSERT INTO `checkins`"));
    }

    #[test]
    fn test_read_failure_aborts() {
        let err = compose_dump_at(&FixedStore { fail_visits: true }, at()).unwrap_err();
        assert!(matches!(
            err,
            BackupError::ReadFailure {
                table: TableName::Visits,
                ..
            }
        ));
    }
}
