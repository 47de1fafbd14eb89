//! Records of the backed-up tables
//!
//! The engine treats these as opaque rows: a stable identifier plus a fixed,
//! ordered set of scalar fields. Each record knows how to lay itself out as a
//! row of [`SqlValue`]s in the column order of its table.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Locale-independent timestamp layout used in dumps and by the SQLite store
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Identity of a table covered by backups
///
/// This closed set is the only way a table name reaches SQL text, so no
/// caller-supplied string is ever interpolated as an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    /// User accounts (parent of check-ins)
    Users,
    /// Check-in activity records, referencing `users.id`
    Checkins,
    /// Site visit records
    Visits,
}

impl TableName {
    /// SQL identifier of the table
    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::Users => "users",
            TableName::Checkins => "checkins",
            TableName::Visits => "visits",
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single scalar field value, prior to rendering into dump syntax
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    /// Record identifier, rendered as written
    Id(u64),
    Integer(i64),
    Bool(bool),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl SqlValue {
    /// Map an optional timestamp to `Timestamp` or an explicit `Null`
    pub fn optional_timestamp(value: Option<NaiveDateTime>) -> Self {
        value.map_or(SqlValue::Null, SqlValue::Timestamp)
    }
}

/// Record that can be laid out as a dump row
pub trait DumpRecord {
    /// Table the record belongs to
    const TABLE: TableName;
    /// Column names, in the order `to_row` emits values
    const COLUMNS: &'static [&'static str];

    /// Field values in `COLUMNS` order
    fn to_row(&self) -> Vec<SqlValue>;
}

/// User account, including soft-deleted ones
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: u64,
    pub username: String,
    pub display_name: String,
    pub password_hash: String,
    pub is_admin: bool,
    /// Empty means "derive from check-in count"
    pub title: String,
    pub streak: i64,
    pub max_streak: i64,
    pub total_checkin: i64,
    pub last_checkin: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    /// Soft-delete marker; exported so a restore reproduces logically deleted rows
    pub deleted_at: Option<NaiveDateTime>,
}

impl DumpRecord for Account {
    const TABLE: TableName = TableName::Users;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "username",
        "display_name",
        "password_hash",
        "is_admin",
        "title",
        "streak",
        "max_streak",
        "total_checkin",
        "last_checkin",
        "created_at",
        "updated_at",
        "deleted_at",
    ];

    fn to_row(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Id(self.id),
            SqlValue::Text(self.username.clone()),
            SqlValue::Text(self.display_name.clone()),
            SqlValue::Text(self.password_hash.clone()),
            SqlValue::Bool(self.is_admin),
            SqlValue::Text(self.title.clone()),
            SqlValue::Integer(self.streak),
            SqlValue::Integer(self.max_streak),
            SqlValue::Integer(self.total_checkin),
            SqlValue::optional_timestamp(self.last_checkin),
            SqlValue::Timestamp(self.created_at),
            SqlValue::Timestamp(self.updated_at),
            SqlValue::optional_timestamp(self.deleted_at),
        ]
    }
}

/// One completed training session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkin {
    pub id: u64,
    pub user_id: u64,
    /// Training duration in seconds
    pub duration: i64,
    pub cycles: i64,
    pub checked_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

impl DumpRecord for Checkin {
    const TABLE: TableName = TableName::Checkins;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "user_id",
        "duration",
        "cycles",
        "checked_at",
        "created_at",
    ];

    fn to_row(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Id(self.id),
            SqlValue::Id(self.user_id),
            SqlValue::Integer(self.duration),
            SqlValue::Integer(self.cycles),
            SqlValue::Timestamp(self.checked_at),
            SqlValue::Timestamp(self.created_at),
        ]
    }
}

/// A site visit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub id: u64,
    /// IP hash or browser fingerprint
    pub visitor_id: String,
    pub user_agent: String,
    /// `YYYY-MM-DD`
    pub visited_date: String,
    pub created_at: NaiveDateTime,
}

impl DumpRecord for Visit {
    const TABLE: TableName = TableName::Visits;
    const COLUMNS: &'static [&'static str] =
        &["id", "visitor_id", "user_agent", "visited_date", "created_at"];

    fn to_row(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Id(self.id),
            SqlValue::Text(self.visitor_id.clone()),
            SqlValue::Text(self.user_agent.clone()),
            SqlValue::Text(self.visited_date.clone()),
            SqlValue::Timestamp(self.created_at),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_account_row_matches_columns() {
        let account = Account {
            id: 7,
            username: "alice".to_string(),
            display_name: "Alice".to_string(),
            password_hash: "hash".to_string(),
            is_admin: true,
            title: String::new(),
            streak: 3,
            max_streak: 5,
            total_checkin: 12,
            last_checkin: None,
            created_at: ts(1),
            updated_at: ts(2),
            deleted_at: Some(ts(3)),
        };

        let row = account.to_row();
        assert_eq!(row.len(), Account::COLUMNS.len());
        assert_eq!(row[0], SqlValue::Id(7));
        assert_eq!(row[4], SqlValue::Bool(true));
        assert_eq!(row[9], SqlValue::Null);
        assert_eq!(row[12], SqlValue::Timestamp(ts(3)));
    }

    #[test]
    fn test_checkin_and_visit_rows_match_columns() {
        let checkin = Checkin {
            id: 1,
            user_id: 7,
            duration: 600,
            cycles: 4,
            checked_at: ts(8),
            created_at: ts(8),
        };
        let visit = Visit {
            id: 1,
            visitor_id: "abc".to_string(),
            user_agent: "curl/8".to_string(),
            visited_date: "2024-05-01".to_string(),
            created_at: ts(9),
        };

        assert_eq!(checkin.to_row().len(), Checkin::COLUMNS.len());
        assert_eq!(visit.to_row().len(), Visit::COLUMNS.len());
        assert_eq!(checkin.to_row()[1], SqlValue::Id(7));
    }

    #[test]
    fn test_ids_keep_full_range() {
        let checkin = Checkin {
            id: u64::MAX,
            user_id: 1 << 63,
            duration: 0,
            cycles: 0,
            checked_at: ts(8),
            created_at: ts(8),
        };

        let row = checkin.to_row();
        assert_eq!(row[0], SqlValue::Id(u64::MAX));
        assert_eq!(row[1], SqlValue::Id(1 << 63));
    }

    #[test]
    fn test_table_names() {
        assert_eq!(TableName::Users.as_str(), "users");
        assert_eq!(TableName::Checkins.to_string(), "checkins");
        assert_eq!(Visit::TABLE, TableName::Visits);
    }
}
