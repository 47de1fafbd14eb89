//! The store collaborator and the ordered table registry
//!
//! The engine never owns records. It reads whole tables through [`Store`]
//! when exporting, and clears tables and replays insertion statements through
//! it when restoring.

use crate::error::StoreResult;
use crate::model::{Account, Checkin, DumpRecord, SqlValue, TableName, Visit};

/// One exported row, values in column order
pub type Row = Vec<SqlValue>;

/// Relational store holding the backed-up tables
///
/// Implementations must accept statements in dump syntax through
/// [`Store::execute`]: backtick-quoted identifiers, backslash-escaped string
/// literals, and the `SET FOREIGN_KEY_CHECKS = 0|1` integrity toggle.
pub trait Store {
    /// All accounts, including soft-deleted ones
    fn read_accounts(&self) -> StoreResult<Vec<Account>>;

    /// All check-in records
    fn read_checkins(&self) -> StoreResult<Vec<Checkin>>;

    /// All visit records
    fn read_visits(&self) -> StoreResult<Vec<Visit>>;

    /// Delete every row of `table`
    fn clear_table(&self, table: TableName) -> StoreResult<()>;

    /// Execute one raw statement, returning the number of affected rows
    fn execute(&self, statement: &str) -> StoreResult<usize>;
}

impl<S: Store + ?Sized> Store for &S {
    fn read_accounts(&self) -> StoreResult<Vec<Account>> {
        (**self).read_accounts()
    }

    fn read_checkins(&self) -> StoreResult<Vec<Checkin>> {
        (**self).read_checkins()
    }

    fn read_visits(&self) -> StoreResult<Vec<Visit>> {
        (**self).read_visits()
    }

    fn clear_table(&self, table: TableName) -> StoreResult<()> {
        (**self).clear_table(table)
    }

    fn execute(&self, statement: &str) -> StoreResult<usize> {
        (**self).execute(statement)
    }
}

/// A backed-up table: its identity, columns, and how to read its rows
pub struct TableSpec {
    pub table: TableName,
    pub columns: &'static [&'static str],
    pub read_rows: fn(&dyn Store) -> StoreResult<Vec<Row>>,
}

impl std::fmt::Debug for TableSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableSpec")
            .field("table", &self.table)
            .field("columns", &self.columns)
            .finish()
    }
}

/// Backed-up tables in export order.
///
/// Dumps are composed by walking this forward. Restores clear tables walking
/// it backwards, so dependents are emptied before the accounts they reference.
pub static TABLES: [TableSpec; 3] = [
    TableSpec {
        table: Account::TABLE,
        columns: Account::COLUMNS,
        read_rows: read_account_rows,
    },
    TableSpec {
        table: Checkin::TABLE,
        columns: Checkin::COLUMNS,
        read_rows: read_checkin_rows,
    },
    TableSpec {
        table: Visit::TABLE,
        columns: Visit::COLUMNS,
        read_rows: read_visit_rows,
    },
];

fn rows_of<R: DumpRecord>(records: Vec<R>) -> Vec<Row> {
    records.iter().map(DumpRecord::to_row).collect()
}

fn read_account_rows(store: &dyn Store) -> StoreResult<Vec<Row>> {
    store.read_accounts().map(rows_of)
}

fn read_checkin_rows(store: &dyn Store) -> StoreResult<Vec<Row>> {
    store.read_checkins().map(rows_of)
}

fn read_visit_rows(store: &dyn Store) -> StoreResult<Vec<Row>> {
    store.read_visits().map(rows_of)
}
