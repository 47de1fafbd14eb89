//! Table serialization
//!
//! Renders one backed-up table as a statement block:
//!
//! ```text
//! -- Table: users
//! DELETE FROM `users`;
//! INSERT INTO `users` (`id`, `username`, ...) VALUES
//! (1, 'alice', ...),
//! (2, 'bob', ...);
//!
//! ```
//!
//! The insertion statement is omitted for an empty table.

use tidalcore_core::model::TIMESTAMP_FORMAT;
use tidalcore_core::{BackupError, BackupResult, Row, SqlValue, Store, TableName, TableSpec};
use tracing::debug;

use crate::escape::escape;

/// Render one value in dump syntax
pub fn render_value(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Id(id) => id.to_string(),
        SqlValue::Integer(n) => n.to_string(),
        SqlValue::Bool(flag) => if *flag { "1" } else { "0" }.to_string(),
        SqlValue::Text(text) => format!("'{}'", escape(text)),
        SqlValue::Timestamp(ts) => format!("'{}'", ts.format(TIMESTAMP_FORMAT)),
    }
}

/// Render a row as a parenthesised value tuple
pub fn render_tuple(row: &[SqlValue]) -> String {
    let values: Vec<String> = row.iter().map(render_value).collect();
    format!("({})", values.join(", "))
}

/// Append the statement block for `table` to `out`
pub fn write_table_block(out: &mut String, table: TableName, columns: &[&str], rows: &[Row]) {
    out.push_str(&format!("-- Table: {}\n", table));
    out.push_str(&format!("DELETE FROM `{}`;\n", table));

    if !rows.is_empty() {
        let column_list: Vec<String> = columns.iter().map(|c| format!("`{}`", c)).collect();
        out.push_str(&format!(
            "INSERT INTO `{}` ({}) VALUES\n",
            table,
            column_list.join(", ")
        ));

        let tuples: Vec<String> = rows.iter().map(|row| render_tuple(row)).collect();
        out.push_str(&tuples.join(",\n"));
        out.push_str(";\n");
    }

    out.push('\n');
}

/// Read every row of the table described by `spec` and render its block
///
/// A store failure aborts with [`BackupError::ReadFailure`]; no partial block
/// is returned.
pub fn export_table(store: &dyn Store, spec: &TableSpec) -> BackupResult<String> {
    let rows = (spec.read_rows)(store).map_err(|source| BackupError::ReadFailure {
        table: spec.table,
        source,
    })?;

    let mut block = String::new();
    write_table_block(&mut block, spec.table, spec.columns, &rows);

    debug!(table = %spec.table, rows = rows.len(), "Exported table");
    Ok(block)
}
