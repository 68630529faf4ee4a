//! DDL Synthesizer.
//!
//! Rebuilds a `CREATE TABLE` statement from column metadata and the primary
//! key column list. The result is best-effort and does not round-trip:
//! computed columns, check constraints, non-PK unique constraints, collation,
//! triggers, and partitioning are not represented.

use std::fmt::Write;

use crate::catalog::{ColumnMeta, TableRef, MAX_LENGTH_UNBOUNDED};

/// Render `[name] type(len) [NOT] NULL [DEFAULT expr]` for one column.
pub fn column_definition(column: &ColumnMeta) -> String {
    let mut def = format!("  [{}] {}", column.name, column.data_type);

    match column.max_length {
        Some(len) if len > 0 => {
            let _ = write!(def, "({len})");
        }
        Some(MAX_LENGTH_UNBOUNDED) => def.push_str("(MAX)"),
        _ => {}
    }

    def.push_str(if column.is_nullable { " NULL" } else { " NOT NULL" });

    // Copied verbatim: default text comes from the catalog, not the caller
    if let Some(default) = column.default_expression.as_deref().filter(|d| !d.is_empty()) {
        let _ = write!(def, " DEFAULT {default}");
    }

    def
}

/// Synthesize the `CREATE TABLE` text for `table`.
///
/// `columns` must be in declaration order and `pk_columns` in key ordinal
/// order; both orders are preserved in the output. Returns `None` when
/// `columns` is empty, which callers report as table-not-found.
pub fn synthesize_ddl(table: &TableRef, columns: &[ColumnMeta], pk_columns: &[String]) -> Option<String> {
    if columns.is_empty() {
        return None;
    }

    let mut ddl = format!("CREATE TABLE [{}].[{}] (\n", table.schema, table.table);

    let definitions: Vec<String> = columns.iter().map(column_definition).collect();
    ddl.push_str(&definitions.join(",\n"));

    if !pk_columns.is_empty() {
        let keys: Vec<String> = pk_columns.iter().map(|c| format!("[{c}]")).collect();
        let _ = write!(
            ddl,
            ",\n  CONSTRAINT PK_{} PRIMARY KEY CLUSTERED ({})",
            table.table,
            keys.join(", ")
        );
    }

    ddl.push_str("\n);");
    Some(ddl)
}
