//! Metadata Catalog: typed wrappers over the fixed query templates.
//!
//! Stateless. Each function issues exactly one query on the connection it is
//! given and decodes the rows before returning.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::db::{execute, Connection, DbError, Params, QueryTemplate, Row};

pub mod queries;
mod types;

pub use types::{
    ColumnMeta, ForeignKeyMeta, IndexMeta, SchemaInfo, TableInfo, TableRef, MAX_LENGTH_UNBOUNDED,
};

fn decode<T: DeserializeOwned>(template: &QueryTemplate, rows: Vec<Row>) -> Result<Vec<T>, DbError> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(Value::Object(row)).map_err(|e| DbError::Decode {
                query: template.name,
                message: e.to_string(),
            })
        })
        .collect()
}

fn table_params(table: &TableRef) -> Params<'_> {
    Params::new()
        .bind("schema", &table.schema)
        .bind("table", &table.table)
}

async fn fetch<T: DeserializeOwned>(
    conn: &mut dyn Connection,
    template: &QueryTemplate,
    params: &Params<'_>,
) -> Result<Vec<T>, DbError> {
    let rows = execute(conn, template, params).await?;
    decode(template, rows)
}

pub async fn list_schemas(conn: &mut dyn Connection) -> Result<Vec<SchemaInfo>, DbError> {
    fetch(conn, &queries::LIST_SCHEMAS, &Params::new()).await
}

/// All tables and views, or only those in `schema` when given. A blank
/// schema means no filter.
pub async fn list_tables(
    conn: &mut dyn Connection,
    schema: Option<&str>,
) -> Result<Vec<TableInfo>, DbError> {
    match schema.filter(|s| !s.trim().is_empty()) {
        Some(schema) => {
            let params = Params::new().bind("schema", schema);
            fetch(conn, &queries::LIST_TABLES_IN_SCHEMA, &params).await
        }
        None => fetch(conn, &queries::LIST_TABLES, &Params::new()).await,
    }
}

/// Columns of one table in declaration order. Empty when the table does not
/// exist.
pub async fn describe_table(
    conn: &mut dyn Connection,
    table: &TableRef,
) -> Result<Vec<ColumnMeta>, DbError> {
    fetch(conn, &queries::DESCRIBE_TABLE, &table_params(table)).await
}

/// One row per (index, column), ordered by index name then key ordinal.
pub async fn list_indexes(
    conn: &mut dyn Connection,
    table: &TableRef,
) -> Result<Vec<IndexMeta>, DbError> {
    fetch(conn, &queries::LIST_INDEXES, &table_params(table)).await
}

pub async fn list_foreign_keys(
    conn: &mut dyn Connection,
    table: &TableRef,
) -> Result<Vec<ForeignKeyMeta>, DbError> {
    fetch(conn, &queries::LIST_FOREIGN_KEYS, &table_params(table)).await
}

/// Primary key column names ordered by key ordinal.
pub async fn list_primary_key_columns(
    conn: &mut dyn Connection,
    table: &TableRef,
) -> Result<Vec<String>, DbError> {
    #[derive(serde::Deserialize)]
    struct KeyColumn {
        #[serde(rename = "ColumnName")]
        column_name: String,
    }

    let columns: Vec<KeyColumn> =
        fetch(conn, &queries::LIST_PRIMARY_KEY_COLUMNS, &table_params(table)).await?;
    Ok(columns.into_iter().map(|c| c.column_name).collect())
}

pub async fn table_exists(conn: &mut dyn Connection, table: &TableRef) -> Result<bool, DbError> {
    #[derive(serde::Deserialize)]
    struct Count {
        table_count: i64,
    }

    let counts: Vec<Count> = fetch(conn, &queries::TABLE_EXISTS, &table_params(table)).await?;
    Ok(counts.first().is_some_and(|c| c.table_count > 0))
}
