//! Tool handlers. Each one validates its arguments, acquires its own
//! connection, composes catalog queries, and renders the response text.
//!
//! The connection is a local owned by the handler future, so it is released
//! on every exit path: success, not-found, query failure, or cancellation.

use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::ToolContext;
use super::args::{ListSchemasArgs, ListTablesArgs, TableArgs};
use crate::catalog::{self, TableRef};
use crate::ddl;
use crate::error::ToolError;

/// Decode the argument object for `tool`, reporting field-level problems.
pub(crate) fn decode_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::validation(tool, e.to_string()))
}

fn to_pretty_json<T: Serialize>(rows: &T) -> Result<String, ToolError> {
    serde_json::to_string_pretty(rows)
        .map_err(|e| ToolError::QueryFailed(format!("Failed to serialize result: {e}")))
}

pub fn list_schemas(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<String, ToolError>> {
    Box::pin(async move {
        let _: ListSchemasArgs = decode_args(super::LIST_SCHEMAS, args)?;
        let mut conn = ctx.connection().await?;
        let schemas = catalog::list_schemas(conn.as_mut()).await?;
        to_pretty_json(&schemas)
    })
}

pub fn list_tables(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<String, ToolError>> {
    Box::pin(async move {
        let args: ListTablesArgs = decode_args(super::LIST_TABLES, args)?;
        let mut conn = ctx.connection().await?;
        let tables = catalog::list_tables(conn.as_mut(), args.schema.as_deref()).await?;
        to_pretty_json(&tables)
    })
}

pub fn describe_table(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<String, ToolError>> {
    Box::pin(async move {
        let args: TableArgs = decode_args(super::DESCRIBE_TABLE, args)?;
        let table = ctx.table_ref(args);
        let mut conn = ctx.connection().await?;

        let columns = catalog::describe_table(conn.as_mut(), &table).await?;
        if columns.is_empty() {
            return Err(ToolError::not_found(&table));
        }
        to_pretty_json(&columns)
    })
}

pub fn list_indexes(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<String, ToolError>> {
    Box::pin(async move {
        let args: TableArgs = decode_args(super::LIST_INDEXES, args)?;
        let table = ctx.table_ref(args);
        let mut conn = ctx.connection().await?;

        let indexes = catalog::list_indexes(conn.as_mut(), &table).await?;
        if indexes.is_empty() {
            ensure_table_exists(conn.as_mut(), &table).await?;
        }
        to_pretty_json(&indexes)
    })
}

pub fn list_foreign_keys(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<String, ToolError>> {
    Box::pin(async move {
        let args: TableArgs = decode_args(super::LIST_FOREIGN_KEYS, args)?;
        let table = ctx.table_ref(args);
        let mut conn = ctx.connection().await?;

        let foreign_keys = catalog::list_foreign_keys(conn.as_mut(), &table).await?;
        if foreign_keys.is_empty() {
            ensure_table_exists(conn.as_mut(), &table).await?;
        }
        to_pretty_json(&foreign_keys)
    })
}

/// Columns first, then the primary key. The key query is only issued once
/// the table is known to exist.
pub fn get_ddl(ctx: &ToolContext, args: Value) -> BoxFuture<'_, Result<String, ToolError>> {
    Box::pin(async move {
        let args: TableArgs = decode_args(super::GET_DDL, args)?;
        let table = ctx.table_ref(args);
        let mut conn = ctx.connection().await?;

        let columns = catalog::describe_table(conn.as_mut(), &table).await?;
        if columns.is_empty() {
            return Err(ToolError::not_found(&table));
        }

        let pk_columns = catalog::list_primary_key_columns(conn.as_mut(), &table).await?;

        ddl::synthesize_ddl(&table, &columns, &pk_columns).ok_or_else(|| ToolError::not_found(&table))
    })
}

/// An empty index/foreign-key list is only a success if the table exists.
async fn ensure_table_exists(
    conn: &mut dyn crate::db::Connection,
    table: &TableRef,
) -> Result<(), ToolError> {
    if catalog::table_exists(conn, table).await? {
        Ok(())
    } else {
        Err(ToolError::not_found(table))
    }
}
