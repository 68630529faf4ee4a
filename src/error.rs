//! Error taxonomy for tool invocations.
//!
//! Every variant is caught at the registry boundary and rendered into a
//! [`ToolResponse`](crate::tools::ToolResponse) with `is_error = true`; none of
//! them terminate the server.

use thiserror::Error;

use crate::catalog::TableRef;
use crate::db::DbError;

#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments did not match the tool's declared input schema.
    #[error("Invalid arguments for {tool}: {message}")]
    Validation { tool: String, message: String },

    #[error("Unknown tool: {0}")]
    UnknownOperation(String),

    /// Tool exists but was filtered out by `--tool`/`--tools`/`--toolset`.
    #[error("Tool '{0}' is not enabled")]
    NotEnabled(String),

    #[error("Database not connected")]
    NotConnected,

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Table {schema}.{table} not found.")]
    NotFound { schema: String, table: String },
}

impl ToolError {
    pub fn validation(tool: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            tool: tool.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(table: &TableRef) -> Self {
        Self::NotFound {
            schema: table.schema.clone(),
            table: table.table.clone(),
        }
    }

    /// Short machine-friendly label, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::UnknownOperation(_) => "unknown_operation",
            Self::NotEnabled(_) => "not_enabled",
            Self::NotConnected => "not_connected",
            Self::QueryFailed(_) => "query_failed",
            Self::NotFound { .. } => "not_found",
        }
    }
}

impl From<DbError> for ToolError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotConnected => Self::NotConnected,
            DbError::QueryFailed(message) => Self::QueryFailed(message),
            other => Self::QueryFailed(other.to_string()),
        }
    }
}
