//! Read-only SQL Server schema exploration exposed as MCP tools.
//!
//! Data flow for one call:
//!
//! ```text
//! stdio (rmcp) -> ToolRegistry (validate) -> handler
//!     -> catalog queries (executor -> pooled connection)
//!     -> optional DDL synthesis -> ToolResponse
//! ```

pub mod catalog;
pub mod cli;
pub mod db;
pub mod ddl;
pub mod error;
pub mod stdio;
pub mod tools;

pub use catalog::{ColumnMeta, ForeignKeyMeta, IndexMeta, SchemaInfo, TableInfo, TableRef};
pub use db::{Connection, ConnectionProvider, DbError, MssqlPool};
pub use ddl::synthesize_ddl;
pub use error::ToolError;
pub use tools::{ToolContext, ToolRegistry, ToolResponse};
