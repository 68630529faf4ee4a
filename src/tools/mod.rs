//! Tool Registry.
//!
//! A static table of `{name, description, input schema, handler}` built once
//! on first use and iterated by the protocol adapter to advertise tools.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use schemars::{schema_for, JsonSchema};
use serde_json::{Map, Value};

use crate::catalog::TableRef;
use crate::db::{Connection, ConnectionProvider};
use crate::error::ToolError;

pub mod args;
mod handlers;
mod response;

pub use response::{ContentItem, ToolResponse};

pub const LIST_SCHEMAS: &str = "list_schemas";
pub const LIST_TABLES: &str = "list_tables";
pub const DESCRIBE_TABLE: &str = "describe_table";
pub const LIST_INDEXES: &str = "list_indexes";
pub const LIST_FOREIGN_KEYS: &str = "list_foreign_keys";
pub const GET_DDL: &str = "get_ddl";

/// Async tool entry point. Receives the raw argument object.
pub type Handler = for<'a> fn(&'a ToolContext, Value) -> BoxFuture<'a, Result<String, ToolError>>;

/// One registered tool.
pub struct ToolEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub schema: Value,
    pub handler: Handler,
}

impl std::fmt::Debug for ToolEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolEntry")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Helper to build schema from Args type.
pub fn build_schema<T: JsonSchema>() -> Value {
    serde_json::to_value(schema_for!(T)).unwrap_or(Value::Null)
}

/// All tools, cached and sorted alphabetically.
static TOOLS: Lazy<Vec<ToolEntry>> = Lazy::new(|| {
    let mut tools = vec![
        ToolEntry {
            name: LIST_SCHEMAS,
            description: "List all database schemas",
            schema: build_schema::<args::ListSchemasArgs>(),
            handler: handlers::list_schemas,
        },
        ToolEntry {
            name: LIST_TABLES,
            description: "List tables in a specific schema (or all if not provided)",
            schema: build_schema::<args::ListTablesArgs>(),
            handler: handlers::list_tables,
        },
        ToolEntry {
            name: DESCRIBE_TABLE,
            description: "Get detailed column information for a table",
            schema: build_schema::<args::TableArgs>(),
            handler: handlers::describe_table,
        },
        ToolEntry {
            name: LIST_INDEXES,
            description: "List indexes for a specific table",
            schema: build_schema::<args::TableArgs>(),
            handler: handlers::list_indexes,
        },
        ToolEntry {
            name: LIST_FOREIGN_KEYS,
            description: "List foreign keys for a specific table",
            schema: build_schema::<args::TableArgs>(),
            handler: handlers::list_foreign_keys,
        },
        ToolEntry {
            name: GET_DDL,
            description: "Get DDL (CREATE TABLE script) for a table. Best-effort: columns, \
                          defaults and the primary key only.",
            schema: build_schema::<args::TableArgs>(),
            handler: handlers::get_ddl,
        },
    ];

    tools.sort_by(|a, b| a.name.cmp(b.name));
    tools
});

/// Returns a static reference to every registered tool (cached, sorted).
pub fn all_tools() -> &'static [ToolEntry] {
    &TOOLS
}

/// Get all available tool names
pub fn available_tools() -> Vec<&'static str> {
    all_tools().iter().map(|tool| tool.name).collect()
}

/// Shared state handed to every handler.
pub struct ToolContext {
    provider: Arc<dyn ConnectionProvider>,
    default_schema: String,
}

impl ToolContext {
    pub fn new(provider: Arc<dyn ConnectionProvider>, default_schema: impl Into<String>) -> Self {
        Self {
            provider,
            default_schema: default_schema.into(),
        }
    }

    pub fn default_schema(&self) -> &str {
        &self.default_schema
    }

    pub(crate) fn table_ref(&self, args: args::TableArgs) -> TableRef {
        let schema = args.schema.unwrap_or_else(|| self.default_schema.clone());
        TableRef::new(schema, args.table)
    }

    pub(crate) async fn connection(&self) -> Result<Box<dyn Connection>, ToolError> {
        Ok(self.provider.acquire().await?)
    }
}

/// Dispatches validated calls to handlers.
pub struct ToolRegistry {
    context: ToolContext,
    /// Enabled tool names (filtered by --tool/--tools/--toolset)
    enabled: Option<HashSet<String>>,
}

impl ToolRegistry {
    pub fn new(context: ToolContext, enabled: Option<HashSet<String>>) -> Self {
        Self { context, enabled }
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.as_ref().is_none_or(|enabled| enabled.contains(name))
    }

    /// Tools to advertise: all registered tools that are enabled.
    pub fn tools(&self) -> impl Iterator<Item = &'static ToolEntry> + '_ {
        all_tools().iter().filter(|tool| self.is_enabled(tool.name))
    }

    pub fn lookup(&self, name: &str) -> Result<&'static ToolEntry, ToolError> {
        let entry = all_tools()
            .iter()
            .find(|tool| tool.name == name)
            .ok_or_else(|| ToolError::UnknownOperation(name.to_string()))?;

        if !self.is_enabled(name) {
            return Err(ToolError::NotEnabled(name.to_string()));
        }
        Ok(entry)
    }

    /// Run tool `name` and return its text, or the typed error.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<String, ToolError> {
        let entry = self.lookup(name)?;
        let args = Value::Object(arguments.unwrap_or_default());
        (entry.handler)(&self.context, args).await
    }

    /// Run tool `name` and wrap the outcome in a response envelope.
    pub async fn call(&self, name: &str, arguments: Option<Map<String, Value>>) -> ToolResponse {
        log::debug!("Calling tool '{name}'");

        let result = self.dispatch(name, arguments).await;
        if let Err(ref e) = result {
            log::warn!("Tool '{name}' returned {} error: {e}", e.kind());
        }
        result.into()
    }
}
