use clap::Parser;
use secrecy::SecretString;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::db::ConnectionConfig;

/// Read-only SQL Server schema exploration over MCP (stdio)
///
/// Tools:
/// - `list_schemas`: all schemas
/// - `list_tables`: tables and views, optionally by schema
/// - `describe_table`: column metadata
/// - `list_indexes`: index columns in key order
/// - `list_foreign_keys`: foreign key column pairs
/// - `get_ddl`: best-effort CREATE TABLE script
#[derive(Parser, Debug)]
#[command(name = "mssql-schema-mcp")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable specific tools by name (comma-separated)
    ///
    /// Example: --tools list_tables,describe_table
    ///
    /// If not specified, all tools are enabled.
    #[arg(long, value_delimiter = ',', conflicts_with = "tool")]
    pub tools: Option<Vec<String>>,

    /// Enable specific tool by name (can be specified multiple times)
    ///
    /// Example: --tool list_tables --tool get_ddl
    #[arg(long = "tool", conflicts_with = "tools")]
    pub tool: Vec<String>,

    /// Load tool names from a JSON toolset file or named toolset
    ///
    /// Example: --toolset ~/.config/mssql-schema-mcp/toolset/readonly.json
    #[arg(long, value_name = "NAME|PATH", conflicts_with_all = ["tool", "tools"])]
    pub toolset: Option<String>,

    /// List available tool names and exit
    #[arg(long)]
    pub list_tools: bool,

    // ============ Database Configuration ============
    /// SQL Server host
    #[arg(long, env = "DB_HOST", default_value = "localhost")]
    pub db_host: String,

    /// SQL Server port
    #[arg(long, env = "DB_PORT", default_value = "1433")]
    pub db_port: u16,

    /// Database name (server default database if omitted)
    #[arg(long, env = "DB_NAME")]
    pub db_name: Option<String>,

    /// SQL login user
    #[arg(long, env = "DB_USER")]
    pub db_user: Option<String>,

    /// SQL login password
    #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    /// Encrypt the whole session (required for Azure SQL)
    #[arg(long, env = "DB_ENCRYPT")]
    pub db_encrypt: bool,

    /// Trust the server certificate without validation (local dev / self-signed)
    #[arg(long, env = "DB_TRUST_CERT")]
    pub db_trust_cert: bool,

    /// Schema used by table-scoped tools when the caller omits one
    #[arg(long, env = "DB_DEFAULT_SCHEMA", default_value = "dbo")]
    pub default_schema: String,

    /// Maximum number of pooled connections
    #[arg(long, value_name = "COUNT", env = "DB_POOL_SIZE", default_value = "10")]
    pub pool_size: usize,

    /// Per-query timeout in seconds
    #[arg(long, value_name = "SECONDS", env = "DB_QUERY_TIMEOUT_SECS", default_value = "30")]
    pub query_timeout: u64,

    /// Timeout in seconds for checking out or opening a connection
    #[arg(long, value_name = "SECONDS", env = "DB_ACQUIRE_TIMEOUT_SECS", default_value = "30")]
    pub acquire_timeout: u64,

    /// Maximum connection attempts (default: 3)
    /// Set to 1 to disable retries (fail fast)
    #[arg(long, value_name = "COUNT", default_value = "3")]
    pub connect_retries: u32,

    /// Initial connection retry backoff in milliseconds (default: 500)
    /// Backoff doubles on each retry up to 10 seconds maximum
    #[arg(long, value_name = "MILLIS", default_value = "500")]
    pub connect_retry_backoff: u64,
}

impl Cli {
    /// Get the set of enabled tool names
    ///
    /// Returns None if no filter specified (enable all tools)
    /// Returns Some(HashSet) if filter specified (enable only these tools)
    pub async fn enabled_tools(&self) -> anyhow::Result<Option<HashSet<String>>> {
        // Priority 1: --toolset
        if let Some(ref spec) = self.toolset {
            let path = super::toolset::resolve_toolset_path(spec).await?;
            let tools = super::toolset::load_toolset_file(&path).await?;
            return Ok(Some(tools.into_iter().collect()));
        }

        // Priority 2: --tools (comma-separated)
        if let Some(tools) = &self.tools {
            return Ok(Some(tools.iter().cloned().collect()));
        }

        // Priority 3: --tool (repeated flags)
        if !self.tool.is_empty() {
            return Ok(Some(self.tool.iter().cloned().collect()));
        }

        Ok(None)
    }

    /// Build the pool configuration from the database flags
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            host: self.db_host.clone(),
            port: self.db_port,
            database: self.db_name.clone(),
            user: self.db_user.clone(),
            password: self.db_password.clone().map(SecretString::from),
            encrypt: self.db_encrypt,
            trust_cert: self.db_trust_cert,
            pool_size: self.pool_size,
            query_timeout: Duration::from_secs(self.query_timeout),
            acquire_timeout: Duration::from_secs(self.acquire_timeout),
            connect_retries: self.connect_retries,
            connect_backoff: Duration::from_millis(self.connect_retry_backoff),
        }
    }
}

/// Load `.env` from the working directory or one of its parents.
///
/// Must run before [`Cli::parse`] so `DB_*` values in the file reach the
/// `env` fallbacks. Variables already set in the process environment win.
/// Returns the loaded file, or `None` when there is none.
pub fn load_env_file() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

/// Load a specific env file. Same precedence rules as [`load_env_file`].
pub fn load_env_file_from(path: &Path) -> Option<PathBuf> {
    dotenvy::from_path(path).ok().map(|()| path.to_path_buf())
}

/// Get all available tool names
pub fn available_tools() -> Vec<&'static str> {
    crate::tools::available_tools()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_sql_server_conventions() {
        let cli = Cli::try_parse_from(["mssql-schema-mcp"]).unwrap();
        assert_eq!(cli.default_schema, "dbo");
        assert_eq!(cli.db_port, 1433);

        let config = cli.connection_config();
        assert_eq!(config.pool_size, 10);
        assert_eq!(config.query_timeout, Duration::from_secs(30));
    }

    #[test]
    fn default_schema_is_configurable() {
        let cli = Cli::try_parse_from(["mssql-schema-mcp", "--default-schema", "sales"]).unwrap();
        assert_eq!(cli.default_schema, "sales");
    }

    #[test]
    fn tool_and_tools_conflict() {
        let result = Cli::try_parse_from([
            "mssql-schema-mcp",
            "--tool",
            "get_ddl",
            "--tools",
            "list_tables",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn env_file_supplies_missing_variables_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "MSSQL_SCHEMA_MCP_TEST_ENV_HOST=db.internal\nMSSQL_SCHEMA_MCP_TEST_ENV_USER=from_file\n",
        )
        .unwrap();
        // SAFETY: the variable names are unique to this test
        unsafe { std::env::set_var("MSSQL_SCHEMA_MCP_TEST_ENV_USER", "from_process") };

        assert_eq!(load_env_file_from(&path), Some(path.clone()));
        assert_eq!(
            std::env::var("MSSQL_SCHEMA_MCP_TEST_ENV_HOST").unwrap(),
            "db.internal"
        );
        assert_eq!(
            std::env::var("MSSQL_SCHEMA_MCP_TEST_ENV_USER").unwrap(),
            "from_process"
        );
    }

    #[test]
    fn missing_env_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_env_file_from(&dir.path().join(".env")), None);
    }

    #[tokio::test]
    async fn comma_separated_tools_are_split() {
        let cli =
            Cli::try_parse_from(["mssql-schema-mcp", "--tools", "list_tables,get_ddl"]).unwrap();
        let enabled = cli.enabled_tools().await.unwrap().unwrap();
        assert!(enabled.contains("list_tables"));
        assert!(enabled.contains("get_ddl"));
        assert_eq!(enabled.len(), 2);
    }
}
