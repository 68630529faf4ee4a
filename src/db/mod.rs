//! Database access layer.
//!
//! - [`ConnectionProvider`] hands out pooled connections; dropping the
//!   returned [`Connection`] releases it.
//! - [`execute`] runs a [`QueryTemplate`] with parameters bound by name.
//! - [`MssqlPool`] is the SQL Server provider used by the binary.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub mod config;
pub mod executor;
pub mod pool;
pub mod value;

pub use config::ConnectionConfig;
pub use executor::{execute, Params, QueryTemplate};
pub use pool::MssqlPool;

/// One result row: column name -> value, in select-list order.
pub type Row = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Error)]
pub enum DbError {
    /// Pool was never initialized or has been closed.
    #[error("Database not connected")]
    NotConnected,

    /// Database rejected or failed the query. Message is already sanitized.
    #[error("{0}")]
    QueryFailed(String),

    #[error("Query timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Missing bound parameter `{param}` for query `{query}`")]
    MissingParameter {
        query: &'static str,
        param: &'static str,
    },

    /// A catalog row did not have the expected shape.
    #[error("Unexpected row from `{query}`: {message}")]
    Decode {
        query: &'static str,
        message: String,
    },
}

/// A live database connection checked out of a provider.
///
/// Parameters are positional (`@P1`, `@P2`, ...) at this level; named binding
/// happens in [`execute`].
#[async_trait]
pub trait Connection: Send {
    async fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<Row>, DbError>;
}

/// Source of pooled connections.
///
/// Owns reconnect and timeout policy. The returned connection goes back to
/// the pool when dropped, on every exit path.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn Connection>, DbError>;

    /// Explicit release. Equivalent to dropping the connection.
    fn release(&self, connection: Box<dyn Connection>) {
        drop(connection);
    }
}
