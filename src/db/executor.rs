//! Query Executor: runs a fixed query template with named parameters.
//!
//! Caller-supplied values never enter the SQL text. Each declared parameter
//! is introduced as a T-SQL local variable initialised from a positional RPC
//! parameter:
//!
//! ```text
//! DECLARE @schema nvarchar(max) = @P1;
//! DECLARE @table nvarchar(max) = @P2;
//! <template body referring to @schema / @table>
//! ```
//!
//! The variable names come from the template declaration, which is static.
//! Values are declared unbounded so an over-long name is compared whole
//! instead of being truncated to a `sysname` prefix.

use super::{Connection, DbError, Row};

/// A fixed, parameterized metadata query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryTemplate {
    /// Identifier used in logs and error messages.
    pub name: &'static str,
    /// Names of the `@variables` the body refers to, in binding order.
    pub params: &'static [&'static str],
    pub sql: &'static str,
}

impl QueryTemplate {
    /// Full batch text sent to the server: declarations followed by the body.
    pub fn render(&self) -> String {
        let mut text = String::new();
        for (index, name) in self.params.iter().enumerate() {
            text.push_str(&format!(
                "DECLARE @{name} nvarchar(max) = @P{};\n",
                index + 1
            ));
        }
        text.push_str(self.sql.trim());
        text
    }

    /// Resolve named bindings into positional values, in declaration order.
    pub fn bind<'a>(&self, params: &Params<'a>) -> Result<Vec<&'a str>, DbError> {
        self.params
            .iter()
            .map(|&name| {
                params.get(name).ok_or(DbError::MissingParameter {
                    query: self.name,
                    param: name,
                })
            })
            .collect()
    }
}

/// Named parameter values for one execution.
#[derive(Debug, Default, Clone)]
pub struct Params<'a> {
    values: Vec<(&'static str, &'a str)>,
}

impl<'a> Params<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` to `@name`. A later binding of the same name wins.
    pub fn bind(mut self, name: &'static str, value: &'a str) -> Self {
        self.values.retain(|(existing, _)| *existing != name);
        self.values.push((name, value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.values
            .iter()
            .find(|(existing, _)| *existing == name)
            .map(|(_, value)| *value)
    }
}

/// Execute `template` on `connection` and return its rows in server order.
///
/// One round trip; no retry. Binding failures are reported before anything
/// is sent.
pub async fn execute(
    connection: &mut dyn Connection,
    template: &QueryTemplate,
    params: &Params<'_>,
) -> Result<Vec<Row>, DbError> {
    let values = template.bind(params)?;
    let sql = template.render();

    log::debug!(
        "Executing {} with {} bound parameter(s)",
        template.name,
        values.len()
    );

    let rows = connection.query(&sql, &values).await?;

    log::debug!("{} returned {} row(s)", template.name, rows.len());
    Ok(rows)
}
