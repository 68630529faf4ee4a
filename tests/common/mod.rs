// In-memory stand-in for SQL Server catalog views.
//
// The fake connection recognises which catalog template it was sent, applies
// the positional parameters the executor bound, and answers with rows shaped
// like the real driver output.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use mssql_schema_mcp::catalog::queries;
use mssql_schema_mcp::db::{QueryTemplate, Row};
use mssql_schema_mcp::{Connection, ConnectionProvider, DbError};

type Key = (String, String);

fn key(schema: &str, table: &str) -> Key {
    (schema.to_string(), table.to_string())
}

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("row must be an object, got {other}"),
    }
}

#[derive(Default)]
pub struct FakeCatalog {
    schemas: Vec<(String, i32)>,
    tables: Vec<(String, String, String)>,
    columns: HashMap<Key, Vec<Row>>,
    indexes: HashMap<Key, Vec<Row>>,
    foreign_keys: HashMap<Key, Vec<Row>>,
    primary_keys: HashMap<Key, Vec<String>>,
    fail_on: Option<&'static str>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema(mut self, name: &str, id: i32) -> Self {
        self.schemas.push((name.to_string(), id));
        self
    }

    pub fn table(mut self, schema: &str, name: &str) -> Self {
        self.tables
            .push((schema.to_string(), name.to_string(), "BASE TABLE".to_string()));
        self
    }

    pub fn column(
        mut self,
        schema: &str,
        table: &str,
        name: &str,
        data_type: &str,
        max_length: Option<i32>,
        nullable: bool,
        default: Option<&str>,
    ) -> Self {
        self.columns.entry(key(schema, table)).or_default().push(row(json!({
            "COLUMN_NAME": name,
            "DATA_TYPE": data_type,
            "CHARACTER_MAXIMUM_LENGTH": max_length,
            "IS_NULLABLE": if nullable { "YES" } else { "NO" },
            "COLUMN_DEFAULT": default,
        })));
        self
    }

    pub fn index(
        mut self,
        schema: &str,
        table: &str,
        index: &str,
        column: &str,
        unique: bool,
        primary_key: bool,
    ) -> Self {
        self.indexes.entry(key(schema, table)).or_default().push(row(json!({
            "IndexName": index,
            "IndexType": if primary_key { "CLUSTERED" } else { "NONCLUSTERED" },
            "ColumnName": column,
            "is_included_column": false,
            "is_unique": unique,
            "is_primary_key": primary_key,
        })));
        self
    }

    pub fn foreign_key(
        mut self,
        schema: &str,
        table: &str,
        name: &str,
        column: &str,
        referenced_table: &str,
        referenced_column: &str,
    ) -> Self {
        self.foreign_keys.entry(key(schema, table)).or_default().push(row(json!({
            "ForeignKeyName": name,
            "ParentTable": table,
            "ParentColumn": column,
            "ReferencedTable": referenced_table,
            "ReferencedColumn": referenced_column,
        })));
        self
    }

    /// Primary key columns in key ordinal order.
    pub fn primary_key(mut self, schema: &str, table: &str, columns: &[&str]) -> Self {
        self.primary_keys.insert(
            key(schema, table),
            columns.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    /// Make every execution of `template` fail.
    pub fn fail_on(mut self, template: &'static str) -> Self {
        self.fail_on = Some(template);
        self
    }

    fn answer(&self, template: &QueryTemplate, params: &[&str]) -> Result<Vec<Row>, DbError> {
        if self.fail_on == Some(template.name) {
            return Err(DbError::QueryFailed(format!(
                "Invalid object name in {}",
                template.name
            )));
        }

        let scoped = || key(params[0], params[1]);

        let rows = match template.name {
            "list_schemas" => self
                .schemas
                .iter()
                .map(|(name, id)| row(json!({ "name": name, "schema_id": id })))
                .collect(),
            "list_tables" | "list_tables_in_schema" => self
                .tables
                .iter()
                .filter(|(schema, _, _)| params.first().is_none_or(|s| *s == schema.as_str()))
                .map(|(schema, name, kind)| {
                    row(json!({ "TABLE_SCHEMA": schema, "TABLE_NAME": name, "TABLE_TYPE": kind }))
                })
                .collect(),
            "describe_table" => self.columns.get(&scoped()).cloned().unwrap_or_default(),
            "list_indexes" => self.indexes.get(&scoped()).cloned().unwrap_or_default(),
            "list_foreign_keys" => self.foreign_keys.get(&scoped()).cloned().unwrap_or_default(),
            "list_primary_key_columns" => self
                .primary_keys
                .get(&scoped())
                .map(|cols| cols.iter().map(|c| row(json!({ "ColumnName": c }))).collect())
                .unwrap_or_default(),
            "table_exists" => {
                let (schema, table) = scoped();
                let count = self
                    .tables
                    .iter()
                    .filter(|(s, t, _)| *s == schema && *t == table)
                    .count();
                vec![row(json!({ "table_count": count }))]
            }
            other => panic!("unexpected template {other}"),
        };
        Ok(rows)
    }
}

#[derive(Default)]
pub struct Stats {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub queries: Mutex<Vec<&'static str>>,
}

impl Stats {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<&'static str> {
        self.queries.lock().unwrap().clone()
    }
}

pub struct FakeProvider {
    catalog: Arc<FakeCatalog>,
    pub stats: Arc<Stats>,
    connected: bool,
}

impl FakeProvider {
    pub fn new(catalog: FakeCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            stats: Arc::new(Stats::default()),
            connected: true,
        }
    }

    /// A provider whose pool was never initialized.
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            ..Self::new(FakeCatalog::new())
        }
    }
}

#[async_trait]
impl ConnectionProvider for FakeProvider {
    async fn acquire(&self) -> Result<Box<dyn Connection>, DbError> {
        if !self.connected {
            return Err(DbError::NotConnected);
        }
        self.stats.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeConnection {
            catalog: Arc::clone(&self.catalog),
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct FakeConnection {
    catalog: Arc<FakeCatalog>,
    stats: Arc<Stats>,
}

#[async_trait]
impl Connection for FakeConnection {
    async fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<Row>, DbError> {
        let template = queries::ALL
            .iter()
            .find(|t| sql.ends_with(t.sql.trim()))
            .unwrap_or_else(|| panic!("unrecognised SQL: {sql}"));

        assert_eq!(
            params.len(),
            template.params.len(),
            "{} bound the wrong number of parameters",
            template.name
        );
        for value in params {
            assert!(
                !sql.contains(value) || value.is_empty(),
                "parameter value {value:?} leaked into SQL text"
            );
        }

        self.stats.queries.lock().unwrap().push(template.name);
        self.catalog.answer(template, params)
    }
}

impl Drop for FakeConnection {
    fn drop(&mut self) {
        self.stats.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// `dbo.tblInvoices (Id int NOT NULL, Amount decimal NULL DEFAULT 0)` with
/// `Id` as primary key, plus a few neighbours.
pub fn invoice_catalog() -> FakeCatalog {
    FakeCatalog::new()
        .schema("dbo", 1)
        .schema("sales", 5)
        .table("dbo", "tblInvoices")
        .table("dbo", "tblCustomers")
        .table("sales", "Orders")
        .table("dbo", "tblAudit")
        .column("dbo", "tblInvoices", "Id", "int", None, false, None)
        .column("dbo", "tblInvoices", "Amount", "decimal", None, true, Some("0"))
        .primary_key("dbo", "tblInvoices", &["Id"])
        .index("dbo", "tblInvoices", "PK_tblInvoices", "Id", true, true)
        .column("dbo", "tblCustomers", "Id", "int", None, false, None)
        .column("dbo", "tblCustomers", "Name", "nvarchar", Some(50), false, None)
        .column("dbo", "tblCustomers", "Notes", "nvarchar", Some(-1), true, None)
        .foreign_key("dbo", "tblInvoices", "FK_Invoices_Customers", "CustomerId", "tblCustomers", "Id")
        .column("sales", "Orders", "OrderNo", "varchar", Some(20), false, None)
        .column("dbo", "tblAudit", "Payload", "nvarchar", Some(-1), true, None)
}
