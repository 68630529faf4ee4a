//! Strongly-typed catalog entities.
//!
//! Rows are decoded into these immediately after they come back from the
//! executor. Serialized field names match the catalog column aliases, which
//! is the JSON shape clients see.

use serde::{Deserialize, Serialize};

/// (schema, table) pair identifying one relational table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub name: String,
    pub schema_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    #[serde(rename = "TABLE_SCHEMA")]
    pub schema: String,
    #[serde(rename = "TABLE_NAME")]
    pub name: String,
    /// `BASE TABLE` or `VIEW`
    #[serde(rename = "TABLE_TYPE")]
    pub table_type: String,
}

/// Sentinel `max_length` for `varchar(MAX)`-style unbounded columns.
pub const MAX_LENGTH_UNBOUNDED: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    #[serde(rename = "COLUMN_NAME")]
    pub name: String,
    #[serde(rename = "DATA_TYPE")]
    pub data_type: String,
    /// Character length; `None` for non-character types, `-1` for MAX.
    #[serde(rename = "CHARACTER_MAXIMUM_LENGTH")]
    pub max_length: Option<i32>,
    #[serde(rename = "IS_NULLABLE", with = "yes_no")]
    pub is_nullable: bool,
    /// Default constraint text exactly as stored, e.g. `((0))`.
    #[serde(rename = "COLUMN_DEFAULT")]
    pub default_expression: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMeta {
    #[serde(rename = "IndexName")]
    pub index_name: String,
    #[serde(rename = "IndexType")]
    pub index_type: String,
    #[serde(rename = "ColumnName")]
    pub column_name: String,
    pub is_included_column: bool,
    pub is_unique: bool,
    pub is_primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyMeta {
    #[serde(rename = "ForeignKeyName")]
    pub fk_name: String,
    #[serde(rename = "ParentTable")]
    pub parent_table: String,
    #[serde(rename = "ParentColumn")]
    pub parent_column: String,
    #[serde(rename = "ReferencedTable")]
    pub referenced_table: String,
    #[serde(rename = "ReferencedColumn")]
    pub referenced_column: String,
}

/// INFORMATION_SCHEMA spells booleans as `YES` / `NO`.
mod yes_no {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "YES" } else { "NO" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.to_ascii_uppercase().as_str() {
            "YES" => Ok(true),
            "NO" => Ok(false),
            other => Err(D::Error::custom(format!(
                "expected YES or NO, got {other:?}"
            ))),
        }
    }
}
