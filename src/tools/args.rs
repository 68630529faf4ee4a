//! Input shapes for each tool.
//!
//! These derive `JsonSchema` for the advertised input schema and
//! `Deserialize` for validation: an argument object that does not
//! deserialize is rejected before any connection is acquired.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListSchemasArgs {}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListTablesArgs {
    /// Schema name to filter by. Lists tables in every schema when omitted.
    #[serde(default)]
    pub schema: Option<String>,
}

/// Arguments shared by every table-scoped tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableArgs {
    /// Schema name. Defaults to the server's configured default schema (`dbo` unless overridden).
    #[serde(default)]
    pub schema: Option<String>,

    /// Table name
    pub table: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn table_is_required() {
        let err = serde_json::from_value::<TableArgs>(json!({ "schema": "dbo" })).unwrap_err();
        assert!(err.to_string().contains("missing field `table`"));
    }

    #[test]
    fn schema_is_optional() {
        let args: TableArgs = serde_json::from_value(json!({ "table": "tblInvoices" })).unwrap();
        assert_eq!(args.schema, None);
        assert_eq!(args.table, "tblInvoices");
    }

    #[test]
    fn wrong_type_is_rejected() {
        let err = serde_json::from_value::<TableArgs>(json!({ "table": 42 })).unwrap_err();
        assert!(err.to_string().contains("invalid type"));
    }

    #[test]
    fn list_tables_accepts_empty_object() {
        let args: ListTablesArgs = serde_json::from_value(json!({})).unwrap();
        assert!(args.schema.is_none());
    }

    #[test]
    fn schema_marks_table_required() {
        let schema = serde_json::to_value(schemars::schema_for!(TableArgs)).unwrap();
        let required = schema["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "table"));
        assert!(!required.iter().any(|v| v == "schema"));
    }
}
