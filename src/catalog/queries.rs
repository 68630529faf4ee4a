//! SQL Server catalog query templates.
//!
//! Filter values are referenced as `@schema` / `@table` and bound by the
//! executor; nothing caller-supplied is ever concatenated into these strings.

use crate::db::QueryTemplate;

pub const LIST_SCHEMAS: QueryTemplate = QueryTemplate {
    name: "list_schemas",
    params: &[],
    sql: "SELECT name, schema_id FROM sys.schemas",
};

pub const LIST_TABLES: QueryTemplate = QueryTemplate {
    name: "list_tables",
    params: &[],
    sql: "SELECT TABLE_SCHEMA, TABLE_NAME, TABLE_TYPE FROM INFORMATION_SCHEMA.TABLES",
};

pub const LIST_TABLES_IN_SCHEMA: QueryTemplate = QueryTemplate {
    name: "list_tables_in_schema",
    params: &["schema"],
    sql: "SELECT TABLE_SCHEMA, TABLE_NAME, TABLE_TYPE FROM INFORMATION_SCHEMA.TABLES \
          WHERE TABLE_SCHEMA = @schema",
};

pub const DESCRIBE_TABLE: QueryTemplate = QueryTemplate {
    name: "describe_table",
    params: &["schema", "table"],
    sql: r#"
        SELECT
          COLUMN_NAME,
          DATA_TYPE,
          CHARACTER_MAXIMUM_LENGTH,
          IS_NULLABLE,
          COLUMN_DEFAULT
        FROM INFORMATION_SCHEMA.COLUMNS
        WHERE TABLE_SCHEMA = @schema AND TABLE_NAME = @table
        ORDER BY ORDINAL_POSITION
    "#,
};

pub const LIST_INDEXES: QueryTemplate = QueryTemplate {
    name: "list_indexes",
    params: &["schema", "table"],
    sql: r#"
        SELECT
          i.name AS IndexName,
          i.type_desc AS IndexType,
          c.name AS ColumnName,
          ic.is_included_column,
          i.is_unique,
          i.is_primary_key
        FROM sys.indexes i
        INNER JOIN sys.index_columns ic ON i.object_id = ic.object_id AND i.index_id = ic.index_id
        INNER JOIN sys.columns c ON ic.object_id = c.object_id AND ic.column_id = c.column_id
        INNER JOIN sys.tables t ON i.object_id = t.object_id
        INNER JOIN sys.schemas s ON t.schema_id = s.schema_id
        WHERE s.name = @schema AND t.name = @table
        ORDER BY i.name, ic.key_ordinal
    "#,
};

pub const LIST_FOREIGN_KEYS: QueryTemplate = QueryTemplate {
    name: "list_foreign_keys",
    params: &["schema", "table"],
    sql: r#"
        SELECT
          fk.name AS ForeignKeyName,
          tp.name AS ParentTable,
          cp.name AS ParentColumn,
          tr.name AS ReferencedTable,
          cr.name AS ReferencedColumn
        FROM sys.foreign_keys fk
        INNER JOIN sys.foreign_key_columns fkc ON fk.object_id = fkc.constraint_object_id
        INNER JOIN sys.tables tp ON fkc.parent_object_id = tp.object_id
        INNER JOIN sys.columns cp ON fkc.parent_object_id = cp.object_id AND fkc.parent_column_id = cp.column_id
        INNER JOIN sys.tables tr ON fkc.referenced_object_id = tr.object_id
        INNER JOIN sys.columns cr ON fkc.referenced_object_id = cr.object_id AND fkc.referenced_column_id = cr.column_id
        INNER JOIN sys.schemas s ON tp.schema_id = s.schema_id
        WHERE s.name = @schema AND tp.name = @table
    "#,
};

pub const LIST_PRIMARY_KEY_COLUMNS: QueryTemplate = QueryTemplate {
    name: "list_primary_key_columns",
    params: &["schema", "table"],
    sql: r#"
        SELECT
          c.name AS ColumnName
        FROM sys.indexes i
        INNER JOIN sys.index_columns ic ON i.object_id = ic.object_id AND i.index_id = ic.index_id
        INNER JOIN sys.columns c ON ic.object_id = c.object_id AND ic.column_id = c.column_id
        INNER JOIN sys.tables t ON i.object_id = t.object_id
        INNER JOIN sys.schemas s ON t.schema_id = s.schema_id
        WHERE s.name = @schema AND t.name = @table AND i.is_primary_key = 1
        ORDER BY ic.key_ordinal
    "#,
};

pub const TABLE_EXISTS: QueryTemplate = QueryTemplate {
    name: "table_exists",
    params: &["schema", "table"],
    sql: "SELECT COUNT(*) AS table_count FROM INFORMATION_SCHEMA.TABLES \
          WHERE TABLE_SCHEMA = @schema AND TABLE_NAME = @table",
};

/// Every template, for tests that check the whole set.
pub const ALL: &[QueryTemplate] = &[
    LIST_SCHEMAS,
    LIST_TABLES,
    LIST_TABLES_IN_SCHEMA,
    DESCRIBE_TABLE,
    LIST_INDEXES,
    LIST_FOREIGN_KEYS,
    LIST_PRIMARY_KEY_COLUMNS,
    TABLE_EXISTS,
];
