//! Conversion of driver column data into JSON values.

use serde_json::{Number, Value};
use tiberius::ColumnData;

use super::Row;

/// Convert a single column value. SQL `NULL` becomes `Value::Null`.
pub fn column_value(data: ColumnData<'static>) -> Value {
    match data {
        ColumnData::U8(v) => v.map_or(Value::Null, Value::from),
        ColumnData::I16(v) => v.map_or(Value::Null, Value::from),
        ColumnData::I32(v) => v.map_or(Value::Null, Value::from),
        ColumnData::I64(v) => v.map_or(Value::Null, Value::from),
        ColumnData::F32(v) => v
            .and_then(|f| Number::from_f64(f64::from(f)))
            .map_or(Value::Null, Value::Number),
        ColumnData::F64(v) => v.and_then(Number::from_f64).map_or(Value::Null, Value::Number),
        ColumnData::Bit(v) => v.map_or(Value::Null, Value::Bool),
        ColumnData::String(v) => v.map_or(Value::Null, |s| Value::String(s.into_owned())),
        ColumnData::Guid(v) => v.map_or(Value::Null, |g| Value::String(g.to_string())),
        ColumnData::Numeric(v) => v.map_or(Value::Null, |n| Value::String(n.to_string())),
        ColumnData::Binary(v) => v.map_or(Value::Null, |bytes| {
            Value::String(bytes.iter().map(|b| format!("{b:02X}")).collect())
        }),
        // Catalog views never return temporal or XML data for the queries
        // issued here; render the driver's representation rather than fail.
        other => Value::String(format!("{other:?}")),
    }
}

/// Convert a driver row into an ordered column-name mapping.
pub fn row_to_map(row: tiberius::Row) -> Row {
    let names: Vec<String> = row
        .columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect();

    names
        .into_iter()
        .zip(row)
        .map(|(name, data)| (name, column_value(data)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[test]
    fn nulls_map_to_json_null() {
        assert_eq!(column_value(ColumnData::I32(None)), Value::Null);
        assert_eq!(column_value(ColumnData::String(None)), Value::Null);
        assert_eq!(column_value(ColumnData::Bit(None)), Value::Null);
    }

    #[test]
    fn scalars_keep_their_json_type() {
        assert_eq!(column_value(ColumnData::I32(Some(-1))), Value::from(-1));
        assert_eq!(column_value(ColumnData::I16(Some(50))), Value::from(50));
        assert_eq!(column_value(ColumnData::Bit(Some(true))), Value::Bool(true));
        assert_eq!(
            column_value(ColumnData::String(Some(Cow::Borrowed("dbo")))),
            Value::String("dbo".to_string())
        );
    }

    #[test]
    fn binary_renders_as_hex() {
        let data = ColumnData::Binary(Some(Cow::Owned(vec![0x0a, 0xff])));
        assert_eq!(column_value(data), Value::String("0AFF".to_string()));
    }
}
