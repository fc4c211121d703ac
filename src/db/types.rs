//! Row decoding.
//!
//! Rows come back from the driver as `AnyRow`. Each column is classified from
//! its type name and decoded into a JSON value. When the declared type is
//! missing or misleading (SQLite expressions have no declared type), decoding
//! falls back through the supported scalar types in a fixed order.

use crate::models::{ColumnMetadata, QueryResult};
use serde_json::Value as JsonValue;
use sqlx::any::AnyRow;
use sqlx::{Column, Row, TypeInfo};

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Boolean,
    Text,
    Binary,
    Unknown,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.to_lowercase();

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    if lower.contains("int") || lower.contains("serial") {
        return TypeCategory::Integer;
    }

    if lower.contains("float")
        || lower.contains("double")
        || lower.contains("real")
        || lower.contains("numeric")
        || lower.contains("decimal")
    {
        return TypeCategory::Float;
    }

    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }

    if lower.contains("char") || lower.contains("text") || lower.contains("clob") {
        return TypeCategory::Text;
    }

    TypeCategory::Unknown
}

/// Encode binary data as a JSON string.
///
/// If `decode_binary` is true, valid UTF-8 is returned as text. Everything
/// else is base64 encoded.
pub fn decode_binary_value(bytes: &[u8], decode_binary: bool) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    if decode_binary {
        match std::str::from_utf8(bytes) {
            Ok(s) => JsonValue::String(s.to_string()),
            Err(_) => JsonValue::String(STANDARD.encode(bytes)),
        }
    } else {
        JsonValue::String(STANDARD.encode(bytes))
    }
}

fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

fn decode_bool(row: &AnyRow, idx: usize) -> Option<JsonValue> {
    match row.try_get::<Option<bool>, _>(idx) {
        Ok(v) => Some(v.map(JsonValue::Bool).unwrap_or(JsonValue::Null)),
        Err(_) => None,
    }
}

fn decode_integer(row: &AnyRow, idx: usize) -> Option<JsonValue> {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return Some(v.map(JsonValue::from).unwrap_or(JsonValue::Null));
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
        return Some(v.map(JsonValue::from).unwrap_or(JsonValue::Null));
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
        return Some(v.map(JsonValue::from).unwrap_or(JsonValue::Null));
    }
    None
}

fn decode_float(row: &AnyRow, idx: usize) -> Option<JsonValue> {
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return Some(v.map(float_value).unwrap_or(JsonValue::Null));
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
        return Some(v.map(|f| float_value(f as f64)).unwrap_or(JsonValue::Null));
    }
    None
}

fn decode_text(row: &AnyRow, idx: usize) -> Option<JsonValue> {
    match row.try_get::<Option<String>, _>(idx) {
        Ok(v) => Some(v.map(JsonValue::String).unwrap_or(JsonValue::Null)),
        Err(_) => None,
    }
}

fn decode_binary(row: &AnyRow, idx: usize) -> Option<JsonValue> {
    match row.try_get::<Option<Vec<u8>>, _>(idx) {
        Ok(v) => Some(
            v.map(|bytes| decode_binary_value(&bytes, false))
                .unwrap_or(JsonValue::Null),
        ),
        Err(_) => None,
    }
}

/// Decode a single column, trying the category's decoder first.
pub fn decode_column(row: &AnyRow, idx: usize, category: TypeCategory) -> JsonValue {
    let first = match category {
        TypeCategory::Boolean => decode_bool(row, idx),
        TypeCategory::Integer => decode_integer(row, idx),
        TypeCategory::Float => decode_float(row, idx),
        TypeCategory::Text => decode_text(row, idx),
        TypeCategory::Binary => decode_binary(row, idx),
        TypeCategory::Unknown => None,
    };

    first
        .or_else(|| decode_bool(row, idx))
        .or_else(|| decode_integer(row, idx))
        .or_else(|| decode_float(row, idx))
        .or_else(|| decode_text(row, idx))
        .or_else(|| decode_binary(row, idx))
        .unwrap_or_else(|| {
            tracing::warn!(column = idx, "Failed to decode column value");
            JsonValue::Null
        })
}

/// Trait for converting database rows to JSON.
pub trait RowToJson {
    fn to_json_values(&self) -> Vec<JsonValue>;
    fn get_column_metadata(&self) -> Vec<ColumnMetadata>;
}

impl RowToJson for AnyRow {
    fn to_json_values(&self) -> Vec<JsonValue> {
        self.columns()
            .iter()
            .map(|col| {
                let category = categorize_type(col.type_info().name());
                decode_column(self, col.ordinal(), category)
            })
            .collect()
    }

    fn get_column_metadata(&self) -> Vec<ColumnMetadata> {
        self.columns()
            .iter()
            .map(|col| ColumnMetadata::new(col.name(), col.type_info().name()))
            .collect()
    }
}

/// Build a [`QueryResult`] from decoded rows.
pub fn rows_to_result<R: RowToJson>(rows: &[R], execution_time_ms: u64) -> QueryResult {
    let columns = rows
        .first()
        .map(RowToJson::get_column_metadata)
        .unwrap_or_default();

    QueryResult {
        columns,
        rows: rows.iter().map(RowToJson::to_json_values).collect(),
        execution_time_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_type() {
        assert_eq!(categorize_type("BIGINT"), TypeCategory::Integer);
        assert_eq!(categorize_type("INTEGER"), TypeCategory::Integer);
        assert_eq!(categorize_type("BOOLEAN"), TypeCategory::Boolean);
        assert_eq!(categorize_type("DOUBLE"), TypeCategory::Float);
        assert_eq!(categorize_type("REAL"), TypeCategory::Float);
        assert_eq!(categorize_type("NUMERIC"), TypeCategory::Float);
        assert_eq!(categorize_type("VARCHAR"), TypeCategory::Text);
        assert_eq!(categorize_type("TEXT"), TypeCategory::Text);
        assert_eq!(categorize_type("BLOB"), TypeCategory::Binary);
        assert_eq!(categorize_type("bytea"), TypeCategory::Binary);
        assert_eq!(categorize_type("NULL"), TypeCategory::Unknown);
    }

    #[test]
    fn test_decode_binary_value_with_valid_utf8() {
        let bytes = b"hello world";
        let result = decode_binary_value(bytes, true);
        assert_eq!(result, JsonValue::String("hello world".to_string()));

        let result = decode_binary_value(bytes, false);
        assert_eq!(result, JsonValue::String("aGVsbG8gd29ybGQ=".to_string()));
    }

    #[test]
    fn test_decode_binary_value_with_invalid_utf8() {
        let bytes: &[u8] = &[0xFF, 0xFE, 0x00, 0x01];
        let result = decode_binary_value(bytes, true);
        assert_eq!(result, JsonValue::String("//4AAQ==".to_string()));
    }

    #[test]
    fn test_float_value_non_finite() {
        assert_eq!(float_value(1.5), serde_json::json!(1.5));
        assert_eq!(float_value(f64::NAN), JsonValue::String("NaN".to_string()));
    }

    #[test]
    fn test_rows_to_result_empty() {
        let rows: Vec<AnyRow> = Vec::new();
        let result = rows_to_result(&rows, 3);
        assert!(result.columns.is_empty());
        assert!(result.rows.is_empty());
        assert_eq!(result.execution_time_ms, 3);
    }
}
