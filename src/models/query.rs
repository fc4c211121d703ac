//! Statement payload models.
//!
//! This module defines the parameter and result types that flow through the
//! router. The router never inspects them; it only forwards them to whichever
//! connection serves the call.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Default label used when a statement is issued without a name.
pub const DEFAULT_STATEMENT_NAME: &str = "SQL";

/// Default query timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// A parameter value for parameterized queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryParam {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
    /// Binary data (base64 encoded in JSON)
    #[serde(with = "base64_bytes")]
    Bytes(Vec<u8>),
}

impl From<i64> for QueryParam {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for QueryParam {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for QueryParam {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for QueryParam {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for QueryParam {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

/// Custom serialization for binary data as base64.
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Bound parameters of a statement, positional and named.
///
/// The routing layer treats binds as an opaque payload: whatever the caller
/// passes reaches the serving connection unchanged. Whether named binds are
/// supported is up to that connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Binds {
    #[serde(default)]
    pub positional: Vec<QueryParam>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub named: BTreeMap<String, QueryParam>,
}

impl Binds {
    /// Create an empty set of binds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create binds from positional parameters.
    pub fn positional(params: impl IntoIterator<Item = QueryParam>) -> Self {
        Self {
            positional: params.into_iter().collect(),
            named: BTreeMap::new(),
        }
    }

    /// Append a positional parameter.
    pub fn with(mut self, param: impl Into<QueryParam>) -> Self {
        self.positional.push(param.into());
        self
    }

    /// Add a named parameter.
    pub fn with_named(mut self, name: impl Into<String>, param: impl Into<QueryParam>) -> Self {
        self.named.insert(name.into(), param.into());
        self
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

/// A single row keyed by column name.
pub type Record = serde_json::Map<String, JsonValue>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    /// Database-specific type (e.g., "BIGINT", "TEXT")
    pub type_name: String,
}

impl ColumnMetadata {
    /// Create new column metadata.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Rows of a statement together with column metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<ColumnMetadata>,
    /// Row values in column order.
    pub rows: Vec<Vec<JsonValue>>,
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Build a result from column names and rows (mostly useful for tests and fakes).
    pub fn from_rows(columns: &[&str], rows: Vec<Vec<JsonValue>>) -> Self {
        Self {
            columns: columns
                .iter()
                .map(|name| ColumnMetadata::new(*name, "TEXT"))
                .collect(),
            rows,
            execution_time_ms: 0,
        }
    }

    /// Get the number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Convert every row into a column-name keyed record.
    pub fn into_records(self) -> Vec<Record> {
        let names: Vec<String> = self.columns.into_iter().map(|c| c.name).collect();
        self.rows
            .into_iter()
            .map(|row| names.iter().cloned().zip(row).collect())
            .collect()
    }

    /// First column of the first row.
    pub fn into_first_value(self) -> Option<JsonValue> {
        self.rows.into_iter().next().and_then(|row| row.into_iter().next())
    }

    /// First column of every row.
    pub fn into_first_column(self) -> Vec<JsonValue> {
        self.rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .collect()
    }
}
