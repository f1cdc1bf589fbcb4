//! Scalar attribute values attached to graph nodes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// A node attribute. Always a primitive: nested maps and lists are carried as
/// JSON-encoded strings.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Long(i64),
    Float(f64),
    String(String),
}

impl AttrValue {
    /// Convert a raw JSON value, serializing objects and arrays to a JSON
    /// string.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => AttrValue::Null,
            Value::Bool(b) => AttrValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => AttrValue::Long(i),
                None => AttrValue::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => AttrValue::String(s.clone()),
            Value::Array(_) | Value::Object(_) => AttrValue::String(value.to_string()),
        }
    }

    /// Credentials report cells are strings; `"true"`/`"false"` (any case)
    /// become booleans and `"N/A"` becomes null.
    pub fn from_report_cell(value: &Value) -> Self {
        match value {
            Value::String(s) if s.eq_ignore_ascii_case("true") => AttrValue::Bool(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => AttrValue::Bool(false),
            Value::String(s) if s == "N/A" => AttrValue::Null,
            other => AttrValue::from_json(other),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::String(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::String(s)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        AttrValue::Long(n)
    }
}
