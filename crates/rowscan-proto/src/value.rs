//! Column values as produced by a cursor.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A single column value of the current row.
///
/// Drivers translate their wire representation into this enum and hand it to
/// the scan targets of a row. Arrays are typed (e.g. `Int64Array`) so that
/// natively scannable array targets never see mixed element kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 32-bit floating point.
    Float32(f32),
    /// 64-bit floating point.
    Float64(f64),
    /// UTF-8 string.
    String(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Structured document (JSON text).
    Json(String),
    /// Array of booleans.
    BoolArray(Vec<bool>),
    /// Array of 32-bit integers.
    Int32Array(Vec<i32>),
    /// Array of 64-bit integers.
    Int64Array(Vec<i64>),
    /// Array of 64-bit floats.
    Float64Array(Vec<f64>),
    /// Array of strings.
    StringArray(Vec<String>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    /// Short name of this value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Json(_) => "json",
            Value::BoolArray(_) => "bool[]",
            Value::Int32Array(_) => "int32[]",
            Value::Int64Array(_) => "int64[]",
            Value::Float64Array(_) => "float64[]",
            Value::StringArray(_) => "string[]",
        }
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64, widening 32-bit integers.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(i) => Some(*i),
            Value::Int32(i) => Some(*i as i64),
            _ => None,
        }
    }

    /// Try to get as f64, widening 32-bit floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(f) => Some(*f),
            Value::Float32(f) => Some(*f as f64),
            _ => None,
        }
    }

    /// Try to get as string reference. Document columns count as text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Json(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as bytes reference.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Convert to a JSON document.
    ///
    /// Document columns are parsed; bytes become an array of numbers.
    pub fn to_json(&self) -> Result<serde_json::Value, Error> {
        use serde_json::Value as Json;

        let json = match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int32(i) => Json::from(*i),
            Value::Int64(i) => Json::from(*i),
            Value::Float32(f) => Json::from(*f as f64),
            Value::Float64(f) => Json::from(*f),
            Value::String(s) => Json::String(s.clone()),
            Value::Bytes(b) => Json::from(b.clone()),
            Value::Json(s) => serde_json::from_str(s)?,
            Value::BoolArray(v) => Json::from(v.clone()),
            Value::Int32Array(v) => Json::from(v.clone()),
            Value::Int64Array(v) => Json::from(v.clone()),
            Value::Float64Array(v) => Json::from(v.clone()),
            Value::StringArray(v) => Json::from(v.clone()),
        };
        Ok(json)
    }
}

// Conversion implementations
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::StringArray(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_accessors() {
        assert!(Value::Null.is_null());
        assert!(!Value::Bool(true).is_null());

        assert_eq!(Value::Int32(42).as_i64(), Some(42));
        assert_eq!(Value::Float32(1.5).as_f64(), Some(1.5));
        assert_eq!(Value::Json("{}".into()).as_str(), Some("{}"));
        assert_eq!(Value::String("x".into()).as_bytes(), None);
    }

    #[test]
    fn test_value_conversions() {
        let v: Value = "hello".into();
        assert_eq!(v, Value::String("hello".into()));

        let v: Value = None::<i32>.into();
        assert_eq!(v, Value::Null);

        let v: Value = json!({"key": "key val"}).into();
        assert_eq!(v.kind(), "json");
    }

    #[test]
    fn test_to_json() {
        assert_eq!(Value::Int64(7).to_json().unwrap(), json!(7));
        assert_eq!(
            Value::Json(r#"{"key": "key val"}"#.into()).to_json().unwrap(),
            json!({"key": "key val"})
        );
        assert_eq!(
            Value::StringArray(vec!["a".into(), "b".into()]).to_json().unwrap(),
            json!(["a", "b"])
        );
        assert_eq!(Value::Bytes(vec![1, 2]).to_json().unwrap(), json!([1, 2]));
        assert!(Value::Json("{oops".into()).to_json().is_err());
    }
}
