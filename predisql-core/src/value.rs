//! Value types for SQL parameters and row cells

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A driver-agnostic SQL scalar, used both as a parameter value and as a row cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 32-bit integer
    I32(i32),
    /// 64-bit integer
    I64(i64),
    /// 32-bit float
    F32(f32),
    /// 64-bit float
    F64(f64),
    /// String value
    String(String),
    /// Bytes value
    Bytes(Vec<u8>),
    /// Timestamp without time zone
    DateTime(NaiveDateTime),
    /// JSON value
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the SQL type name for this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::I32(_) => "INTEGER",
            Value::I64(_) => "BIGINT",
            Value::F32(_) => "REAL",
            Value::F64(_) => "DOUBLE PRECISION",
            Value::String(_) => "TEXT",
            Value::Bytes(_) => "BYTEA",
            Value::DateTime(_) => "TIMESTAMP",
            Value::Json(_) => "JSON",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view of the value, widening `I32`
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I32(i) => Some(i64::from(*i)),
            Value::I64(i) => Some(*i),
            _ => None,
        }
    }

    /// Float view of the value, widening `F32` and integers
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F32(f) => Some(f64::from(*f)),
            Value::F64(f) => Some(*f),
            Value::I32(i) => Some(f64::from(*i)),
            Value::I64(i) => Some(*i as f64),
            _ => None,
        }
    }
}

/// Scalars that map one-to-one onto a variant
macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(val: $ty) -> Self {
                    Value::$variant(val)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    String => String,
    Vec<u8> => Bytes,
    NaiveDateTime => DateTime,
    serde_json::Value => Json,
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<&str> for Value {
    fn from(val: &str) -> Self {
        Value::String(val.to_string())
    }
}

impl From<&String> for Value {
    fn from(val: &String) -> Self {
        Value::String(val.clone())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

/// Conversion from a row cell into a Rust value
pub trait FromValue: Sized {
    /// Name used in decode errors
    fn expected() -> &'static str;

    fn from_value(value: &Value) -> Option<Self>;

    /// Decode the cell of `column`, reporting a [`Error::Decode`] on mismatch
    fn decode(column: &str, value: &Value) -> Result<Self> {
        Self::from_value(value)
            .ok_or_else(|| Error::decode(column, Self::expected(), value.type_name()))
    }
}

impl FromValue for bool {
    fn expected() -> &'static str {
        "bool"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            // SQLite and SQL Server hand booleans back as integers
            Value::I32(i) => Some(*i != 0),
            Value::I64(i) => Some(*i != 0),
            _ => None,
        }
    }
}

impl FromValue for i32 {
    fn expected() -> &'static str {
        "i32"
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64().and_then(|i| i32::try_from(i).ok())
    }
}

impl FromValue for i64 {
    fn expected() -> &'static str {
        "i64"
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64()
    }
}

impl FromValue for f32 {
    fn expected() -> &'static str {
        "f32"
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64().map(|f| f as f32)
    }
}

impl FromValue for f64 {
    fn expected() -> &'static str {
        "f64"
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FromValue for String {
    fn expected() -> &'static str {
        "string"
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromValue for Vec<u8> {
    fn expected() -> &'static str {
        "bytes"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bytes(b) => Some(b.clone()),
            _ => None,
        }
    }
}

impl FromValue for NaiveDateTime {
    fn expected() -> &'static str {
        "datetime"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::DateTime(dt) => Some(*dt),
            // Drivers without a native timestamp type return text
            Value::String(s) => NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
                .ok(),
            _ => None,
        }
    }
}

impl FromValue for serde_json::Value {
    fn expected() -> &'static str {
        "json"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Json(j) => Some(j.clone()),
            Value::String(s) => serde_json::from_str(s).ok(),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn expected() -> &'static str {
        T::expected()
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Text layout used when a timestamp travels as a string
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_value_creation() {
        assert_eq!(Value::from(42i32), Value::I32(42));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from("hello"), Value::String("hello".to_string()));
        assert_eq!(Value::from(()), Value::Null);
        assert_eq!(Value::from(vec![1u8, 2]), Value::Bytes(vec![1, 2]));
        assert_eq!(Value::from(serde_json::json!({"a": 1})).type_name(), "JSON");
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(Some(42i32)), Value::I32(42));
        assert_eq!(Value::from(None::<i32>), Value::Null);
    }

    #[test]
    fn test_is_null() {
        assert!(Value::Null.is_null());
        assert!(!Value::I32(42).is_null());
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::I32(42).type_name(), "INTEGER");
        assert_eq!(Value::String("test".to_string()).type_name(), "TEXT");
        assert_eq!(Value::Bool(true).type_name(), "BOOLEAN");
        assert_eq!(Value::Null.type_name(), "NULL");
    }

    #[test]
    fn test_integer_widening_and_narrowing() {
        assert_eq!(i64::from_value(&Value::I32(7)), Some(7));
        assert_eq!(i32::from_value(&Value::I64(7)), Some(7));
        assert_eq!(i32::from_value(&Value::I64(i64::MAX)), None);
        assert_eq!(bool::from_value(&Value::I64(1)), Some(true));
    }

    #[test]
    fn test_optional_decode() {
        assert_eq!(Option::<String>::from_value(&Value::Null), Some(None));
        assert_eq!(
            Option::<String>::from_value(&Value::from("x")),
            Some(Some("x".to_string()))
        );
        assert_eq!(Option::<String>::from_value(&Value::I32(1)), None);
    }

    #[test]
    fn test_datetime_from_text() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(12, 30, 0))
            .unwrap();
        let parsed = NaiveDateTime::from_value(&Value::from("2024-03-01 12:30:00")).unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_decode_reports_column() {
        let err = i32::decode("Age", &Value::from("old")).unwrap_err();
        assert_eq!(err.to_string(), "Cannot decode column 'Age' as i32: found TEXT");
    }
}
