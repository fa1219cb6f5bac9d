use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::core::Value;

/// One fetched or bound row, in resolved column order.
pub type Row = Vec<Value>;

/// Named statement parameters, as handed to the storage backend.
pub type Params = BTreeMap<String, Value>;

/// Storage type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Integer,
    Float,
    Text,
    Boolean,
    Timestamp,
}

impl DataType {
    /// Default SQL column type for this data type.
    pub fn sql_type(&self) -> &'static str {
        match self {
            Self::Integer => "INT",
            Self::Float => "DOUBLE PRECISION",
            Self::Text => "VARCHAR",
            Self::Boolean => "BOOL",
            Self::Timestamp => "TIMESTAMPTZ",
        }
    }

    pub fn is_compatible(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Integer, Value::Integer(_)) => true,
            (Self::Float, Value::Float(_)) => true,
            (Self::Float, Value::Integer(_)) => true,
            (Self::Text, Value::Text(_)) => true,
            (Self::Boolean, Value::Boolean(_)) => true,
            (Self::Timestamp, Value::Timestamp(_)) => true,
            _ => false,
        }
    }

    /// Decode a JSON field into a value of this type. Timestamps accept
    /// RFC 3339 strings, floats accept whole numbers.
    pub fn value_from_json(&self, json: &serde_json::Value) -> Option<Value> {
        if json.is_null() {
            return Some(Value::Null);
        }
        match self {
            Self::Integer => json.as_i64().map(Value::Integer),
            Self::Float => json.as_f64().map(Value::Float),
            Self::Text => json.as_str().map(Value::from),
            Self::Boolean => json.as_bool().map(Value::Boolean),
            Self::Timestamp => json
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| Value::Timestamp(t.with_timezone(&Utc))),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "INTEGER"),
            Self::Float => write!(f, "FLOAT"),
            Self::Text => write!(f, "TEXT"),
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Timestamp => write!(f, "TIMESTAMP"),
        }
    }
}
