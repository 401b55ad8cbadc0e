//! Raw scalar values and flat rows
//!
//! A [`Row`] is what the storage engine sees: physical column name mapped
//! to a raw [`Value`]. Nested instances never reach storage directly.

use crate::schema::ScalarType;
use crate::{Error, Result};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use std::collections::BTreeMap;

/// A raw scalar value as stored in a physical column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the value's kind, for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Text(_) => "text",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Boolean(_) => "boolean",
        }
    }

    /// Convert a JSON leaf into a raw value of the declared scalar type.
    ///
    /// `real` fields take only JSON floats: an integer literal such as `60`
    /// would come back as `60.0` and break the round trip.
    /// `path` is the logical field path, used only for error reporting.
    pub fn from_json(json: &serde_json::Value, ty: ScalarType, path: &str) -> Result<Self> {
        let value = match (json, ty) {
            (serde_json::Value::Null, _) => Some(Value::Null),
            (serde_json::Value::String(s), ScalarType::Text) => Some(Value::Text(s.clone())),
            (serde_json::Value::Number(n), ScalarType::Integer) => n.as_i64().map(Value::Integer),
            (serde_json::Value::Number(n), ScalarType::Real) if n.is_f64() => n.as_f64().map(Value::Real),
            (serde_json::Value::Bool(b), ScalarType::Boolean) => Some(Value::Boolean(*b)),
            _ => None,
        };

        value.ok_or_else(|| Error::TypeMismatch {
            path: path.to_string(),
            expected: ty.as_str().to_string(),
            found: json_kind_name(json).to_string(),
        })
    }

    /// Coerce a value read back from storage to the declared scalar type.
    ///
    /// SQLite has no boolean storage class, so booleans come back as 0/1
    /// integers; integers stored in REAL columns are widened.
    pub fn coerce(self, ty: ScalarType, column: &str) -> Result<Self> {
        let coerced = match (self, ty) {
            (Value::Null, _) => Value::Null,
            (v @ Value::Text(_), ScalarType::Text) => v,
            (v @ Value::Integer(_), ScalarType::Integer) => v,
            (v @ Value::Real(_), ScalarType::Real) => v,
            (v @ Value::Boolean(_), ScalarType::Boolean) => v,
            (Value::Integer(i), ScalarType::Real) => Value::Real(i as f64),
            (Value::Integer(0), ScalarType::Boolean) => Value::Boolean(false),
            (Value::Integer(1), ScalarType::Boolean) => Value::Boolean(true),
            (other, ty) => {
                return Err(Error::TypeMismatch {
                    path: column.to_string(),
                    expected: ty.as_str().to_string(),
                    found: other.kind_name().to_string(),
                });
            }
        };
        Ok(coerced)
    }

    /// Convert to the JSON representation used for materialized instances
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Real(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Boolean(b) => serde_json::Value::Bool(*b),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Text(s) => write!(f, "'{}'", s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Real(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Integer(i) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Owned(rusqlite::types::Value::Real(*f)),
            Value::Boolean(b) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*b as i64)),
        })
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Value::Null),
            ValueRef::Integer(i) => Ok(Value::Integer(i)),
            ValueRef::Real(f) => Ok(Value::Real(f)),
            ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                .map(|s| Value::Text(s.to_string()))
                .map_err(|e| FromSqlError::Other(Box::new(e))),
            ValueRef::Blob(_) => Err(FromSqlError::InvalidType),
        }
    }
}

pub(crate) fn json_kind_name(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(n) if n.is_f64() => "real number",
        serde_json::Value::Number(_) => "integer number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// One logical row: physical column name to raw value.
///
/// A column that is absent from the row reads as [`Value::Null`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: BTreeMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(column.into(), value.into());
    }

    /// Builder-style insert
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// True when the column is missing or holds NULL
    pub fn is_null(&self, column: &str) -> bool {
        self.values.get(column).is_none_or(Value::is_null)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
