use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, ValueRef};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::LiteDbError;

/// Scalar values that can be bound as parameters or read back from a row.
///
/// The set is closed: anything outside it has to be converted by the caller
/// before it reaches the binder.
/// ```rust
/// use litequery::prelude::*;
///
/// let params = vec![Value::Int(1), Value::Text("alice".into()), Value::Null];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text value
    Text(String),
    /// Binary data
    Blob(Vec<u8>),
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        if let Value::Int(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            Value::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let Value::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let Value::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Copy a column value out of the engine.
    ///
    /// TEXT that is not valid UTF-8 comes back as [`Value::Blob`] with its bytes unchanged.
    pub(crate) fn from_value_ref(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Int(i),
            ValueRef::Real(f) => Value::Float(f),
            ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => Value::Text(text.to_owned()),
                Err(_) => Value::Blob(bytes.to_vec()),
            },
            ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(match self {
            Value::Null => ValueRef::Null,
            Value::Int(i) => ValueRef::Integer(*i),
            Value::Float(f) => ValueRef::Real(*f),
            Value::Text(s) => ValueRef::Text(s.as_bytes()),
            Value::Blob(b) => ValueRef::Blob(b),
        }))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Blob(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Blob(value.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl TryFrom<JsonValue> for Value {
    type Error = LiteDbError;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        match value {
            JsonValue::Null => Ok(Value::Null),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Value::Float(f))
                } else {
                    Err(LiteDbError::BindError(format!(
                        "cannot bind parameter of this type: {n}"
                    )))
                }
            }
            JsonValue::String(s) => Ok(Value::Text(s)),
            other @ (JsonValue::Bool(_) | JsonValue::Array(_) | JsonValue::Object(_)) => Err(
                LiteDbError::BindError(format!("cannot bind parameter of this type: {other}")),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_scalars_convert() -> Result<(), LiteDbError> {
        assert_eq!(Value::try_from(json!(null))?, Value::Null);
        assert_eq!(Value::try_from(json!(7))?, Value::Int(7));
        assert_eq!(Value::try_from(json!(1.5))?, Value::Float(1.5));
        assert_eq!(Value::try_from(json!("hi"))?, Value::Text("hi".into()));
        Ok(())
    }

    #[test]
    fn json_compounds_and_bools_are_rejected() {
        for bad in [json!(true), json!([1, 2]), json!({"a": 1})] {
            let err = Value::try_from(bad).unwrap_err();
            assert!(
                matches!(err, LiteDbError::BindError(ref m) if m.starts_with("cannot bind parameter of this type"))
            );
        }
    }

    #[test]
    fn invalid_utf8_text_comes_back_as_blob() -> Result<(), LiteDbError> {
        let conn = rusqlite::Connection::open_in_memory()?;
        let (text, bad) = conn.query_row("select 'ok', cast(x'ff41' as text)", [], |row| {
            Ok((
                Value::from_value_ref(row.get_ref(0)?),
                Value::from_value_ref(row.get_ref(1)?),
            ))
        })?;
        assert_eq!(text, Value::Text("ok".into()));
        assert_eq!(bad, Value::Blob(vec![0xff, 0x41]));
        Ok(())
    }

    #[test]
    fn option_maps_none_to_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }
}
