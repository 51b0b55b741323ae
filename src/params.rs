use std::collections::{BTreeMap, HashMap};

use rusqlite::Statement;
use serde_json::Value as JsonValue;

use crate::error::{LiteDbError, Phase};
use crate::types::Value;

/// Placeholder sigils SQLite accepts for named parameters, in lookup order.
const SIGILS: [char; 3] = [':', '@', '$'];

/// Arguments for one call: nothing, values by position, or values by placeholder name.
///
/// Named keys may carry their sigil or not; `"bar"` and `":bar"` bind the same placeholder.
/// ```rust
/// use litequery::prelude::*;
///
/// let positional = Params::from(vec![Value::Int(1), Value::Text("a".into())]);
/// let named = Params::named([("bar", 42)]);
/// # let _ = (positional, named);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Params {
    #[default]
    Empty,
    Positional(Vec<Value>),
    Named(Vec<(String, Value)>),
}

impl Params {
    /// Build a name-indexed parameter set.
    pub fn named<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Params::Named(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Convert loosely-typed host input into a parameter set.
    ///
    /// An object binds by name, an array by position, and a lone scalar as the
    /// single positional value.
    ///
    /// # Errors
    /// Returns `LiteDbError::BindError` when any value is not a bindable scalar.
    pub fn from_json(value: JsonValue) -> Result<Self, LiteDbError> {
        match value {
            JsonValue::Object(map) => Ok(Params::Named(
                map.into_iter()
                    .map(|(k, v)| Value::try_from(v).map(|v| (k, v)))
                    .collect::<Result<_, _>>()?,
            )),
            JsonValue::Array(items) => Ok(Params::Positional(
                items
                    .into_iter()
                    .map(Value::try_from)
                    .collect::<Result<_, _>>()?,
            )),
            scalar => Ok(Params::Positional(vec![Value::try_from(scalar)?])),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Params::Empty => true,
            Params::Positional(values) => values.is_empty(),
            Params::Named(pairs) => pairs.is_empty(),
        }
    }
}

impl From<()> for Params {
    fn from((): ()) -> Self {
        Params::Empty
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Params::Positional(values)
    }
}

impl From<&[Value]> for Params {
    fn from(values: &[Value]) -> Self {
        Params::Positional(values.to_vec())
    }
}

impl<const N: usize> From<[Value; N]> for Params {
    fn from(values: [Value; N]) -> Self {
        Params::Positional(values.into())
    }
}

impl From<Value> for Params {
    fn from(value: Value) -> Self {
        Params::Positional(vec![value])
    }
}

impl<K: Into<String>> From<HashMap<K, Value>> for Params {
    fn from(map: HashMap<K, Value>) -> Self {
        Params::named(map)
    }
}

impl<K: Into<String>> From<BTreeMap<K, Value>> for Params {
    fn from(map: BTreeMap<K, Value>) -> Self {
        Params::named(map)
    }
}

/// Strip one leading sigil from a parameter key.
pub(crate) fn normalize_key(key: &str) -> &str {
    key.strip_prefix(SIGILS).unwrap_or(key)
}

fn resolve_named(stmt: &Statement<'_>, key: &str) -> Result<usize, LiteDbError> {
    let bare = normalize_key(key);
    for sigil in SIGILS {
        let candidate = format!("{sigil}{bare}");
        if let Some(idx) = stmt
            .parameter_index(&candidate)
            .map_err(|e| LiteDbError::classify(e, Phase::Bind))?
        {
            return Ok(idx);
        }
    }
    Err(LiteDbError::BindError(format!("no such parameter: {key}")))
}

fn bind_one(stmt: &mut Statement<'_>, idx: usize, value: &Value) -> Result<(), LiteDbError> {
    stmt.raw_bind_parameter(idx, value)
        .map_err(|e| LiteDbError::classify(e, Phase::Bind))
}

/// Apply `params` to every placeholder of `stmt`.
///
/// The parameter set has to cover the statement's placeholders exactly; a
/// surplus, a gap or an unknown name fails here, before any row is fetched.
///
/// # Errors
/// Returns `LiteDbError::BindError` on a cardinality or name mismatch.
pub fn bind(stmt: &mut Statement<'_>, params: &Params) -> Result<(), LiteDbError> {
    let expected = stmt.parameter_count();
    match params {
        Params::Empty => {
            if expected != 0 {
                return Err(LiteDbError::BindError(format!(
                    "expected {expected} parameters, got 0"
                )));
            }
        }
        Params::Positional(values) => {
            if values.len() != expected {
                return Err(LiteDbError::BindError(format!(
                    "expected {expected} parameters, got {}",
                    values.len()
                )));
            }
            for (i, value) in values.iter().enumerate() {
                bind_one(stmt, i + 1, value)?;
            }
        }
        Params::Named(pairs) => {
            let mut covered = vec![false; expected];
            for (key, value) in pairs {
                let idx = resolve_named(stmt, key)?;
                bind_one(stmt, idx, value)?;
                covered[idx - 1] = true;
            }
            if let Some(missing) = covered.iter().position(|bound| !bound) {
                let name = stmt
                    .parameter_name(missing + 1)
                    .map_or_else(|| format!("?{}", missing + 1), str::to_owned);
                return Err(LiteDbError::BindError(format!(
                    "missing value for parameter {name}"
                )));
            }
        }
    }
    Ok(())
}
