use std::collections::HashMap;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::types::Value;

/// Column-name lookup shared by every record produced from one statement.
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    names: Arc<Vec<String>>,
    positions: Arc<HashMap<String, usize>>,
}

impl ColumnIndex {
    /// Build the lookup once per statement; rows then share it by reference count.
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        let positions = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect::<HashMap<_, _>>();
        Self {
            names: Arc::new(names),
            positions: Arc::new(positions),
        }
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of `column_name`; when a name repeats, the last column wins.
    #[must_use]
    pub fn position(&self, column_name: &str) -> Option<usize> {
        self.positions.get(column_name).copied()
    }
}

/// A row keyed by column name.
///
/// Records from the same statement share one [`ColumnIndex`], so the name
/// lookup is computed once and not per row.
#[derive(Debug, Clone)]
pub struct Record {
    columns: ColumnIndex,
    values: Vec<Value>,
}

impl Record {
    #[must_use]
    pub fn new(columns: ColumnIndex, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Get a value by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&Value> {
        self.columns
            .position(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        self.columns.names()
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Iterate `(column name, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.columns.names() == other.columns.names() && self.values == other.values
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_by_name_and_index() {
        let columns = ColumnIndex::new(vec!["a".into(), "b".into()]);
        let record = Record::new(columns, vec![Value::Int(1), Value::Text("x".into())]);
        assert_eq!(record.get("b"), Some(&Value::Text("x".into())));
        assert_eq!(record.get_by_index(0), Some(&Value::Int(1)));
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn serializes_as_an_ordered_map() -> Result<(), serde_json::Error> {
        let columns = ColumnIndex::new(vec!["id".into(), "name".into(), "pic".into()]);
        let record = Record::new(
            columns,
            vec![Value::Int(7), Value::Null, Value::Blob(vec![1, 2])],
        );
        assert_eq!(
            serde_json::to_string(&record)?,
            r#"{"id":7,"name":null,"pic":[1,2]}"#
        );
        Ok(())
    }
}
