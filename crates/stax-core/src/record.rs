//! Records, result tables and result sets.

use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// One normalized row: column name to value.
///
/// Keys are kept sorted, so iteration and serialization are deterministic.
/// The backend's column order is not retained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

/// Rows produced by one statement, in backend order.
pub type ResultTable = Vec<Record>;

/// Tables produced by one script, in statement order.
pub type ResultSet = Vec<ResultTable>;

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a column, replacing any previous value under the same name.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(column.into(), value.into());
    }

    /// Returns the value of a column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// Returns true if the record has the column.
    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no columns.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over columns in sorted order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.fields.iter()
    }

    /// Iterates over column names in sorted order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Returns a record holding this record's columns overwritten by `other`'s.
    pub fn merged(&self, other: &Record) -> Record {
        let mut fields = self.fields.clone();
        for (k, v) in &other.fields {
            fields.insert(k.clone(), v.clone());
        }
        Record { fields }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Returns the sorted union of column names across a table.
///
/// Records may carry different columns when the backend returned
/// heterogeneous rows; tabular renderers use the union as their header.
pub fn table_columns(table: &[Record]) -> Vec<String> {
    let mut columns = BTreeSet::new();
    for record in table {
        for column in record.columns() {
            columns.insert(column.to_string());
        }
    }
    columns.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces() {
        let mut record = Record::new();
        record.insert("a", 1i64);
        record.insert("a", "two");
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("a"), Some(&Value::from("two")));
    }

    #[test]
    fn test_merged_right_wins() {
        let left: Record = [("k", Value::from("a")), ("x", Value::Int(1))].into_iter().collect();
        let right: Record = [("k", Value::from("A")), ("y", Value::Int(2))].into_iter().collect();

        let merged = left.merged(&right);
        assert_eq!(merged.get("k"), Some(&Value::from("A")));
        assert_eq!(merged.get("x"), Some(&Value::Int(1)));
        assert_eq!(merged.get("y"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_columns_sorted() {
        let record: Record = [("b", 1i64), ("a", 2i64), ("c", 3i64)].into_iter().collect();
        let columns: Vec<&str> = record.columns().collect();
        assert_eq!(columns, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_table_columns_union() {
        let table = vec![
            [("id", 1i64), ("name", 0i64)].into_iter().collect::<Record>(),
            [("id", 2i64), ("email", 0i64)].into_iter().collect::<Record>(),
        ];
        assert_eq!(table_columns(&table), vec!["email", "id", "name"]);
    }
}
