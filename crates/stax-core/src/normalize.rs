//! Row normalization.
//!
//! Drivers hand back cells as [`RawValue`]s. Different engines surface text
//! as different native types (SQLite blobs, PostgreSQL `bytea`, ...), so
//! byte sequences are decoded to text here and everything downstream only
//! deals with [`Value`].

use crate::record::{Record, ResultTable};
use crate::value::Value;

/// A cell as produced by a driver, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point.
    Float(f64),
    /// Text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl RawValue {
    /// Converts into a normalized value, decoding bytes as UTF-8 text.
    pub fn normalize(self) -> Value {
        match self {
            RawValue::Null => Value::Null,
            RawValue::Bool(b) => Value::Bool(b),
            RawValue::Int(i) => Value::Int(i),
            RawValue::Float(f) => Value::Float(f),
            RawValue::Text(s) => Value::Text(s),
            RawValue::Bytes(b) => match String::from_utf8(b) {
                Ok(s) => Value::Text(s),
                Err(e) => Value::Text(String::from_utf8_lossy(e.as_bytes()).into_owned()),
            },
        }
    }
}

/// Rows drained from one statement, in driver form.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    /// Column names in backend order.
    pub columns: Vec<String>,
    /// Row cells, positionally matching `columns`.
    pub rows: Vec<Vec<RawValue>>,
}

impl RowSet {
    /// Creates an empty row set (statements without a result).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Normalizes every row, preserving row order.
    pub fn into_table(self) -> ResultTable {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|row| normalize_row(&columns, row))
            .collect()
    }
}

/// Builds one record from a row's cells.
///
/// When a backend reports the same column name twice, the later cell wins.
pub fn normalize_row(columns: &[String], cells: Vec<RawValue>) -> Record {
    let mut record = Record::new();
    for (column, cell) in columns.iter().zip(cells) {
        record.insert(column.clone(), cell.normalize());
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_become_text() {
        assert_eq!(RawValue::Bytes(b"hello".to_vec()).normalize(), Value::from("hello"));
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let value = RawValue::Bytes(vec![b'a', 0xff, b'b']).normalize();
        assert_eq!(value, Value::from("a\u{fffd}b"));
    }

    #[test]
    fn test_scalars_pass_through() {
        assert_eq!(RawValue::Null.normalize(), Value::Null);
        assert_eq!(RawValue::Bool(true).normalize(), Value::Bool(true));
        assert_eq!(RawValue::Int(-4).normalize(), Value::Int(-4));
        assert_eq!(RawValue::Float(0.5).normalize(), Value::Float(0.5));
    }

    #[test]
    fn test_row_set_into_table() {
        let rows = RowSet {
            columns: vec!["id".to_string(), "name".to_string()],
            rows: vec![
                vec![RawValue::Int(1), RawValue::Bytes(b"Alice".to_vec())],
                vec![RawValue::Int(2), RawValue::Null],
            ],
        };

        let table = rows.into_table();
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].get("name"), Some(&Value::from("Alice")));
        assert_eq!(table[1].get("id"), Some(&Value::Int(2)));
        assert_eq!(table[1].get("name"), Some(&Value::Null));
    }

    #[test]
    fn test_duplicate_column_last_wins() {
        let columns = vec!["x".to_string(), "x".to_string()];
        let record = normalize_row(&columns, vec![RawValue::Int(1), RawValue::Int(2)]);
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("x"), Some(&Value::Int(2)));
    }
}
