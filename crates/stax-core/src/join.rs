//! Equality join over stored result tables.
//!
//! A nested-loop inner join: every pair of rows is compared, so the cost is
//! O(|left| * |right| * |columns|). Result tables are small interactive
//! captures, which keeps this acceptable; large inputs will be slow.

use crate::record::{Record, ResultTable};

/// Joins two tables on the listed columns.
///
/// Two rows match when, for every column, both carry a non-null value and
/// the values' trimmed, lowercased text is equal. Matching text is the only
/// test, so the integer `1` joins the text `"1"`. A matched pair yields the
/// left row's columns overwritten by the right row's. Output order follows
/// the left table, then the right table. No columns means every pair
/// matches.
pub fn join(left: &[Record], right: &[Record], columns: &[String]) -> ResultTable {
    let mut joined = Vec::new();

    for l in left {
        let Some(left_keys) = join_keys(l, columns) else {
            continue;
        };
        for r in right {
            if join_keys(r, columns).as_ref() == Some(&left_keys) {
                joined.push(l.merged(r));
            }
        }
    }

    joined
}

/// Returns the normalized key of each join column, or `None` when any column
/// is missing or null.
fn join_keys(record: &Record, columns: &[String]) -> Option<Vec<String>> {
    columns
        .iter()
        .map(|column| record.get(column).and_then(|v| v.join_key()))
        .collect()
}
