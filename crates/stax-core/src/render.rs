//! Output rendering for result sets.
//!
//! Supports the flattened default, JSON, CSV and box-table output. `xml`
//! is accepted as a mode and currently renders like the default.

use std::fmt;
use std::str::FromStr;

use comfy_table::{Cell, ContentArrangement, Table};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::record::{table_columns, Record, ResultSet};
use crate::value::Value;

/// Session-wide display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// One `key: value` line per record.
    #[default]
    Default,
    /// Indented JSON.
    Json,
    /// Comma-separated values with a header line.
    Csv,
    /// Accepted for compatibility; renders like `Default`.
    Xml,
    /// Box-drawn table.
    Table,
}

impl DisplayMode {
    /// Returns the mode's name as used by `.mode`.
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Default => "default",
            DisplayMode::Json => "json",
            DisplayMode::Csv => "csv",
            DisplayMode::Xml => "xml",
            DisplayMode::Table => "table",
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "default" => Ok(DisplayMode::Default),
            "json" => Ok(DisplayMode::Json),
            "csv" => Ok(DisplayMode::Csv),
            "xml" => Ok(DisplayMode::Xml),
            "table" => Ok(DisplayMode::Table),
            other => Err(format!(
                "unknown mode '{}' (available: default, json, csv, xml, table)",
                other
            )),
        }
    }
}

/// Renders every table of a result set in the given mode.
pub fn render(result: &ResultSet, mode: DisplayMode) -> String {
    let mut output = String::new();
    for table in result {
        match mode {
            DisplayMode::Default | DisplayMode::Xml => {
                output.push_str(&format_flat(table));
                output.push_str(&row_footer(table.len()));
            }
            DisplayMode::Json => {
                output.push_str(&format_json(table));
                output.push_str(&row_footer(table.len()));
            }
            DisplayMode::Table => {
                output.push_str(&format_table(table));
                output.push_str(&row_footer(table.len()));
            }
            DisplayMode::Csv => {
                if !output.is_empty() {
                    output.push('\n');
                }
                output.push_str(&format_csv(table));
            }
        }
    }
    output
}

fn row_footer(count: usize) -> String {
    format!(
        "\n({} row{} returned)\n",
        count,
        if count == 1 { "" } else { "s" }
    )
}

/// One line per record: sorted `key: value` pairs separated by `,\t`.
fn format_flat(table: &[Record]) -> String {
    let mut output = String::new();
    for record in table {
        let pairs: Vec<String> = record.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        output.push_str(&pairs.join(",\t"));
        output.push('\n');
    }
    output
}

/// Tab-indented JSON array of objects.
fn format_json(table: &[Record]) -> String {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"\t"));
    if table.serialize(&mut ser).is_err() {
        return "[]\n".to_string();
    }
    let mut json = String::from_utf8(buf).unwrap_or_else(|_| "[]".to_string());
    json.push('\n');
    json
}

/// Header of the sorted column union, then one line per record.
fn format_csv(table: &[Record]) -> String {
    let columns = table_columns(table);
    let mut output = String::new();

    if !columns.is_empty() {
        let header: Vec<String> = columns.iter().map(|c| escape_csv(c)).collect();
        output.push_str(&header.join(","));
        output.push('\n');
    }

    for record in table {
        let values: Vec<String> = columns
            .iter()
            .map(|c| escape_csv(&csv_text(record.get(c))))
            .collect();
        output.push_str(&values.join(","));
        output.push('\n');
    }

    output
}

fn csv_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(v) => v.to_string(),
    }
}

/// Escapes a value for CSV output.
fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Box table over the sorted column union.
fn format_table(table: &[Record]) -> String {
    let columns = table_columns(table);
    if columns.is_empty() {
        return String::new();
    }

    let mut out = Table::new();
    out.set_content_arrangement(ContentArrangement::Dynamic)
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);

    out.set_header(columns.iter().map(Cell::new));
    for record in table {
        let cells: Vec<Cell> = columns
            .iter()
            .map(|c| Cell::new(record.get(c).map(Value::to_string).unwrap_or_default()))
            .collect();
        out.add_row(cells);
    }

    let mut text = out.to_string();
    text.push('\n');
    text
}
