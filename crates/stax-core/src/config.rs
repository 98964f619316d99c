//! Database connection entries.
//!
//! Each logical database is described by a driver identifier and a
//! connection-string template. The template may reference sibling fields
//! with `$key` placeholders:
//!
//! ```toml
//! [databases.warehouse]
//! driver = "postgres"
//! connstr = "host=$host user=$user password=$password dbname=$dbname"
//! host = "10.0.0.5"
//! user = "analyst"
//! password = "secret"
//! dbname = "dw"
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Connection entry for one logical database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSpec {
    /// Driver identifier (`sqlite`, `postgres`, ...).
    #[serde(alias = "pkg")]
    pub driver: String,

    /// Connection-string template.
    pub connstr: String,

    /// Sibling fields available to `$key` placeholders.
    #[serde(flatten)]
    pub params: BTreeMap<String, JsonValue>,
}

impl DatabaseSpec {
    /// Creates an entry with no extra fields.
    pub fn new(driver: impl Into<String>, connstr: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            connstr: connstr.into(),
            params: BTreeMap::new(),
        }
    }

    /// Adds a field usable as a placeholder.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Returns the connection string with every placeholder substituted.
    pub fn connection_string(&self) -> String {
        let mut fields = self.params.clone();
        fields
            .entry("driver".to_string())
            .or_insert_with(|| JsonValue::String(self.driver.clone()));
        interpolate(&self.connstr, &fields)
    }
}

/// Replaces `$key` with the value of `key` for every field.
///
/// Longer keys are substituted first so `$username` is not clobbered by a
/// `$user` field. String values are inserted verbatim, other values in their
/// JSON text form. Unknown placeholders are left untouched.
pub fn interpolate(template: &str, fields: &BTreeMap<String, JsonValue>) -> String {
    let mut keys: Vec<&String> = fields.keys().collect();
    keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let mut out = template.to_string();
    for key in keys {
        let replacement = match &fields[key] {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        };
        out = out.replace(&format!("${key}"), &replacement);
    }
    out
}
