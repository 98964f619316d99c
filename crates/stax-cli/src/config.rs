//! Configuration file support for the shell.
//!
//! Loads the database entries and shell settings from TOML, or from the
//! legacy flat JSON map (`{"name": {"pkg": ..., "connstr": ...}}`) when the
//! file ends in `.json`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use stax_core::DatabaseSpec;

/// Shell configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaxConfig {
    /// Database selected at startup.
    #[serde(default)]
    pub default_database: Option<String>,

    /// Initial display mode.
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Maximum history size.
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    /// History file path.
    #[serde(default)]
    pub history_file: Option<PathBuf>,

    /// Address for remote line sessions.
    #[serde(default)]
    pub listen: Option<String>,

    /// Per-statement deadline in seconds.
    #[serde(default)]
    pub query_timeout_secs: Option<u64>,

    /// Database entries by logical name.
    #[serde(default)]
    pub databases: BTreeMap<String, DatabaseSpec>,
}

fn default_mode() -> String {
    "default".to_string()
}

fn default_history_size() -> usize {
    1000
}

impl Default for StaxConfig {
    fn default() -> Self {
        Self {
            default_database: None,
            mode: default_mode(),
            history_size: default_history_size(),
            history_file: None,
            listen: None,
            query_timeout_secs: None,
            databases: BTreeMap::new(),
        }
    }
}

impl StaxConfig {
    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            let databases: BTreeMap<String, DatabaseSpec> = serde_json::from_str(&content)
                .with_context(|| format!("invalid JSON config {}", path.display()))?;
            Ok(Self {
                databases,
                ..Self::default()
            })
        } else {
            toml::from_str(&content)
                .with_context(|| format!("invalid TOML config {}", path.display()))
        }
    }

    /// Loads the first configuration file found.
    ///
    /// Looks in the following locations:
    /// 1. ~/.config/stax/config.toml
    /// 2. ~/.stax/config.toml
    /// 3. ./config.json
    /// 4. Returns default if not found
    pub fn load_default() -> Result<Self> {
        for path in Self::search_paths() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("stax").join("config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".stax").join("config.toml"));
        }
        paths.push(PathBuf::from("config.json"));
        paths
    }

    /// Returns the statement deadline, if any.
    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Picks the startup database: the requested one, else the configured
    /// default, else the first entry by name.
    pub fn initial_database(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_string)
            .or_else(|| self.default_database.clone())
            .or_else(|| self.databases.keys().next().cloned())
            .unwrap_or_default()
    }
}
