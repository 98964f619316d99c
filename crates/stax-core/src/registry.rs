//! Connection registry.
//!
//! Maps logical database names to live backends. Entries whose open or
//! liveness probe failed stay registered as failed, so status inspection
//! covers every configured name.
//!
//! The map is guarded by one lock that is held only for the map operation;
//! backends are cloned out before any statement runs.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::backend::{self, Backend, Driver};
use crate::config::DatabaseSpec;
use crate::error::{CoreError, CoreResult};

/// State of a registered connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Opened and probed successfully.
    Ready,
    /// Open or probe failed.
    Failed(String),
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Ready => write!(f, "ready"),
            ConnectionStatus::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

/// Summary of a registered connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Logical name.
    pub name: String,
    /// Driver identifier.
    pub driver: String,
    /// Current status.
    pub status: ConnectionStatus,
}

#[derive(Clone)]
enum Slot {
    Ready(Arc<dyn Backend>),
    Failed { driver: String, reason: String },
}

/// Registry of named connections.
#[derive(Default)]
pub struct ConnectionRegistry {
    slots: RwLock<BTreeMap<String, Slot>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a live backend, replacing any previous entry.
    pub fn put(&self, name: impl Into<String>, backend: Arc<dyn Backend>) {
        self.slots.write().insert(name.into(), Slot::Ready(backend));
    }

    /// Records a connection that could not be opened or probed.
    pub fn mark_failed(
        &self,
        name: impl Into<String>,
        driver: impl Into<String>,
        reason: impl Into<String>,
    ) {
        self.slots.write().insert(
            name.into(),
            Slot::Failed {
                driver: driver.into(),
                reason: reason.into(),
            },
        );
    }

    /// Returns the backend registered under `name`.
    pub fn get(&self, name: &str) -> CoreResult<Arc<dyn Backend>> {
        match self.slots.read().get(name) {
            Some(Slot::Ready(backend)) => Ok(Arc::clone(backend)),
            Some(Slot::Failed { reason, .. }) => Err(CoreError::Unusable {
                name: name.to_string(),
                reason: reason.clone(),
            }),
            None => Err(CoreError::UnknownDatabase(name.to_string())),
        }
    }

    /// Returns true if any entry, ready or failed, exists under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.slots.read().contains_key(name)
    }

    /// Removes an entry. Returns true if it existed.
    pub fn remove(&self, name: &str) -> bool {
        self.slots.write().remove(name).is_some()
    }

    /// Registers `alias` as a second name for the entry under `target`.
    pub fn alias(&self, alias: impl Into<String>, target: &str) -> CoreResult<()> {
        let mut slots = self.slots.write();
        let slot = slots
            .get(target)
            .cloned()
            .ok_or_else(|| CoreError::UnknownDatabase(target.to_string()))?;
        slots.insert(alias.into(), slot);
        Ok(())
    }

    /// Returns registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.slots.read().keys().cloned().collect()
    }

    /// Returns a summary of every entry in name order.
    pub fn infos(&self) -> Vec<ConnectionInfo> {
        self.slots
            .read()
            .iter()
            .map(|(name, slot)| match slot {
                Slot::Ready(backend) => ConnectionInfo {
                    name: name.clone(),
                    driver: backend.driver().to_string(),
                    status: ConnectionStatus::Ready,
                },
                Slot::Failed { driver, reason } => ConnectionInfo {
                    name: name.clone(),
                    driver: driver.clone(),
                    status: ConnectionStatus::Failed(reason.clone()),
                },
            })
            .collect()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Probes one connection.
    pub async fn ping(&self, name: &str) -> CoreResult<()> {
        let backend = self.get(name)?;
        backend.ping().await?;
        Ok(())
    }

    /// Probes every entry, in name order.
    pub async fn ping_all(&self) -> Vec<(String, CoreResult<()>)> {
        let mut results = Vec::new();
        for name in self.names() {
            let result = self.ping(&name).await;
            results.push((name, result));
        }
        results
    }

    /// Opens, probes and registers one configured database.
    ///
    /// Failures are recorded in the registry and also returned.
    pub async fn connect(&self, name: &str, spec: &DatabaseSpec) -> CoreResult<()> {
        match open_and_probe(spec).await {
            Ok(backend) => {
                info!("Connected database '{}' ({})", name, backend.driver());
                self.put(name, backend);
                Ok(())
            }
            Err(e) => {
                warn!("Database '{}' failed to connect: {}", name, e);
                self.mark_failed(name, spec.driver.clone(), e.to_string());
                Err(e)
            }
        }
    }

    /// Connects every configured database. A failure never stops the others.
    pub async fn connect_all(
        &self,
        specs: &BTreeMap<String, DatabaseSpec>,
    ) -> Vec<(String, CoreResult<()>)> {
        let mut results = Vec::with_capacity(specs.len());
        for (name, spec) in specs {
            let result = self.connect(name, spec).await;
            results.push((name.clone(), result));
        }
        results
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("names", &self.names())
            .finish()
    }
}

async fn open_and_probe(spec: &DatabaseSpec) -> CoreResult<Arc<dyn Backend>> {
    let driver = Driver::parse(&spec.driver)?;
    let backend = backend::open(driver, &spec.connection_string()).await?;
    backend.ping().await?;
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn sqlite_registry() -> ConnectionRegistry {
        let registry = ConnectionRegistry::new();
        registry
            .connect("main", &DatabaseSpec::new("sqlite", ":memory:"))
            .await
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn test_get_registered() {
        let registry = sqlite_registry().await;
        let backend = registry.get("main").unwrap();
        assert_eq!(backend.driver(), Driver::Sqlite);
    }

    #[test]
    fn test_get_unknown() {
        let registry = ConnectionRegistry::new();
        assert!(matches!(
            registry.get("nope"),
            Err(CoreError::UnknownDatabase(name)) if name == "nope"
        ));
    }

    #[tokio::test]
    async fn test_unsupported_driver_is_recorded() {
        let registry = ConnectionRegistry::new();
        let result = registry
            .connect("legacy", &DatabaseSpec::new("mssql", "server=x"))
            .await;

        assert!(result.is_err());
        assert!(registry.contains("legacy"));
        assert!(matches!(registry.get("legacy"), Err(CoreError::Unusable { .. })));

        let infos = registry.infos();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].driver, "mssql");
        assert!(matches!(infos[0].status, ConnectionStatus::Failed(_)));
    }

    #[tokio::test]
    async fn test_connect_all_is_non_fatal() {
        let mut specs = BTreeMap::new();
        specs.insert("bad".to_string(), DatabaseSpec::new("nosuch", ""));
        specs.insert("good".to_string(), DatabaseSpec::new("sqlite3", ":memory:"));

        let registry = ConnectionRegistry::new();
        let results = registry.connect_all(&specs).await;

        assert_eq!(results.len(), 2);
        assert!(results[0].1.is_err());
        assert!(results[1].1.is_ok());
        assert_eq!(registry.names(), vec!["bad", "good"]);
    }

    #[tokio::test]
    async fn test_alias_and_remove() {
        let registry = sqlite_registry().await;
        registry.alias("primary", "main").unwrap();
        assert!(registry.get("primary").is_ok());
        assert!(registry.alias("x", "missing").is_err());

        assert!(registry.remove("main"));
        assert!(!registry.remove("main"));
        assert!(registry.get("primary").is_ok());
    }

    #[tokio::test]
    async fn test_ping_all() {
        let registry = sqlite_registry().await;
        registry.mark_failed("down", "postgres", "refused");

        let results = registry.ping_all().await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "down");
        assert!(results[0].1.is_err());
        assert!(results[1].1.is_ok());
    }
}
