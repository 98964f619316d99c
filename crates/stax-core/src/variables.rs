//! Named result sets.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::record::ResultSet;

/// Stores result sets under user-chosen names for reuse without re-querying.
///
/// Reading a missing name yields an empty result set.
#[derive(Debug, Default)]
pub struct VariableStore {
    vars: RwLock<HashMap<String, ResultSet>>,
}

impl VariableStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a result set, replacing any previous binding.
    pub fn set(&self, name: impl Into<String>, result: ResultSet) {
        self.vars.write().insert(name.into(), result);
    }

    /// Removes a binding. Returns true if it existed.
    pub fn unset(&self, name: &str) -> bool {
        self.vars.write().remove(name).is_some()
    }

    /// Returns a copy of a binding, or an empty result set.
    pub fn get(&self, name: &str) -> ResultSet {
        self.vars.read().get(name).cloned().unwrap_or_default()
    }

    /// Returns true if the name is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.vars.read().contains_key(name)
    }

    /// Returns bound names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.vars.read().keys().cloned().collect();
        names.sort();
        names
    }
}
