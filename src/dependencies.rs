//! Named dependency values.
//!
//! Routes may declare the names of dependencies they need; the values are
//! registered once at startup and looked up by name. Reads load an immutable
//! snapshot, writes publish a new one.

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

#[derive(Debug, Default)]
pub struct DependencyStore {
    values: ArcSwap<BTreeMap<String, String>>,
}

impl DependencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value. Returns the previous value, if any.
    pub fn register(&self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        let mut previous = None;

        self.values.rcu(|current| {
            let mut next = BTreeMap::clone(current);
            previous = next.insert(name.clone(), value.clone());
            Arc::new(next)
        });

        tracing::info!(dependency = %name, replaced = previous.is_some(), "Registered dependency");
        previous
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.values.load().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.load().contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.values.load().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.values.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.load().is_empty()
    }
}
