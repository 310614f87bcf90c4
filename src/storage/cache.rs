//! Concurrent Key-Value Cache
//!
//! Thread-safe hashmap guarded by a reader/writer lock. Lookups dominate,
//! so readers share the lock and only `put`/`remove` take it exclusively.

use hashbrown::HashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Result of a single lookup, in the shape every outer interface emits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lookup {
    /// The stored value, or `null` when absent
    pub value: Option<Value>,
    /// Whether the key was present
    pub exists: bool,
}

impl Lookup {
    /// Render as a single-line JSON object, `value` first
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Thread-safe in-memory key-value cache
///
/// Cloning is cheap and every clone shares the same map.
#[derive(Debug, Clone, Default)]
pub struct Cache {
    inner: Arc<RwLock<HashMap<String, Value>>>,
}

impl Cache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache pre-seeded with the given entries
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }

    /// Cache holding the startup seed `{"hello": "world"}`
    pub fn seeded_default() -> Self {
        Self::with_entries([("hello", "world")])
    }

    /// Get value by key along with a presence flag
    #[inline]
    pub fn get(&self, key: &str) -> (Option<Value>, bool) {
        let map = self.inner.read();
        match map.get(key) {
            Some(value) => (Some(value.clone()), true),
            None => (None, false),
        }
    }

    /// Same as [`Cache::get`], packaged for serialization
    pub fn lookup(&self, key: &str) -> Lookup {
        let (value, exists) = self.get(key);
        Lookup { value, exists }
    }

    /// Insert or replace a value
    #[inline]
    pub fn put(&self, key: impl Into<String>, value: impl Into<Value>) {
        // Build both halves before taking the write lock.
        let key = key.into();
        let value = value.into();
        self.inner.write().insert(key, value);
    }

    /// Delete key, returns true if key existed
    pub fn remove(&self, key: &str) -> bool {
        self.inner.write().remove(key).is_some()
    }

    /// Check if key exists
    pub fn contains(&self, key: &str) -> bool {
        self.inner.read().contains_key(key)
    }

    /// Get the number of keys
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get all keys (for debugging/testing)
    pub fn keys(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }
}
