//! Cache of server responses keyed by request path.
//!
//! Entries remember the session generation they were fetched under and are
//! only served to readers of the same generation, so nothing fetched for a
//! previous identity leaks into the next one even before the purge runs.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

#[derive(Debug, Clone)]
struct CachedResponse {
    generation: u64,
    value: Value,
}

/// Generation-tagged response cache shared by every view of one session.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: Mutex<HashMap<String, CachedResponse>>,
}

impl QueryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CachedResponse>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached response for `key`, if fetched under `generation`.
    pub fn get(&self, key: &str, generation: u64) -> Option<Value> {
        self.entries()
            .get(key)
            .filter(|entry| entry.generation == generation)
            .map(|entry| entry.value.clone())
    }

    /// Store a response fetched under `generation`.
    pub fn insert(&self, key: impl Into<String>, generation: u64, value: Value) {
        self.entries()
            .insert(key.into(), CachedResponse { generation, value });
    }

    /// Drop entries whose key starts with `prefix`; returns how many.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    /// Drop everything; returns how many entries were discarded.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries();
        let discarded = entries.len();
        entries.clear();
        discarded
    }

    /// Number of entries, including ones from older generations.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
