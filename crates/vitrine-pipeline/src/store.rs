//! Client-local key-value persistence.
//!
//! One fixed key holds the last-edited source text: read at pipeline start,
//! written on every settled edit. Failures are persistence failures — logged
//! and swallowed, never allowed to block the edit cycle.

use std::collections::BTreeMap;

use thiserror::Error;

/// Persistence failure. Best-effort everywhere: the pipeline logs these and
/// carries on.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("storage write failed: {0}")]
    Write(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
}

/// Client-local key-value store, as exposed by the host.
pub trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-memory store — test double and wasm-session buffer.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryStore::new();
        assert!(store.get("k").is_none());
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").as_deref(), Some("v"));
        store.set("k", "w").unwrap();
        assert_eq!(store.get("k").as_deref(), Some("w"));
    }
}
