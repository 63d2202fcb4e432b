/// In-process cache backend: a single key in a string map, the same
/// contract as a browser's local storage entry.
use std::collections::HashMap;
use std::sync::RwLock;

use super::{CacheError, LocalCache};
use crate::config::DEFAULT_CACHE_KEY;
use crate::types::BoardsState;

pub struct MemoryCache {
    key: String,
    entries: RwLock<HashMap<String, String>>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_KEY)
    }
}

impl MemoryCache {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn unpushed_key(&self) -> String {
        format!("{}:unpushed", self.key)
    }

    /// Raw serialized entry, if any.
    pub fn raw(&self) -> Option<String> {
        self.entries.read().ok()?.get(&self.key).cloned()
    }

    /// Overwrite the raw entry (used to seed legacy or corrupt content).
    pub fn set_raw(&self, value: impl Into<String>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(self.key.clone(), value.into());
        }
    }
}

impl LocalCache for MemoryCache {
    fn load(&self) -> Result<Option<BoardsState>, CacheError> {
        match self.raw() {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| CacheError::Corrupt(format!("{}: {}", self.key, e))),
            None => Ok(None),
        }
    }

    fn save(&self, state: &BoardsState) -> Result<(), CacheError> {
        let raw = serde_json::to_string(state)?;
        self.set_raw(raw);
        Ok(())
    }

    fn has_unpushed(&self) -> Result<bool, CacheError> {
        Ok(self
            .entries
            .read()
            .map(|entries| entries.contains_key(&self.unpushed_key()))
            .unwrap_or(false))
    }

    fn set_unpushed(&self, unpushed: bool) -> Result<(), CacheError> {
        let key = self.unpushed_key();
        if let Ok(mut entries) = self.entries.write() {
            if unpushed {
                entries.insert(key, "1".to_string());
            } else {
                entries.remove(&key);
            }
        }
        Ok(())
    }
}
