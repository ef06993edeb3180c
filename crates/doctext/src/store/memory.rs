use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::KeyValueStore;
use crate::error::StoreError;

/// Process-local store. Nothing survives a restart; use for tests and dry runs.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }
}
