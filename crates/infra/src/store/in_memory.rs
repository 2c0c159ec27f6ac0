use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde_json::Value as JsonValue;

use super::{RecordStore, StoreError, validate_name};

/// In-memory record store for tests/dev.
///
/// Applies the same naming rules and existence semantics as [`super::FileStore`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<HashMap<(String, String), JsonValue>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(collection: &str, key: &str) -> Result<(String, String), StoreError> {
        validate_name(collection)?;
        validate_name(key)?;
        Ok((collection.to_string(), key.to_string()))
    }
}

#[async_trait::async_trait]
impl RecordStore for InMemoryStore {
    async fn create(&self, collection: &str, key: &str, data: &JsonValue) -> Result<(), StoreError> {
        let slot = Self::slot(collection, key)?;
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if map.contains_key(&slot) {
            return Err(StoreError::already_exists(collection, key));
        }
        map.insert(slot, data.clone());
        Ok(())
    }

    async fn read(&self, collection: &str, key: &str) -> Result<JsonValue, StoreError> {
        let slot = Self::slot(collection, key)?;
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(&slot)
            .cloned()
            .ok_or_else(|| StoreError::not_found(collection, key))
    }

    async fn update(&self, collection: &str, key: &str, data: &JsonValue) -> Result<(), StoreError> {
        let slot = Self::slot(collection, key)?;
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match map.get_mut(&slot) {
            Some(existing) => {
                *existing = data.clone();
                Ok(())
            }
            None => Err(StoreError::not_found(collection, key)),
        }
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        let slot = Self::slot(collection, key)?;
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.remove(&slot)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(collection, key))
    }
}
