//! Flat key-value storage behind the repository.
//!
//! Every operation is single-key atomic; there is no batch or transactional
//! primitive, which is exactly why the index maintainer has to report
//! partial failure instead of pretending atomicity.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::StoreError;

pub mod redis;


#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value at `key`, `None` when the key is absent. Backend
    /// failures are errors, never collapsed into `None`.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Returns `true` when a value was removed and `false` when the key was
    /// already absent.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;
}

pub(crate) fn to_json<T: Serialize>(key: &str, value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|source| StoreError::Codec {
        key: key.to_string(),
        source,
    })
}

pub(crate) fn from_json<T: DeserializeOwned>(key: &str, value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|source| StoreError::Codec {
        key: key.to_string(),
        source,
    })
}

/// In-process store for single-process deployments and tests.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys, handy for asserting "no writes happened".
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.data.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.data.write().await.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.data.read().await.contains_key(key))
    }
}
