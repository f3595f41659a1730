//! Redis-backed key-value store.
//!
//! Values are stored as JSON strings. Connections come from a small
//! pop/push pool of multiplexed connection managers, topped up lazily when
//! the pool runs dry.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::KeyValueStore;

pub struct RedisStore {
    client: Client,
    connections: RwLock<Vec<ConnectionManager>>,
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl RedisStore {
    pub async fn connect(url: &str, pool_size: usize) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        let mut connections = Vec::with_capacity(pool_size);

        for _ in 0..pool_size {
            let conn = client.get_connection_manager().await?;
            connections.push(conn);
        }

        Ok(Self {
            client,
            connections: RwLock::new(connections),
        })
    }

    async fn conn(&self) -> Result<ConnectionManager, StoreError> {
        let mut pool = self.connections.write().await;
        if let Some(conn) = pool.pop() {
            Ok(conn)
        } else {
            Ok(self.client.get_connection_manager().await?)
        }
    }

    async fn put_back(&self, conn: ConnectionManager) {
        let mut pool = self.connections.write().await;
        if pool.len() < pool.capacity() {
            pool.push(conn);
        }
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut conn = self.conn().await?;
        let result: Result<Option<String>, redis::RedisError> = conn.get(key).await;
        // Return the connection even on failure; the manager reconnects
        // itself, and dropping it here would drain the pool under
        // transient errors.
        self.put_back(conn).await;

        match result? {
            Some(data) => {
                let value = serde_json::from_str(&data).map_err(|source| StoreError::Codec {
                    key: key.to_string(),
                    source,
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let data = value.to_string();
        let mut conn = self.conn().await?;
        let result: Result<(), redis::RedisError> = conn.set(key, data).await;
        self.put_back(conn).await;
        result?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn().await?;
        let result: Result<i64, redis::RedisError> = conn.del(key).await;
        self.put_back(conn).await;
        Ok(result? > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn().await?;
        let result: Result<bool, redis::RedisError> = conn.exists(key).await;
        self.put_back(conn).await;
        Ok(result?)
    }
}
