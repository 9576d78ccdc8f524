use crate::domain_port::{KeyValueStorage, StorageError};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

/// Stores each entry as a plain string under `prefix:key`.
pub struct RedisStorage {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisStorage {
    pub fn new(conn: ConnectionManager, prefix: String) -> Self {
        RedisStorage { conn, prefix }
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }
}

#[async_trait::async_trait]
impl KeyValueStorage for RedisStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn
            .get(self.key(key))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set(self.key(key), value)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .del(self.key(key))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }
}
