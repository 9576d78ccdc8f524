use crate::domain_model::TokenKind;
use crate::domain_port::{KeyValueStorage, StorageError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

/// Write-through cache over durable storage for the three token kinds.
///
/// A kind missing from the cache map has not been loaded yet; `Some(None)`
/// means it was loaded and is absent. Every write or removal commits to
/// storage first and then to the cache, under the same lock.
pub struct TokenStore {
    storage: Arc<dyn KeyValueStorage>,
    namespace: String,
    cache: Mutex<HashMap<TokenKind, Option<String>>>,
    changed: Notify,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>, namespace: impl Into<String>) -> Self {
        Self {
            storage,
            namespace: namespace.into(),
            cache: Mutex::new(HashMap::new()),
            changed: Notify::new(),
        }
    }

    pub fn storage_key(&self, kind: TokenKind) -> String {
        format!("{}:{}", self.namespace, kind.storage_key())
    }

    pub async fn get(&self, kind: TokenKind) -> Result<Option<String>, StorageError> {
        let mut cache = self.cache.lock().await;
        if let Some(slot) = cache.get(&kind) {
            return Ok(slot.clone());
        }
        let loaded = self.storage.get(&self.storage_key(kind)).await?;
        cache.insert(kind, loaded.clone());
        Ok(loaded)
    }

    pub async fn set(&self, kind: TokenKind, value: &str) -> Result<(), StorageError> {
        {
            let mut cache = self.cache.lock().await;
            if let Err(e) = self.storage.put(&self.storage_key(kind), value).await {
                cache.remove(&kind);
                return Err(e);
            }
            cache.insert(kind, Some(value.to_owned()));
        }
        self.changed.notify_waiters();
        Ok(())
    }

    /// Removing the id-refresh marker also removes the anti-CSRF token.
    pub async fn remove(&self, kind: TokenKind) -> Result<(), StorageError> {
        {
            let mut cache = self.cache.lock().await;
            self.remove_locked(&mut cache, kind).await?;
        }
        self.changed.notify_waiters();
        Ok(())
    }

    /// Removes `kind` only while it still holds `expected`. Returns whether it did.
    pub async fn remove_if_current(
        &self,
        kind: TokenKind,
        expected: &str,
    ) -> Result<bool, StorageError> {
        {
            let mut cache = self.cache.lock().await;
            let current = match cache.get(&kind) {
                Some(slot) => slot.clone(),
                None => self.storage.get(&self.storage_key(kind)).await?,
            };
            if current.as_deref() != Some(expected) {
                cache.insert(kind, current);
                return Ok(false);
            }
            self.remove_locked(&mut cache, kind).await?;
        }
        self.changed.notify_waiters();
        Ok(true)
    }

    /// Signalled after every write or removal.
    pub fn changed(&self) -> &Notify {
        &self.changed
    }

    async fn remove_locked(
        &self,
        cache: &mut HashMap<TokenKind, Option<String>>,
        kind: TokenKind,
    ) -> Result<(), StorageError> {
        let mut kinds = vec![kind];
        if kind == TokenKind::IdRefresh {
            kinds.push(TokenKind::AntiCsrf);
        }
        for kind in kinds {
            if matches!(cache.get(&kind), Some(None)) {
                continue;
            }
            if let Err(e) = self.storage.remove(&self.storage_key(kind)).await {
                cache.remove(&kind);
                return Err(e);
            }
            cache.insert(kind, None);
        }
        Ok(())
    }
}
