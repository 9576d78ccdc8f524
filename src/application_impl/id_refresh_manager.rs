use crate::application_impl::TokenStore;
use crate::domain_model::{IdRefreshMarker, MarkerUpdate, REMOVE_SENTINEL, TokenKind};
use crate::domain_port::StorageError;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct IdRefreshManager {
    store: Arc<TokenStore>,
}

impl IdRefreshManager {
    pub fn new(store: Arc<TokenStore>) -> Self {
        Self { store }
    }

    /// The current raw marker, or `None` once it has expired. Expired and
    /// malformed markers are evicted on read.
    pub async fn get_token(&self) -> Result<Option<String>, StorageError> {
        let Some(raw) = self.store.get(TokenKind::IdRefresh).await? else {
            return Ok(None);
        };
        match IdRefreshMarker::parse(&raw) {
            Ok(marker) if !marker.is_expired_at(Utc::now().timestamp_millis()) => Ok(Some(raw)),
            Ok(_) => {
                debug!("id-refresh marker expired, evicting");
                self.store.remove_if_current(TokenKind::IdRefresh, &raw).await?;
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "evicting malformed id-refresh marker");
                self.store.remove_if_current(TokenKind::IdRefresh, &raw).await?;
                Ok(None)
            }
        }
    }

    /// Stores `raw`, or removes the marker when `raw` is the remove sentinel,
    /// already expired, or unparseable.
    pub async fn set_token(&self, raw: &str) -> Result<(), StorageError> {
        if raw == REMOVE_SENTINEL {
            debug!("server removed the id-refresh marker");
            return self.remove_token().await;
        }
        match IdRefreshMarker::parse(raw) {
            Ok(marker) if !marker.is_expired_at(Utc::now().timestamp_millis()) => {
                debug!("storing id-refresh marker");
                self.store.set(TokenKind::IdRefresh, raw).await
            }
            Ok(_) => {
                debug!("received an already expired id-refresh marker");
                self.remove_token().await
            }
            Err(e) => {
                warn!(error = %e, "ignoring malformed id-refresh marker");
                self.remove_token().await
            }
        }
    }

    pub async fn apply_update(&self, update: MarkerUpdate) -> Result<(), StorageError> {
        match update {
            MarkerUpdate::Set(raw) => self.set_token(&raw).await,
            MarkerUpdate::Remove => self.remove_token().await,
        }
    }

    pub async fn remove_token(&self) -> Result<(), StorageError> {
        self.store.remove(TokenKind::IdRefresh).await
    }
}
