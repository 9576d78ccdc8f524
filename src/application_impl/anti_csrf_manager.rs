use crate::application_impl::TokenStore;
use crate::domain_model::{AntiCsrfTokenInfo, TokenKind};
use crate::domain_port::StorageError;
use std::sync::Arc;
use tracing::{debug, warn};

/// Anti-CSRF tokens are only handed out while the marker they were issued
/// under is still the current one.
pub struct AntiCsrfManager {
    store: Arc<TokenStore>,
}

impl AntiCsrfManager {
    pub fn new(store: Arc<TokenStore>) -> Self {
        Self { store }
    }

    pub async fn get_token(
        &self,
        current_marker: Option<&str>,
    ) -> Result<Option<String>, StorageError> {
        let Some(current) = current_marker else {
            self.remove_token().await?;
            return Ok(None);
        };

        // A stale token is cleared and the store consulted once more, in case
        // a fresh one bound to `current` landed concurrently.
        for _ in 0..2 {
            let Some(stored) = self.store.get(TokenKind::AntiCsrf).await? else {
                return Ok(None);
            };
            match AntiCsrfTokenInfo::from_storage_value(&stored) {
                Ok(info) if info.is_bound_to(current) => return Ok(Some(info.token)),
                Ok(_) => debug!("anti-csrf token belongs to a rotated marker, clearing"),
                Err(e) => warn!(error = %e, "clearing malformed anti-csrf record"),
            }
            self.store
                .remove_if_current(TokenKind::AntiCsrf, &stored)
                .await?;
        }
        Ok(None)
    }

    /// Binds `token` to `associated_marker`. Without a marker there is
    /// nothing to bind to and the token is cleared.
    pub async fn set_token(
        &self,
        associated_marker: Option<&str>,
        token: &str,
    ) -> Result<(), StorageError> {
        let Some(marker) = associated_marker else {
            return self.remove_token().await;
        };
        match AntiCsrfTokenInfo::new(token, marker).to_storage_value() {
            Ok(stored) => self.store.set(TokenKind::AntiCsrf, &stored).await,
            Err(e) => {
                warn!(error = %e, "could not encode anti-csrf token, clearing");
                self.remove_token().await
            }
        }
    }

    pub async fn remove_token(&self) -> Result<(), StorageError> {
        self.store.remove(TokenKind::AntiCsrf).await
    }
}
