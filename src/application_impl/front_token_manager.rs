use crate::application_impl::{IdRefreshManager, TokenStore};
use crate::application_port::SessionError;
use crate::domain_model::{
    FRONT_TOKEN_REMOVE, FrontTokenPayload, FrontTokenRecord, SessionEvent, TokenKind,
};
use crate::domain_port::{EventHandler, StorageError};
use chrono::Utc;
use cookie::Cookie;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

pub struct FrontTokenManager {
    store: Arc<TokenStore>,
    id_refresh: Arc<IdRefreshManager>,
    events: Arc<dyn EventHandler>,
    cookie_name: String,
    wait_timeout: Option<Duration>,
    shutdown: CancellationToken,
}

impl FrontTokenManager {
    pub fn new(
        store: Arc<TokenStore>,
        id_refresh: Arc<IdRefreshManager>,
        events: Arc<dyn EventHandler>,
        cookie_name: impl Into<String>,
        wait_timeout: Option<Duration>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            id_refresh,
            events,
            cookie_name: cookie_name.into(),
            wait_timeout,
            shutdown,
        }
    }

    /// The live front-token payload.
    ///
    /// With no marker this is `None`. With a marker but nothing stored yet,
    /// waits until either shows up or goes away; shutdown or the configured
    /// timeout end the wait with `None`.
    pub async fn get_token(&self) -> Result<Option<FrontTokenPayload>, SessionError> {
        let deadline = self.wait_timeout.map(|t| Instant::now() + t);
        loop {
            let notified = self.store.changed().notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.id_refresh.get_token().await?.is_none() {
                return Ok(None);
            }
            if let Some(stored) = self.store.get(TokenKind::FrontToken).await? {
                return match FrontTokenRecord::from_storage_value(&stored) {
                    Ok(record) => Ok(record.into_live_payload(Utc::now())),
                    Err(e) => {
                        warn!(error = %e, "evicting malformed front token");
                        self.store
                            .remove_if_current(TokenKind::FrontToken, &stored)
                            .await?;
                        Err(e.into())
                    }
                };
            }

            trace!("session marker present without a front token, waiting");
            let expired = async {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };
            tokio::select! {
                _ = &mut notified => {}
                _ = self.shutdown.cancelled() => {
                    debug!("front token wait interrupted by shutdown");
                    return Ok(None);
                }
                _ = expired => {
                    debug!("front token wait timed out");
                    return Ok(None);
                }
            }
        }
    }

    /// Stores `payload` (or the expired empty record for `None`) and wakes
    /// waiting readers. A changed `up` fires `AccessTokenPayloadUpdated`.
    pub async fn set_token(&self, payload: Option<&FrontTokenPayload>) -> Result<(), StorageError> {
        let record = FrontTokenRecord::new(payload.cloned());
        let stored = match record.to_storage_value(&self.cookie_name) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "could not encode front token, removing");
                return self.remove_token().await;
            }
        };

        let previous = self
            .store
            .get(TokenKind::FrontToken)
            .await?
            .and_then(|s| FrontTokenRecord::from_storage_value(&s).ok())
            .and_then(|r| r.payload);
        let payload_changed = match (&previous, payload) {
            (Some(old), Some(new)) => old.up != new.up,
            _ => false,
        };

        self.store.set(TokenKind::FrontToken, &stored).await?;
        debug!(present = payload.is_some(), "stored front token");
        if payload_changed {
            self.events
                .handle_event(SessionEvent::AccessTokenPayloadUpdated);
        }
        Ok(())
    }

    /// Applies a `front-token` response header value.
    pub async fn set_from_header(&self, value: &str) -> Result<(), StorageError> {
        if value == FRONT_TOKEN_REMOVE {
            debug!("server removed the front token");
            return self.remove_token().await;
        }
        match FrontTokenPayload::decode(value) {
            Ok(payload) => self.set_token(Some(&payload)).await,
            Err(e) => {
                warn!(error = %e, "ignoring malformed front-token header");
                self.remove_token().await
            }
        }
    }

    /// Applies a front-token `Set-Cookie`.
    pub async fn set_from_cookie(&self, cookie: &Cookie<'_>) -> Result<(), StorageError> {
        let expired = cookie.max_age().is_some_and(|age| age.whole_seconds() <= 0)
            || cookie
                .expires_datetime()
                .is_some_and(|at| at.unix_timestamp() < Utc::now().timestamp());
        if expired || cookie.value().is_empty() {
            return self.remove_token().await;
        }
        self.set_from_header(cookie.value()).await
    }

    pub async fn remove_token(&self) -> Result<(), StorageError> {
        self.store.remove(TokenKind::FrontToken).await
    }
}
