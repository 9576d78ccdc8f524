use crate::application_impl::{AntiCsrfManager, FrontTokenManager, IdRefreshManager, TokenStore};
use crate::application_port::SessionError;
use crate::domain_model::{HttpResponse, MarkerUpdate, ResolvedConfig, SessionEvent};
use crate::domain_port::{EventHandler, HeaderProvider, KeyValueStorage, RequestKind};
use chrono::Utc;
use cookie::Cookie;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const SDK_NAME: &str = "rust";
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything an initialised session runs on: resolved config, token
/// managers, the two refresh locks and the host hooks.
pub struct SessionState {
    pub(crate) config: ResolvedConfig,
    pub(crate) store: Arc<TokenStore>,
    pub(crate) id_refresh: Arc<IdRefreshManager>,
    pub(crate) anti_csrf: AntiCsrfManager,
    pub(crate) front_token: FrontTokenManager,
    /// Serializes refresh attempts.
    pub(crate) refresh_gate: Mutex<()>,
    /// Shared by in-flight requests, exclusive during a refresh call.
    pub(crate) refresh_lock: RwLock<()>,
    pub(crate) events: Arc<dyn EventHandler>,
    pub(crate) header_provider: Arc<dyn HeaderProvider>,
}

impl SessionState {
    pub fn new(
        config: ResolvedConfig,
        storage: Arc<dyn KeyValueStorage>,
        namespace: &str,
        events: Arc<dyn EventHandler>,
        header_provider: Arc<dyn HeaderProvider>,
        shutdown: CancellationToken,
    ) -> Self {
        let store = Arc::new(TokenStore::new(storage, namespace));
        let id_refresh = Arc::new(IdRefreshManager::new(store.clone()));
        let anti_csrf = AntiCsrfManager::new(store.clone());
        let front_token = FrontTokenManager::new(
            store.clone(),
            id_refresh.clone(),
            events.clone(),
            config.front_token_cookie_name.clone(),
            config.front_token_wait_timeout,
            shutdown,
        );
        Self {
            config,
            store,
            id_refresh,
            anti_csrf,
            front_token,
            refresh_gate: Mutex::new(()),
            refresh_lock: RwLock::new(()),
            events,
            header_provider,
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn id_refresh(&self) -> &IdRefreshManager {
        &self.id_refresh
    }

    pub fn anti_csrf(&self) -> &AntiCsrfManager {
        &self.anti_csrf
    }

    pub fn front_token(&self) -> &FrontTokenManager {
        &self.front_token
    }

    /// Saves the marker and front token a response carries. Returns whether
    /// it set the id-refresh cookie at all.
    pub(crate) async fn save_session_tokens(
        &self,
        response: &HttpResponse,
    ) -> Result<bool, SessionError> {
        let had_session = self.id_refresh.get_token().await?.is_some();
        let mut marker_seen = false;

        for raw in response.set_cookies() {
            let cookie = match Cookie::parse(raw) {
                Ok(cookie) => cookie,
                Err(e) => {
                    warn!(error = %e, "skipping unparseable Set-Cookie");
                    continue;
                }
            };
            if cookie.name() == self.config.id_refresh_cookie_name {
                marker_seen = true;
                let update = MarkerUpdate::from_cookie(&cookie, Utc::now());
                self.id_refresh.apply_update(update).await?;
            } else if cookie.name() == self.config.front_token_cookie_name {
                self.front_token.set_from_cookie(&cookie).await?;
            }
        }

        if let Some(value) = response.header(&self.config.front_token_header) {
            self.front_token.set_from_header(value).await?;
        }

        if !had_session && self.id_refresh.get_token().await?.is_some() {
            debug!("session created");
            self.events.handle_event(SessionEvent::SessionCreated);
        }
        Ok(marker_seen)
    }

    /// Binds an anti-CSRF response header to whatever marker is current now.
    pub(crate) async fn save_anti_csrf(&self, response: &HttpResponse) -> Result<(), SessionError> {
        if let Some(token) = response.header(&self.config.anti_csrf_response_header) {
            let current = self.id_refresh.get_token().await?;
            self.anti_csrf.set_token(current.as_deref(), token).await?;
        }
        Ok(())
    }

    /// Once the marker is gone no anti-CSRF token may outlive it.
    pub(crate) async fn clear_if_signed_out(&self) -> Result<(), SessionError> {
        if self.id_refresh.get_token().await?.is_none() {
            self.anti_csrf.remove_token().await?;
        }
        Ok(())
    }

    pub(crate) async fn clear_all(&self) -> Result<(), SessionError> {
        self.id_refresh.remove_token().await?;
        self.front_token.remove_token().await?;
        Ok(())
    }

    /// Headers every pipeline request and refresh call carries.
    pub(crate) fn add_sdk_headers(&self, headers: &mut HeaderMap) {
        headers.insert("st-sdk-name", HeaderValue::from_static(SDK_NAME));
        headers.insert("st-sdk-version", HeaderValue::from_static(SDK_VERSION));
    }

    pub(crate) fn add_provider_headers(&self, kind: RequestKind, headers: &mut HeaderMap) {
        for (name, value) in self.header_provider.request_headers(kind) {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!(header = %name, "skipping invalid custom header"),
            }
        }
    }
}

/// Sets `name` to `value`, skipping values that are not legal in a header.
pub(crate) fn set_header(headers: &mut HeaderMap, name: &HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name.clone(), value);
        }
        Err(_) => warn!(header = %name, "token is not a valid header value, not sending it"),
    }
}
