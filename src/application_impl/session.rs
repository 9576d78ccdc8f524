use crate::application_impl::{RefreshCoordinator, RequestPipeline, SessionState};
use crate::application_port::{RefreshOutcome, SessionError, SessionService};
use crate::domain_model::{HttpRequest, HttpResponse, SessionConfig, SessionEvent};
use crate::domain_port::{
    EventHandler, HeaderProvider, KeyValueStorage, NoopEventHandler, NoopHeaderProvider,
    RequestKind, Transport,
};
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Method, Url};
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_NAMESPACE: &str = "session";

/// Process-wide session handle. Create it once, call [`Session::init`], then
/// share it (`Arc<Session>`) with every place that issues requests.
pub struct Session {
    storage: Arc<dyn KeyValueStorage>,
    transport: Arc<dyn Transport>,
    events: Arc<dyn EventHandler>,
    header_provider: Arc<dyn HeaderProvider>,
    namespace: String,
    shutdown: CancellationToken,
    state: OnceLock<Arc<SessionState>>,
}

pub struct SessionBuilder {
    storage: Arc<dyn KeyValueStorage>,
    transport: Arc<dyn Transport>,
    events: Arc<dyn EventHandler>,
    header_provider: Arc<dyn HeaderProvider>,
    namespace: String,
}

impl SessionBuilder {
    pub fn event_handler(mut self, events: Arc<dyn EventHandler>) -> Self {
        self.events = events;
        self
    }

    pub fn header_provider(mut self, header_provider: Arc<dyn HeaderProvider>) -> Self {
        self.header_provider = header_provider;
        self
    }

    /// Prefix of the storage keys the tokens live under.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn build(self) -> Session {
        Session {
            storage: self.storage,
            transport: self.transport,
            events: self.events,
            header_provider: self.header_provider,
            namespace: self.namespace,
            shutdown: CancellationToken::new(),
            state: OnceLock::new(),
        }
    }
}

impl Session {
    pub fn builder(storage: Arc<dyn KeyValueStorage>, transport: Arc<dyn Transport>) -> SessionBuilder {
        SessionBuilder {
            storage,
            transport,
            events: Arc::new(NoopEventHandler),
            header_provider: Arc::new(NoopHeaderProvider),
            namespace: DEFAULT_NAMESPACE.to_owned(),
        }
    }

    /// Validates `config` and makes the session usable. Only the first
    /// successful call takes effect.
    pub fn init(&self, config: SessionConfig) -> Result<(), SessionError> {
        if self.state.get().is_some() {
            debug!("session already initialised, ignoring init");
            return Ok(());
        }
        let resolved = config.resolve()?;
        info!(refresh_url = %resolved.refresh_url, "session initialised");
        let state = SessionState::new(
            resolved,
            self.storage.clone(),
            &self.namespace,
            self.events.clone(),
            self.header_provider.clone(),
            self.shutdown.clone(),
        );
        if self.state.set(Arc::new(state)).is_err() {
            debug!("session initialised concurrently, ignoring init");
        }
        Ok(())
    }

    pub fn is_initialised(&self) -> bool {
        self.state.get().is_some()
    }

    pub fn state(&self) -> Result<&Arc<SessionState>, SessionError> {
        self.state.get().ok_or_else(|| {
            SessionError::Configuration("Session::init must be called before use".to_owned())
        })
    }

    /// Sends `request` over the session's own transport.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, SessionError> {
        self.execute_with(self.transport.as_ref(), request).await
    }

    /// Sends `request` over a caller-supplied transport.
    pub async fn execute_with(
        &self,
        transport: &dyn Transport,
        request: HttpRequest,
    ) -> Result<HttpResponse, SessionError> {
        let state = self.state()?;
        RequestPipeline::new(state, transport).run(request).await
    }

    /// Builds a request, lets `prepare` decorate it, then sends it with
    /// session handling. Retries resend the decorated request.
    pub async fn new_request<F>(
        &self,
        method: Method,
        url: Url,
        prepare: F,
    ) -> Result<HttpResponse, SessionError>
    where
        F: FnOnce(&mut HttpRequest),
    {
        let mut request = HttpRequest::new(method, url);
        prepare(&mut request);
        self.execute(request).await
    }

    /// Ends any front-token wait in progress. The session stays usable.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

#[async_trait::async_trait]
impl SessionService for Session {
    async fn does_session_exist(&self) -> Result<bool, SessionError> {
        let state = self.state()?;
        Ok(state.id_refresh.get_token().await?.is_some())
    }

    async fn user_id(&self) -> Result<String, SessionError> {
        let state = self.state()?;
        match state.front_token.get_token().await? {
            Some(payload) => Ok(payload.uid),
            None => Err(SessionError::NoSession),
        }
    }

    async fn access_token_payload_securely(&self) -> Result<serde_json::Value, SessionError> {
        let state = self.state()?;
        if let Some(payload) = state.front_token.get_token().await? {
            return Ok(payload.up);
        }
        if state.id_refresh.get_token().await?.is_some() && self.attempt_refreshing_session().await? {
            if let Some(payload) = state.front_token.get_token().await? {
                return Ok(payload.up);
            }
        }
        Err(SessionError::NoSession)
    }

    async fn attempt_refreshing_session(&self) -> Result<bool, SessionError> {
        let state = self.state()?;
        let pre_request_marker = state.id_refresh.get_token().await?;
        let outcome = RefreshCoordinator::new(state)
            .on_session_expired(self.transport.as_ref(), pre_request_marker.as_deref())
            .await;
        if let Err(e) = state.clear_if_signed_out().await {
            warn!(error = %e, "post-refresh token cleanup failed");
        }
        match outcome {
            RefreshOutcome::Retry => Ok(true),
            RefreshOutcome::SessionExpired => Ok(false),
            RefreshOutcome::ApiError(e) => Err(e),
        }
    }

    async fn sign_out(&self) -> Result<(), SessionError> {
        let state = self.state()?;
        if !self.does_session_exist().await? {
            state.events.handle_event(SessionEvent::SignOut);
            return Ok(());
        }

        let mut request = HttpRequest::post(state.config.sign_out_url.clone())
            .with_header(HeaderName::from_static("rid"), HeaderValue::from_static("session"));
        state.add_provider_headers(RequestKind::SignOut, &mut request.headers);

        let response = self.execute(request).await?;
        if response.status == state.config.session_expired_status {
            debug!("session had already expired at sign-out");
            return Ok(());
        }
        if response.status.as_u16() >= 300 {
            return Err(SessionError::SignOut {
                status: response.status,
            });
        }

        state.clear_all().await?;
        info!("signed out");
        state.events.handle_event(SessionEvent::SignOut);
        Ok(())
    }
}
