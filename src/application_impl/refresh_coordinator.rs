use crate::application_impl::SessionState;
use crate::application_impl::session_state::set_header;
use crate::application_port::{RefreshOutcome, SessionError};
use crate::domain_model::{HttpRequest, REMOVE_SENTINEL, SessionEvent};
use crate::domain_port::{RequestKind, Transport};
use reqwest::StatusCode;
use reqwest::header::{HeaderName, HeaderValue};
use tracing::{debug, error, info, warn};

/// Decides what to do about a session-expired response and performs at most
/// one refresh call for any number of concurrent callers that saw the same
/// marker.
pub struct RefreshCoordinator<'a> {
    state: &'a SessionState,
}

impl<'a> RefreshCoordinator<'a> {
    pub fn new(state: &'a SessionState) -> Self {
        Self { state }
    }

    /// `pre_request_marker` is the marker the failed request was sent with.
    pub async fn on_session_expired(
        &self,
        transport: &dyn Transport,
        pre_request_marker: Option<&str>,
    ) -> RefreshOutcome {
        let Some(pre_request_marker) = pre_request_marker else {
            // the request went out unauthenticated; retry only if a session appeared since
            return match self.state.id_refresh.get_token().await {
                Ok(Some(_)) => RefreshOutcome::Retry,
                Ok(None) => RefreshOutcome::SessionExpired,
                Err(e) => RefreshOutcome::ApiError(e.into()),
            };
        };

        let _gate = self.state.refresh_gate.lock().await;
        match self.refresh_if_current(transport, pre_request_marker).await {
            Ok(outcome) => outcome,
            Err(err) => match self.state.id_refresh.get_token().await {
                Ok(None) => {
                    info!(error = %err, "session ended during refresh");
                    if let Err(e) = self.state.front_token.remove_token().await {
                        warn!(error = %e, "could not clear front token");
                    }
                    self.state.events.handle_event(SessionEvent::Unauthorised);
                    RefreshOutcome::SessionExpired
                }
                Ok(Some(_)) => {
                    error!(error = %err, "session refresh failed");
                    RefreshOutcome::ApiError(err)
                }
                Err(e) => {
                    error!(error = %err, storage_error = %e, "session refresh failed");
                    RefreshOutcome::ApiError(err)
                }
            },
        }
    }

    async fn refresh_if_current(
        &self,
        transport: &dyn Transport,
        pre_request_marker: &str,
    ) -> Result<RefreshOutcome, SessionError> {
        match self.state.id_refresh.get_token().await? {
            None => {
                debug!("no session left to refresh");
                self.state.events.handle_event(SessionEvent::Unauthorised);
                return Ok(RefreshOutcome::SessionExpired);
            }
            Some(current) if current != pre_request_marker => {
                debug!("session was refreshed by another caller");
                return Ok(RefreshOutcome::Retry);
            }
            Some(_) => {}
        }

        {
            let _exclusive = self.state.refresh_lock.write().await;
            let request = self.refresh_request(pre_request_marker).await?;
            info!(url = %request.url, "refreshing session");
            let response = transport
                .execute(request)
                .await
                .map_err(SessionError::RefreshTransport)?;

            let marker_seen = self.state.save_session_tokens(&response).await?;
            if response.status == self.state.config.session_expired_status && !marker_seen {
                self.state.id_refresh.set_token(REMOVE_SENTINEL).await?;
            }
            if response.status != StatusCode::OK {
                return Err(SessionError::RefreshApi {
                    status: response.status,
                });
            }

            if self.state.id_refresh.get_token().await?.is_none() {
                info!("refresh endpoint ended the session");
                self.state.front_token.remove_token().await?;
                self.state.events.handle_event(SessionEvent::Unauthorised);
                return Ok(RefreshOutcome::SessionExpired);
            }
            self.state.save_anti_csrf(&response).await?;
        }

        info!("session refreshed");
        self.state.events.handle_event(SessionEvent::RefreshSession);
        Ok(RefreshOutcome::Retry)
    }

    async fn refresh_request(&self, pre_request_marker: &str) -> Result<HttpRequest, SessionError> {
        let config = &self.state.config;
        let mut request = HttpRequest::post(config.refresh_url.clone())
            .with_header(HeaderName::from_static("rid"), HeaderValue::from_static("session"));
        let headers = &mut request.headers;

        if let Some(token) = self
            .state
            .anti_csrf
            .get_token(Some(pre_request_marker))
            .await?
        {
            set_header(headers, &config.anti_csrf_request_header, &token);
        }
        self.state.add_sdk_headers(headers);
        for (name, value) in &config.refresh_headers {
            headers.insert(name.clone(), value.clone());
        }
        self.state.add_provider_headers(RequestKind::Refresh, headers);
        Ok(request)
    }
}
