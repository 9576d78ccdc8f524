use crate::application_impl::session_state::set_header;
use crate::application_impl::{RefreshCoordinator, SessionState};
use crate::application_port::{RefreshOutcome, SessionError};
use crate::domain_model::{HttpRequest, HttpResponse};
use crate::domain_port::Transport;
use tracing::{debug, warn};

/// Sends one host request with session handling: anti-CSRF attached,
/// response tokens saved, refresh-and-retry on session expiry.
pub struct RequestPipeline<'a> {
    state: &'a SessionState,
    transport: &'a dyn Transport,
}

impl<'a> RequestPipeline<'a> {
    pub fn new(state: &'a SessionState, transport: &'a dyn Transport) -> Self {
        Self { state, transport }
    }

    pub async fn run(&self, request: HttpRequest) -> Result<HttpResponse, SessionError> {
        let result = self.run_with_retries(request).await;
        if let Err(e) = self.state.clear_if_signed_out().await {
            warn!(error = %e, "post-request token cleanup failed");
        }
        result
    }

    async fn run_with_retries(&self, request: HttpRequest) -> Result<HttpResponse, SessionError> {
        let max_retries = self.state.config.max_retry_attempts;
        let mut retries = 0u32;
        loop {
            let (pre_request_marker, response) = self.exchange(request.clone()).await?;
            if response.status != self.state.config.session_expired_status {
                return Ok(response);
            }
            debug!(status = %response.status, url = %request.url, "session expired");

            let outcome = RefreshCoordinator::new(self.state)
                .on_session_expired(self.transport, pre_request_marker.as_deref())
                .await;
            match outcome {
                RefreshOutcome::Retry if retries < max_retries => {
                    retries += 1;
                    debug!(attempt = retries, "retrying after refresh");
                }
                RefreshOutcome::Retry => {
                    warn!(
                        attempts = retries,
                        "session still expired after maximum refresh retries"
                    );
                    return Ok(response);
                }
                RefreshOutcome::SessionExpired => return Ok(response),
                RefreshOutcome::ApiError(e) => return Err(e),
            }
        }
    }

    /// One attempt under the shared lock. Returns the marker the request was sent with.
    async fn exchange(
        &self,
        mut request: HttpRequest,
    ) -> Result<(Option<String>, HttpResponse), SessionError> {
        let _shared = self.state.refresh_lock.read().await;

        let pre_request_marker = self.state.id_refresh.get_token().await?;
        if let Some(token) = self
            .state
            .anti_csrf
            .get_token(pre_request_marker.as_deref())
            .await?
        {
            set_header(
                &mut request.headers,
                &self.state.config.anti_csrf_request_header,
                &token,
            );
        }
        self.state.add_sdk_headers(&mut request.headers);

        let response = self.transport.execute(request).await?;
        self.state.save_session_tokens(&response).await?;
        self.state.save_anti_csrf(&response).await?;
        Ok((pre_request_marker, response))
    }
}
