use crate::application_impl::{RequestPipeline, Session};
use crate::application_port::SessionError;
use crate::domain_model::{HttpRequest, HttpResponse};
use crate::domain_port::{Transport, TransportError};
use std::sync::Arc;
use tracing::trace;

/// Wraps a host transport so requests to the session's API origin get
/// session handling. Anything else, including the refresh endpoint itself,
/// goes straight to the inner transport.
pub struct SessionInterceptor<T> {
    session: Arc<Session>,
    inner: T,
}

impl<T: Transport> SessionInterceptor<T> {
    pub fn new(session: Arc<Session>, inner: T) -> Self {
        Self { session, inner }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait::async_trait]
impl<T: Transport> Transport for SessionInterceptor<T> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let state = self.session.state().map_err(into_transport_error)?;
        if !state.config().is_session_request(&request.url) {
            trace!(url = %request.url, "not a session request, passing through");
            return self.inner.execute(request).await;
        }
        RequestPipeline::new(state, &self.inner)
            .run(request)
            .await
            .map_err(into_transport_error)
    }
}

/// Transport failures surface unchanged; session failures are wrapped so
/// callers can still downcast to [`SessionError`].
fn into_transport_error(err: SessionError) -> TransportError {
    match err {
        SessionError::Transport(e) => e,
        other => TransportError::InternalError(anyhow::Error::new(other)),
    }
}
