use crate::domain_model::{ConfigError, MalformedTokenError};
use crate::domain_port::{StorageError, TransportError};
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("refresh endpoint answered {status}")]
    RefreshApi { status: StatusCode },
    #[error("refresh call failed: {0}")]
    RefreshTransport(TransportError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("malformed token: {0}")]
    MalformedToken(#[from] MalformedTokenError),
    #[error("no session exists")]
    NoSession,
    #[error("sign-out endpoint answered {status}")]
    SignOut { status: StatusCode },
}

impl From<ConfigError> for SessionError {
    fn from(err: ConfigError) -> Self {
        SessionError::Configuration(err.to_string())
    }
}

/// Result of asking the coordinator to deal with a session-expired response.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// A usable session exists now; resend the request.
    Retry,
    /// No session; hand the expired response to the caller.
    SessionExpired,
    /// The refresh call failed while the session still looked valid.
    ApiError(SessionError),
}

/// Session operations exposed to the host application.
#[async_trait::async_trait]
pub trait SessionService: Send + Sync {
    async fn does_session_exist(&self) -> Result<bool, SessionError>;
    async fn user_id(&self) -> Result<String, SessionError>;
    async fn access_token_payload_securely(&self) -> Result<serde_json::Value, SessionError>;
    async fn attempt_refreshing_session(&self) -> Result<bool, SessionError>;
    async fn sign_out(&self) -> Result<(), SessionError>;
}
