use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_SESSION_EXPIRED_STATUS_CODE: u16 = 440;
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 10;

fn default_session_expired_status_code() -> u16 {
    DEFAULT_SESSION_EXPIRED_STATUS_CODE
}

fn default_id_refresh_cookie_name() -> String {
    "sIdRefreshToken".to_owned()
}

fn default_front_token_cookie_name() -> String {
    "sFrontToken".to_owned()
}

fn default_front_token_header() -> String {
    "front-token".to_owned()
}

fn default_anti_csrf_header() -> String {
    "anti-csrf".to_owned()
}

fn default_max_retry_attempts() -> u32 {
    DEFAULT_MAX_RETRY_ATTEMPTS
}

/// Host-supplied session configuration, as written in the `[session]`
/// settings section. Only `refresh_endpoint` is required.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub refresh_endpoint: String,
    #[serde(default)]
    pub sign_out_endpoint: Option<String>,
    #[serde(default = "default_session_expired_status_code")]
    pub session_expired_status_code: u16,
    #[serde(default = "default_id_refresh_cookie_name")]
    pub id_refresh_cookie_name: String,
    #[serde(default = "default_front_token_cookie_name")]
    pub front_token_cookie_name: String,
    #[serde(default = "default_front_token_header")]
    pub front_token_header: String,
    #[serde(default = "default_anti_csrf_header")]
    pub anti_csrf_request_header: String,
    #[serde(default = "default_anti_csrf_header")]
    pub anti_csrf_response_header: String,
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts_for_session_refresh: u32,
    #[serde(default)]
    pub front_token_wait_timeout_ms: Option<u64>,
    #[serde(default)]
    pub refresh_headers: HashMap<String, String>,
}

impl SessionConfig {
    pub fn new(refresh_endpoint: impl Into<String>) -> Self {
        Self {
            refresh_endpoint: refresh_endpoint.into(),
            sign_out_endpoint: None,
            session_expired_status_code: DEFAULT_SESSION_EXPIRED_STATUS_CODE,
            id_refresh_cookie_name: default_id_refresh_cookie_name(),
            front_token_cookie_name: default_front_token_cookie_name(),
            front_token_header: default_front_token_header(),
            anti_csrf_request_header: default_anti_csrf_header(),
            anti_csrf_response_header: default_anti_csrf_header(),
            max_retry_attempts_for_session_refresh: DEFAULT_MAX_RETRY_ATTEMPTS,
            front_token_wait_timeout_ms: None,
            refresh_headers: HashMap::new(),
        }
    }

    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        let refresh_url = parse_endpoint("refresh_endpoint", &self.refresh_endpoint)?;
        let sign_out_url = match &self.sign_out_endpoint {
            Some(endpoint) => parse_endpoint("sign_out_endpoint", endpoint)?,
            None => default_sign_out_url(&refresh_url)?,
        };

        let session_expired_status = StatusCode::from_u16(self.session_expired_status_code)
            .map_err(|_| ConfigError::InvalidStatusCode(self.session_expired_status_code))?;

        let mut refresh_headers = HeaderMap::new();
        for (name, value) in &self.refresh_headers {
            refresh_headers.insert(header_name(name)?, header_value(name, value)?);
        }

        Ok(ResolvedConfig {
            api_origin: refresh_url.origin().ascii_serialization(),
            refresh_url,
            sign_out_url,
            session_expired_status,
            id_refresh_cookie_name: self.id_refresh_cookie_name.clone(),
            front_token_cookie_name: self.front_token_cookie_name.clone(),
            front_token_header: header_name(&self.front_token_header)?,
            anti_csrf_request_header: header_name(&self.anti_csrf_request_header)?,
            anti_csrf_response_header: header_name(&self.anti_csrf_response_header)?,
            max_retry_attempts: self.max_retry_attempts_for_session_refresh,
            front_token_wait_timeout: self.front_token_wait_timeout_ms.map(Duration::from_millis),
            refresh_headers,
        })
    }
}

/// Validated configuration the session core runs on.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub refresh_url: Url,
    pub sign_out_url: Url,
    /// `scheme://host[:port]` of the refresh endpoint.
    pub api_origin: String,
    pub session_expired_status: StatusCode,
    pub id_refresh_cookie_name: String,
    pub front_token_cookie_name: String,
    pub front_token_header: HeaderName,
    pub anti_csrf_request_header: HeaderName,
    pub anti_csrf_response_header: HeaderName,
    pub max_retry_attempts: u32,
    pub front_token_wait_timeout: Option<Duration>,
    pub refresh_headers: HeaderMap,
}

impl ResolvedConfig {
    /// Whether the session layer should handle a request to `url`.
    pub fn is_session_request(&self, url: &Url) -> bool {
        url.origin().ascii_serialization() == self.api_origin && !self.is_refresh_url(url)
    }

    pub fn is_refresh_url(&self, url: &Url) -> bool {
        url.origin() == self.refresh_url.origin() && url.path() == self.refresh_url.path()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} is not a valid URL: {reason}")]
    InvalidUrl { field: &'static str, reason: String },
    #[error("{field} must be an absolute http(s) URL, got {value:?}")]
    UnsupportedUrl { field: &'static str, value: String },
    #[error("{0} is not a valid HTTP status code")]
    InvalidStatusCode(u16),
    #[error("invalid header name {0:?}")]
    InvalidHeaderName(String),
    #[error("invalid value for header {0:?}")]
    InvalidHeaderValue(String),
}

fn parse_endpoint(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        field,
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::UnsupportedUrl {
            field,
            value: value.to_owned(),
        });
    }
    Ok(url)
}

/// `<base>/session/refresh` signs out at `<base>/signout`; anything else at `/auth/signout`.
fn default_sign_out_url(refresh_url: &Url) -> Result<Url, ConfigError> {
    let base_path = refresh_url
        .path()
        .strip_suffix("/session/refresh")
        .unwrap_or("/auth");
    refresh_url
        .join(&format!("{base_path}/signout"))
        .map_err(|e| ConfigError::InvalidUrl {
            field: "sign_out_endpoint",
            reason: e.to_string(),
        })
}

fn header_name(name: &str) -> Result<HeaderName, ConfigError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ConfigError::InvalidHeaderName(name.to_owned()))
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidHeaderValue(name.to_owned()))
}
