use crate::domain_model::{FrontTokenPayload, HttpRequest, HttpResponse, format_http_date};
use crate::domain_port::{Transport, TransportError};
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, SET_COOKIE};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const LOGIN_PATH: &str = "/auth/login";
pub const REFRESH_PATH: &str = "/auth/session/refresh";
pub const SIGN_OUT_PATH: &str = "/auth/signout";

#[derive(Debug)]
struct BackendState {
    marker: Option<String>,
    anti_csrf: Option<String>,
    access_valid: bool,
    fail_refresh: bool,
    revoke_on_refresh: bool,
    refresh_delay: Option<Duration>,
    user_id: String,
    payload: serde_json::Value,
}

/// Minimal in-process session server for demos and tests.
///
/// Speaks the session protocol over [`Transport`]: login issues a session,
/// refresh rotates it, sign-out revokes it and every other path answers 200
/// while access is valid and the anti-CSRF header matches.
pub struct FakeSessionBackend {
    expired_status: StatusCode,
    state: Mutex<BackendState>,
    refresh_calls: AtomicUsize,
    requests: AtomicUsize,
}

impl FakeSessionBackend {
    pub fn new() -> Self {
        Self::with_expired_status(StatusCode::from_u16(440).unwrap_or(StatusCode::UNAUTHORIZED))
    }

    pub fn with_expired_status(expired_status: StatusCode) -> Self {
        Self {
            expired_status,
            state: Mutex::new(BackendState {
                marker: None,
                anti_csrf: None,
                access_valid: false,
                fail_refresh: false,
                revoke_on_refresh: false,
                refresh_delay: None,
                user_id: "user-1".to_owned(),
                payload: serde_json::json!({}),
            }),
            refresh_calls: AtomicUsize::new(0),
            requests: AtomicUsize::new(0),
        }
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Requests other than login, refresh and sign-out.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn expire_access(&self) {
        self.with_state(|s| s.access_valid = false);
    }

    pub fn fail_refresh(&self, fail: bool) {
        self.with_state(|s| s.fail_refresh = fail);
    }

    pub fn revoke_on_next_refresh(&self) {
        self.with_state(|s| s.revoke_on_refresh = true);
    }

    pub fn delay_refresh(&self, delay: Duration) {
        self.with_state(|s| s.refresh_delay = Some(delay));
    }

    pub fn set_user(&self, user_id: &str, payload: serde_json::Value) {
        self.with_state(|s| {
            s.user_id = user_id.to_owned();
            s.payload = payload;
        });
    }

    pub fn has_session(&self) -> bool {
        self.with_state(|s| s.marker.is_some())
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut BackendState) -> R) -> R {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    fn issue_session(state: &mut BackendState) -> HttpResponse {
        let marker = uuid::Uuid::new_v4().to_string();
        let anti_csrf = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let front = FrontTokenPayload {
            uid: state.user_id.clone(),
            ate: (now + ChronoDuration::hours(1)).timestamp_millis(),
            up: state.payload.clone(),
        };

        let mut response = HttpResponse::new(StatusCode::OK);
        append(
            &mut response.headers,
            SET_COOKIE,
            &format!(
                "sIdRefreshToken={marker}; Path=/; HttpOnly; Expires={}",
                format_http_date(now + ChronoDuration::days(1))
            ),
        );
        if let Ok(encoded) = front.encode() {
            append(&mut response.headers, HeaderName::from_static("front-token"), &encoded);
        }
        append(&mut response.headers, HeaderName::from_static("anti-csrf"), &anti_csrf);

        state.marker = Some(marker);
        state.anti_csrf = Some(anti_csrf);
        state.access_valid = true;
        response
    }

    fn end_session(state: &mut BackendState, status: StatusCode) -> HttpResponse {
        state.marker = None;
        state.anti_csrf = None;
        state.access_valid = false;

        let mut response = HttpResponse::new(status);
        append(
            &mut response.headers,
            SET_COOKIE,
            "sIdRefreshToken=remove; Path=/; HttpOnly; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
        );
        append(&mut response.headers, HeaderName::from_static("front-token"), "remove");
        response
    }

    async fn refresh(&self) -> HttpResponse {
        let delay = self.with_state(|s| s.refresh_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);

        let expired_status = self.expired_status;
        self.with_state(|s| {
            if s.fail_refresh {
                return HttpResponse::new(StatusCode::INTERNAL_SERVER_ERROR);
            }
            if s.marker.is_none() || s.revoke_on_refresh {
                s.revoke_on_refresh = false;
                return Self::end_session(s, expired_status);
            }
            Self::issue_session(s)
        })
    }

    fn serve(&self, request: &HttpRequest) -> HttpResponse {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let presented = request
            .headers
            .get("anti-csrf")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let authorised = self.with_state(|s| {
            s.access_valid && s.anti_csrf.is_some() && s.anti_csrf == presented
        });
        if authorised {
            let mut response = HttpResponse::new(StatusCode::OK);
            response.body = b"ok".to_vec();
            response
        } else {
            HttpResponse::new(self.expired_status)
        }
    }
}

impl Default for FakeSessionBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for FakeSessionBackend {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        match request.url.path() {
            LOGIN_PATH => Ok(self.with_state(Self::issue_session)),
            REFRESH_PATH => Ok(self.refresh().await),
            SIGN_OUT_PATH => Ok(self.with_state(|s| Self::end_session(s, StatusCode::OK))),
            _ => Ok(self.serve(&request)),
        }
    }
}

fn append(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.append(name, value);
    }
}
