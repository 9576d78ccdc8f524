//! End-to-end session pipeline tests against the in-process backend

mod common;

use cadence::application_impl::*;
use cadence::application_port::*;
use cadence::domain_model::*;
use cadence::domain_port::*;
use cadence::infra::InMemoryStorage;
use cadence::infra_http::SessionInterceptor;
use common::*;
use reqwest::header::{HeaderValue, SET_COOKIE};
use reqwest::{Method, StatusCode, Url};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn expired_status() -> StatusCode {
    StatusCode::from_u16(440).unwrap()
}

#[tokio::test]
async fn test_calls_before_init_fail_fast() {
    let backend = Arc::new(FakeSessionBackend::new());
    let session = Session::builder(Arc::new(InMemoryStorage::new()), backend.clone()).build();

    let result = session.execute(HttpRequest::get(api_url("/orders"))).await;
    assert!(matches!(result, Err(SessionError::Configuration(_))));
    assert!(matches!(
        session.does_session_exist().await,
        Err(SessionError::Configuration(_))
    ));
    assert_eq!(backend.requests(), 0);
}

#[tokio::test]
async fn test_invalid_config_is_rejected_and_second_init_ignored() {
    let session = Session::builder(
        Arc::new(InMemoryStorage::new()),
        Arc::new(FakeSessionBackend::new()),
    )
    .build();
    assert!(matches!(
        session.init(SessionConfig::new("no scheme here")),
        Err(SessionError::Configuration(_))
    ));
    assert!(!session.is_initialised());

    session.init(config()).unwrap();
    session
        .init(SessionConfig::new("https://elsewhere.test/auth/session/refresh"))
        .unwrap();
    assert_eq!(
        session.state().unwrap().config().refresh_url.as_str(),
        format!("{API}{REFRESH_PATH}")
    );
}

#[tokio::test]
async fn test_expired_marker_yields_expired_response_without_refresh() {
    let h = Harness::new();
    h.storage
        .put(&h.storage_key(TokenKind::IdRefresh), "tok;1000")
        .await
        .unwrap();

    let response = h.get("/orders").await;

    assert_eq!(response.status, expired_status());
    assert_eq!(h.backend.refresh_calls(), 0);
    assert_eq!(h.marker().await, None);
    assert_eq!(
        h.storage.get(&h.storage_key(TokenKind::AntiCsrf)).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn test_login_then_authorised_request() {
    let h = Harness::new();
    h.login().await;

    assert!(h.marker().await.is_some());
    assert!(h.anti_csrf().await.is_some());
    assert_eq!(h.events.events(), vec![SessionEvent::SessionCreated]);

    let response = h.get("/orders").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, b"ok");
    assert_eq!(h.backend.refresh_calls(), 0);
}

#[tokio::test]
async fn test_expiry_triggers_refresh_and_retry() {
    let h = Harness::new();
    h.login().await;
    let marker_before = h.marker().await;
    let anti_csrf_before = h.anti_csrf().await;

    h.backend.expire_access();
    let response = h.get("/orders").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(h.backend.refresh_calls(), 1);
    assert_ne!(h.marker().await, marker_before);
    assert_ne!(h.anti_csrf().await, anti_csrf_before);
    assert_eq!(h.events.count(SessionEvent::RefreshSession), 1);
}

#[tokio::test]
async fn test_refresh_failure_surfaces_api_error() {
    let h = Harness::new();
    h.login().await;
    h.backend.expire_access();
    h.backend.fail_refresh(true);

    let result = h.session.execute(HttpRequest::get(api_url("/orders"))).await;

    assert!(matches!(
        result,
        Err(SessionError::RefreshApi { status }) if status == StatusCode::INTERNAL_SERVER_ERROR
    ));
    // the session still looks valid locally
    assert!(h.marker().await.is_some());
    assert!(h.anti_csrf().await.is_some());
}

#[tokio::test]
async fn test_revoked_session_returns_expired_response() {
    let h = Harness::new();
    h.login().await;
    h.backend.expire_access();
    h.backend.revoke_on_next_refresh();

    let response = h.get("/orders").await;

    assert_eq!(response.status, expired_status());
    assert_eq!(h.backend.refresh_calls(), 1);
    assert_eq!(h.marker().await, None);
    assert_eq!(
        h.storage.get(&h.storage_key(TokenKind::AntiCsrf)).await.unwrap(),
        None
    );
    assert_eq!(h.events.count(SessionEvent::Unauthorised), 1);
    assert!(matches!(h.session.user_id().await, Err(SessionError::NoSession)));
}

#[tokio::test]
async fn test_refresh_after_local_sign_out_reports_unauthorised() {
    let h = Harness::new();
    h.login().await;
    let marker = h.marker().await;
    assert!(marker.is_some());

    let state = h.session.state().unwrap();
    state.id_refresh().remove_token().await.unwrap();

    let outcome = RefreshCoordinator::new(state)
        .on_session_expired(h.backend.as_ref(), marker.as_deref())
        .await;
    assert!(matches!(outcome, RefreshOutcome::SessionExpired));
    assert_eq!(h.backend.refresh_calls(), 0);
    assert_eq!(h.events.count(SessionEvent::Unauthorised), 1);
}

/// Every request is rejected; every refresh hands out a fresh marker.
#[derive(Default)]
struct NeverAuthorised {
    refreshes: AtomicUsize,
    requests: AtomicUsize,
}

#[async_trait::async_trait]
impl Transport for NeverAuthorised {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        if request.url.path() == REFRESH_PATH {
            let n = self.refreshes.fetch_add(1, Ordering::SeqCst);
            let mut response = HttpResponse::new(StatusCode::OK);
            let cookie = format!("sIdRefreshToken=m{n}; Max-Age=3600");
            response
                .headers
                .append(SET_COOKIE, HeaderValue::from_str(&cookie).unwrap());
            return Ok(response);
        }
        let mut response = HttpResponse::new(StatusCode::from_u16(440).unwrap());
        if request.url.path() == LOGIN_PATH {
            response.status = StatusCode::OK;
            response.headers.append(
                SET_COOKIE,
                HeaderValue::from_static("sIdRefreshToken=first; Max-Age=3600"),
            );
        } else {
            self.requests.fetch_add(1, Ordering::SeqCst);
        }
        Ok(response)
    }
}

#[tokio::test]
async fn test_retry_limit_returns_last_expired_response() {
    let transport = Arc::new(NeverAuthorised::default());
    let session = Session::builder(Arc::new(InMemoryStorage::new()), transport.clone()).build();
    let mut config = config();
    config.max_retry_attempts_for_session_refresh = 2;
    session.init(config).unwrap();

    session
        .new_request(Method::POST, api_url(LOGIN_PATH), |_| {})
        .await
        .unwrap();
    let response = session
        .execute(HttpRequest::get(api_url("/orders")))
        .await
        .unwrap();

    assert_eq!(response.status, expired_status());
    assert_eq!(transport.requests.load(Ordering::SeqCst), 3);
    assert_eq!(transport.refreshes.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_custom_expiry_status() {
    let backend = Arc::new(FakeSessionBackend::with_expired_status(StatusCode::UNAUTHORIZED));
    let session = Session::builder(Arc::new(InMemoryStorage::new()), backend.clone()).build();
    let mut config = config();
    config.session_expired_status_code = 401;
    session.init(config).unwrap();

    session
        .new_request(Method::POST, api_url(LOGIN_PATH), |_| {})
        .await
        .unwrap();
    backend.expire_access();
    let response = session
        .execute(HttpRequest::get(api_url("/orders")))
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(backend.refresh_calls(), 1);
}

struct Unreachable;

#[async_trait::async_trait]
impl Transport for Unreachable {
    async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        Err(TransportError::Network("connection refused".into()))
    }
}

#[tokio::test]
async fn test_transport_errors_propagate_unchanged() {
    let h = Harness::new();
    h.login().await;

    let result = h
        .session
        .execute_with(&Unreachable, HttpRequest::get(api_url("/orders")))
        .await;

    assert!(matches!(
        result,
        Err(SessionError::Transport(TransportError::Network(_)))
    ));
    assert!(h.marker().await.is_some());
}

#[tokio::test]
async fn test_request_decoration() {
    let recording = Arc::new(RecordingTransport::new(FakeSessionBackend::new()));
    let session = Session::builder(Arc::new(InMemoryStorage::new()), recording.clone()).build();
    let mut config = config();
    config
        .refresh_headers
        .insert("x-client".into(), "tests".into());
    session.init(config).unwrap();

    session
        .new_request(Method::POST, api_url(LOGIN_PATH), |request| {
            request.body = Some(b"{}".to_vec());
        })
        .await
        .unwrap();
    session.attempt_refreshing_session().await.unwrap();
    session
        .execute(HttpRequest::get(api_url("/orders")))
        .await
        .unwrap();

    let requests = recording.requests();
    assert_eq!(requests.len(), 3);

    let login = &requests[0];
    assert_eq!(login.headers["st-sdk-name"], SDK_NAME);
    assert_eq!(login.headers["st-sdk-version"], SDK_VERSION);
    assert_eq!(login.body.as_deref(), Some(&b"{}"[..]));
    assert!(login.headers.get("anti-csrf").is_none());

    let refresh = &requests[1];
    assert_eq!(refresh.method, Method::POST);
    assert_eq!(refresh.url.path(), REFRESH_PATH);
    assert_eq!(refresh.headers["rid"], "session");
    assert_eq!(refresh.headers["x-client"], "tests");
    assert!(refresh.headers.get("anti-csrf").is_some());

    let orders = &requests[2];
    assert!(orders.headers.get("anti-csrf").is_some());
    assert_ne!(orders.headers["anti-csrf"], refresh.headers["anti-csrf"]);
}

#[tokio::test]
async fn test_user_id_and_payload() {
    let h = Harness::new();
    h.backend
        .set_user("user-42", serde_json::json!({"role": "admin"}));
    h.login().await;

    assert!(h.session.does_session_exist().await.unwrap());
    assert_eq!(h.session.user_id().await.unwrap(), "user-42");
    assert_eq!(
        h.session.access_token_payload_securely().await.unwrap(),
        serde_json::json!({"role": "admin"})
    );

    h.backend
        .set_user("user-42", serde_json::json!({"role": "owner"}));
    assert!(h.session.attempt_refreshing_session().await.unwrap());
    assert_eq!(
        h.session.access_token_payload_securely().await.unwrap(),
        serde_json::json!({"role": "owner"})
    );
    assert_eq!(h.events.count(SessionEvent::AccessTokenPayloadUpdated), 1);
}

#[tokio::test]
async fn test_attempt_refreshing_without_session() {
    let h = Harness::new();
    assert!(!h.session.attempt_refreshing_session().await.unwrap());
    assert_eq!(h.backend.refresh_calls(), 0);
    assert!(matches!(
        h.session.access_token_payload_securely().await,
        Err(SessionError::NoSession)
    ));
}

#[tokio::test]
async fn test_sign_out_clears_every_token() {
    let h = Harness::new();
    h.login().await;

    h.session.sign_out().await.unwrap();

    assert!(!h.backend.has_session());
    assert!(!h.session.does_session_exist().await.unwrap());
    for kind in [TokenKind::IdRefresh, TokenKind::AntiCsrf, TokenKind::FrontToken] {
        let stored = h.storage.get(&h.storage_key(kind)).await.unwrap();
        assert_eq!(stored, None, "{kind} left behind");
    }
    assert_eq!(h.events.count(SessionEvent::SignOut), 1);

    // nothing left to sign out of
    h.session.sign_out().await.unwrap();
    assert_eq!(h.events.count(SessionEvent::SignOut), 2);
}

#[tokio::test]
async fn test_interceptor_only_handles_api_origin() {
    let h = Harness::new();
    h.login().await;

    let recording = RecordingTransport::new(h.backend.clone());
    let interceptor = SessionInterceptor::new(h.session.clone(), recording);

    let other = Url::parse("http://cdn.test/logo.png").unwrap();
    interceptor.execute(HttpRequest::get(other)).await.unwrap();
    let response = interceptor
        .execute(HttpRequest::get(api_url("/orders")))
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::OK);

    let requests = interceptor.inner().requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].headers.get("st-sdk-name").is_none());
    assert!(requests[1].headers.get("st-sdk-name").is_some());
    assert!(requests[1].headers.get("anti-csrf").is_some());
    assert_eq!(h.backend.refresh_calls(), 0);
}

#[tokio::test]
async fn test_interceptor_requires_init() {
    let backend = Arc::new(FakeSessionBackend::new());
    let session = Arc::new(Session::builder(Arc::new(InMemoryStorage::new()), backend.clone()).build());
    let interceptor = SessionInterceptor::new(session, backend.clone());

    let err = interceptor
        .execute(HttpRequest::get(api_url("/orders")))
        .await
        .unwrap_err();
    let TransportError::InternalError(inner) = err else {
        panic!("expected a wrapped session error");
    };
    assert!(matches!(
        inner.downcast_ref::<SessionError>(),
        Some(SessionError::Configuration(_))
    ));
    assert_eq!(backend.requests(), 0);
}
