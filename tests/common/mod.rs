#![allow(dead_code)]

use cadence::application_impl::*;
use cadence::domain_model::*;
use cadence::domain_port::*;
use cadence::infra::InMemoryStorage;
use reqwest::{Method, StatusCode, Url};
use std::sync::{Arc, Mutex};

pub const API: &str = "http://api.test";

pub fn api_url(path: &str) -> Url {
    Url::parse(&format!("{API}{path}")).unwrap()
}

pub fn config() -> SessionConfig {
    SessionConfig::new(format!("{API}{REFRESH_PATH}"))
}

#[derive(Default)]
pub struct EventRecorder {
    events: Mutex<Vec<SessionEvent>>,
}

impl EventRecorder {
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: SessionEvent) -> usize {
        self.events().into_iter().filter(|e| *e == event).count()
    }
}

impl EventHandler for EventRecorder {
    fn handle_event(&self, event: SessionEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub struct Harness {
    pub backend: Arc<FakeSessionBackend>,
    pub session: Arc<Session>,
    pub events: Arc<EventRecorder>,
    pub storage: Arc<InMemoryStorage>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(config())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        let backend = Arc::new(FakeSessionBackend::new());
        let events = Arc::new(EventRecorder::default());
        let storage = Arc::new(InMemoryStorage::new());
        let session = Session::builder(storage.clone(), backend.clone())
            .event_handler(events.clone())
            .build();
        session.init(config).unwrap();
        Self {
            backend,
            session: Arc::new(session),
            events,
            storage,
        }
    }

    pub async fn login(&self) {
        let response = self
            .session
            .new_request(Method::POST, api_url(LOGIN_PATH), |_| {})
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::OK);
    }

    pub async fn get(&self, path: &str) -> HttpResponse {
        self.session
            .execute(HttpRequest::get(api_url(path)))
            .await
            .unwrap()
    }

    pub async fn marker(&self) -> Option<String> {
        self.session
            .state()
            .unwrap()
            .id_refresh()
            .get_token()
            .await
            .unwrap()
    }

    pub async fn anti_csrf(&self) -> Option<String> {
        let state = self.session.state().unwrap();
        let marker = state.id_refresh().get_token().await.unwrap();
        state.anti_csrf().get_token(marker.as_deref()).await.unwrap()
    }

    pub fn storage_key(&self, kind: TokenKind) -> String {
        self.session.state().unwrap().store().storage_key(kind)
    }
}

/// Remembers every request it forwards.
pub struct RecordingTransport<T> {
    inner: T,
    requests: Mutex<Vec<HttpRequest>>,
}

impl<T> RecordingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl<T: Transport> Transport for RecordingTransport<T> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.inner.execute(request).await
    }
}
