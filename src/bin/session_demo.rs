/// Drives many concurrent requests through one session against the
/// in-process fake backend and shows that an access-token expiry costs a
/// single refresh call.
///
/// $ cargo run --bin session_demo
use cadence::application_impl::*;
use cadence::application_port::*;
use cadence::client::LoggingEventHandler;
use cadence::domain_model::*;
use cadence::infra::InMemoryStorage;
use cadence::logger::*;
use futures_util::future::join_all;
use reqwest::{Method, Url};
use std::sync::Arc;
use std::time::Duration;

const API: &str = "http://fake.local";
const CONCURRENT_REQUESTS: usize = 16;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    logger.reload_from_config(&LogConfig {
        filter: "cadence=debug,session_demo=info".to_string(),
    })?;

    let backend = Arc::new(FakeSessionBackend::new());
    backend.set_user("demo-user", serde_json::json!({"plan": "pro"}));
    backend.delay_refresh(Duration::from_millis(200));

    let session = Arc::new(
        Session::builder(Arc::new(InMemoryStorage::new()), backend.clone())
            .event_handler(Arc::new(LoggingEventHandler))
            .build(),
    );
    session.init(SessionConfig::new(format!("{API}{REFRESH_PATH}")))?;

    // region login
    let login = session
        .new_request(Method::POST, Url::parse(&format!("{API}{LOGIN_PATH}"))?, |_| {})
        .await?;
    info!(status = %login.status, "logged in");
    info!(user_id = %session.user_id().await?, "front token decoded");
    // endregion

    // region concurrent requests across an expiry
    backend.expire_access();
    let tasks = (0..CONCURRENT_REQUESTS).map(|i| {
        let session = session.clone();
        tokio::spawn(async move {
            let url = Url::parse(&format!("{API}/orders/{i}"))?;
            let response = session.execute(HttpRequest::get(url)).await?;
            Ok::<_, anyhow::Error>(response.status)
        })
    });
    for (i, result) in join_all(tasks).await.into_iter().enumerate() {
        match result? {
            Ok(status) => info!(request = i, %status, "done"),
            Err(e) => error!(request = i, error = %e, "failed"),
        }
    }
    info!(
        refresh_calls = backend.refresh_calls(),
        requests = backend.requests(),
        "all requests finished"
    );
    // endregion

    session.sign_out().await?;
    info!(session_exists = session.does_session_exist().await?, "after sign-out");
    Ok(())
}
