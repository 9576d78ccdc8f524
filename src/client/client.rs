use crate::application_impl::*;
use crate::domain_model::SessionEvent;
use crate::domain_port::*;
use crate::infra::*;
use crate::infra_http::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use anyhow::anyhow;
use std::sync::Arc;

/// Logs every session event at info.
#[derive(Debug, Default)]
pub struct LoggingEventHandler;

impl EventHandler for LoggingEventHandler {
    fn handle_event(&self, event: SessionEvent) {
        info!(%event, "session event");
    }
}

/// Wires storage, transport and the session together from [`Settings`].
pub struct Client {
    session: Arc<Session>,
    transport: ReqwestTransport,
}

impl Client {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let storage: Arc<dyn KeyValueStorage> = match settings.storage.backend.as_str() {
            "memory" => Arc::new(InMemoryStorage::new()),
            "file" => {
                let path = settings
                    .storage
                    .path
                    .as_deref()
                    .ok_or_else(|| anyhow!("storage.path is required for the file backend"))?;
                Arc::new(FileStorage::new(path))
            }
            "redis" => {
                let dsn = settings
                    .storage
                    .redis_dsn
                    .as_deref()
                    .ok_or_else(|| anyhow!("storage.redis_dsn is required for the redis backend"))?;
                let redis_client = redis::Client::open(dsn)?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisStorage::new(
                    redis_manager,
                    settings.storage.prefix.clone(),
                ))
            }
            other => return Err(anyhow!("Unknown storage backend: {}", other)),
        };
        debug!(backend = %settings.storage.backend, "token storage ready");

        let transport = ReqwestTransport::try_default()?;
        let session = Session::builder(storage, Arc::new(transport.clone()))
            .event_handler(Arc::new(LoggingEventHandler))
            .build();
        session.init(settings.session.clone())?;

        Ok(Self {
            session: Arc::new(session),
            transport,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// A transport that adds session handling to requests for the API origin.
    pub fn interceptor(&self) -> SessionInterceptor<ReqwestTransport> {
        SessionInterceptor::new(self.session.clone(), self.transport.clone())
    }

    pub fn shutdown(&self) {
        self.session.shutdown();
        info!("client shut down");
    }
}
