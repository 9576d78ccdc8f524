use crate::domain_model::SessionEvent;

/// Receives session lifecycle events. Called inline, so keep it quick.
pub trait EventHandler: Send + Sync {
    fn handle_event(&self, event: SessionEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventHandler;

impl EventHandler for NoopEventHandler {
    fn handle_event(&self, _event: SessionEvent) {}
}
