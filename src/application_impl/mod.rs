mod anti_csrf_manager;
mod fake_session_backend;
mod front_token_manager;
mod id_refresh_manager;
mod refresh_coordinator;
mod request_pipeline;
mod session;
pub(crate) mod session_state;
mod token_store;

pub use anti_csrf_manager::*;
pub use fake_session_backend::*;
pub use front_token_manager::*;
pub use id_refresh_manager::*;
pub use refresh_coordinator::*;
pub use request_pipeline::*;
pub use session::*;
pub use session_state::{SDK_NAME, SDK_VERSION, SessionState};
pub use token_store::*;
