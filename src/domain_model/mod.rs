mod anti_csrf;
mod event;
mod front_token;
mod http;
mod id_refresh;
mod session_config;
mod token_error;
mod token_kind;

pub use anti_csrf::*;
pub use event::*;
pub use front_token::*;
pub use http::*;
pub use id_refresh::*;
pub use session_config::*;
pub use token_error::*;
pub use token_kind::*;
