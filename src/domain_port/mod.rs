// storage

mod token_storage;

pub use token_storage::*;

// network

mod transport;

pub use transport::*;

// host hooks

mod event_handler;
mod header_provider;

pub use event_handler::*;
pub use header_provider::*;
