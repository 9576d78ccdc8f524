//! Process-wide `tracing` setup for the binaries. The library only emits
//! events; see `bin/logger_demo.rs` for a run that exercises the reload.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
