mod file_storage;
mod memory_storage;

pub use file_storage::*;
pub use memory_storage::*;
