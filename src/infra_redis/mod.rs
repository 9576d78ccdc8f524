mod token_storage_redis;

pub use token_storage_redis::*;
