//! Storage backend implementations

pub mod file;
pub mod memory;
pub mod remote;

#[cfg(feature = "redis")]
pub mod redis;

// Re-export backend implementations
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use remote::RemoteStorage;

#[cfg(feature = "redis")]
pub use self::redis::{RedisConnection, RedisConnector};
