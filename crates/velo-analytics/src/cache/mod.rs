//! Caching layer for analytics results.
//!
//! Provides in-memory and Redis stores behind one string-payload interface,
//! the key builder, and the read-through wrapper every query goes through.

pub mod r#trait;
pub mod key;
pub mod memory;
pub mod read_through;
pub mod redis;

pub use key::{keys, CacheKey, CacheKeyBuilder};
pub use memory::MemoryCache;
pub use r#trait::{CacheError, CacheResult, CacheStats, CacheStore};
pub use read_through::ReadThrough;
pub use redis::RedisCache;
