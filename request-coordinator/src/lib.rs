pub mod backend;
mod background;
pub mod cache;
pub mod deduplication;
mod error;
pub mod queue;
pub mod rate_limiter;
mod service;


pub use backend::{MockBackend, NewUser, User, UserBackend, UserId};
pub use background::BackgroundTask;
pub use error::{Error, Result};
pub use service::UserService;

// Re-export coordination primitives
pub use cache::{CacheConfig, CacheStats, SharedCache, TtlLruCache};
pub use deduplication::{DeduplicationStats, RequestDeduplicator, SharedRequestDeduplicator};
pub use queue::RequestQueue;
pub use rate_limiter::{RateLimitConfig, RateLimitDecision, RateLimitEntry, RateLimiter};
