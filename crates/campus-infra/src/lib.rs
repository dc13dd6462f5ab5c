//! # Campus Infrastructure
//!
//! Concrete implementations of the ports defined in `campus-core`:
//! rate-limit window stores, authentication, and in-memory stand-ins for the
//! document store and object storage.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external services, local rate limiting only
//! - `redis` - Shared rate-limit counters in Redis

pub mod auth;
pub mod rate_limit;
pub mod repository;
pub mod storage;

pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};
pub use rate_limit::{
    BackendSelector, BackendState, Janitor, LocalWindowStore, WindowRateLimiter,
};
pub use repository::{InMemoryCommentRepository, InMemoryListingRepository, InMemoryUserRepository};
pub use storage::InMemoryObjectStorage;

#[cfg(feature = "redis")]
pub use rate_limit::{RedisConfig, RedisWindowStore};
