//! Rate limiting - window stores, backend selection, the engine and its janitor.

mod engine;
mod janitor;
mod memory;
mod selector;

pub use engine::WindowRateLimiter;
pub use janitor::Janitor;
pub use memory::LocalWindowStore;
pub use selector::{BackendEvent, BackendSelector, BackendState};

#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "redis")]
pub use self::redis::{RedisConfig, RedisWindowStore};
