//! Rate limiting ports.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{Decision, IdentityKey, RateLimitPolicy};

/// Counter state reported by a window store after an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// Requests counted in the current window, including this one.
    pub count: u64,
    /// Time left until the window lapses.
    pub reset_after: Duration,
}

/// Fixed-window counter store with atomic increment-and-expire.
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Count one request against `key`.
    ///
    /// A missing or lapsed window starts over at 1 and lasts `window`.
    /// Operational failures come back as `Err`, never as a count.
    async fn increment_and_get(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<WindowCount, RateLimitError>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

/// Admission check consulted before a protected route runs.
///
/// Infallible: a degraded backend yields `Decision::Admit`.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn check(&self, policy: &RateLimitPolicy, key: &IdentityKey) -> Decision;
}

/// Window store errors.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Backend operation timed out")]
    Timeout,
}
