//! Fixed-window rate limiter over the selected window store.

use std::sync::Arc;

use async_trait::async_trait;

use campus_core::ports::RateLimiter;
use campus_core::{Decision, IdentityKey, RateLimitPolicy};

use super::selector::BackendSelector;

/// Counts each request in its policy's window and rejects past the limit.
///
/// Fails open: when the store errors, the request is admitted and the
/// selector moves the process to the local store.
pub struct WindowRateLimiter {
    selector: Arc<BackendSelector>,
}

impl WindowRateLimiter {
    pub fn new(selector: Arc<BackendSelector>) -> Self {
        Self { selector }
    }

    pub fn selector(&self) -> &Arc<BackendSelector> {
        &self.selector
    }
}

#[async_trait]
impl RateLimiter for WindowRateLimiter {
    async fn check(&self, policy: &RateLimitPolicy, key: &IdentityKey) -> Decision {
        let store = self.selector.active();

        let window = match store.increment_and_get(key.as_str(), policy.window()).await {
            Ok(window) => window,
            Err(e) => {
                tracing::warn!(
                    key = %key,
                    backend = store.backend(),
                    error = %e,
                    "Rate limit store failed, failing open"
                );
                self.selector.report_failure();
                return Decision::Admit;
            }
        };

        if window.count <= u64::from(policy.max_requests()) {
            return Decision::Admit;
        }

        let decision = Decision::reject_after(window.reset_after, policy);
        if let Decision::Reject { retry_after_secs } = decision {
            tracing::debug!(
                key = %key,
                policy = policy.name(),
                count = window.count,
                retry_after_secs,
                "Rate limit exceeded"
            );
        }
        decision
    }
}
