//! Application state - shared across all handlers.

use std::sync::Arc;

use anyhow::Context;

use campus_core::RateLimitPolicies;
use campus_core::ports::{
    CommentRepository, ListingRepository, ObjectStorage, PasswordService, RateLimiter,
    TokenService, UserRepository,
};
use campus_infra::{
    Argon2PasswordService, BackendSelector, InMemoryCommentRepository, InMemoryListingRepository,
    InMemoryObjectStorage, InMemoryUserRepository, JwtConfig, JwtTokenService, LocalWindowStore,
    WindowRateLimiter,
};

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub listings: Arc<dyn ListingRepository>,
    pub storage: Arc<dyn ObjectStorage>,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: Arc<dyn PasswordService>,
    pub limiter: Arc<dyn RateLimiter>,
    pub selector: Arc<BackendSelector>,
    pub policies: Arc<RateLimitPolicies>,
    /// Rate-limit unauthenticated clients by forwarded address instead of the peer socket.
    pub trust_forwarded_headers: bool,
}

impl AppState {
    /// Build the state, connecting to Redis when it is configured.
    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let policies = RateLimitPolicies::standard().context("invalid rate limit policy")?;
        let local = Arc::new(LocalWindowStore::new());

        #[cfg(feature = "redis")]
        let selector = BackendSelector::connect(config.redis.as_ref(), local).await;

        #[cfg(not(feature = "redis"))]
        let selector = {
            tracing::info!("Running without redis feature - rate limiting with the local store");
            BackendSelector::local_only(local)
        };

        let mut state = Self::with_selector(
            Arc::new(selector),
            policies,
            config.jwt.clone(),
            config.max_upload_bytes,
        );
        state.trust_forwarded_headers = config.trust_forwarded_headers;

        tracing::info!(
            rate_limit_backend = ?state.selector.state(),
            trust_forwarded_headers = state.trust_forwarded_headers,
            "Application state initialized"
        );
        Ok(state)
    }

    /// Assemble the state around an existing backend selector.
    pub fn with_selector(
        selector: Arc<BackendSelector>,
        policies: RateLimitPolicies,
        jwt: JwtConfig,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            users: Arc::new(InMemoryUserRepository::new()),
            comments: Arc::new(InMemoryCommentRepository::new()),
            listings: Arc::new(InMemoryListingRepository::new()),
            storage: Arc::new(InMemoryObjectStorage::new("memory://uploads", max_upload_bytes)),
            tokens: Arc::new(JwtTokenService::new(jwt)),
            passwords: Arc::new(Argon2PasswordService::new()),
            limiter: Arc::new(WindowRateLimiter::new(selector.clone())),
            selector,
            policies: Arc::new(policies),
            trust_forwarded_headers: false,
        }
    }
}
