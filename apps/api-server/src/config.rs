//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use campus_infra::JwtConfig;

#[cfg(feature = "redis")]
use campus_infra::RedisConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Shared rate-limit store. `None` runs every instance on its local store.
    #[cfg(feature = "redis")]
    pub redis: Option<RedisConfig>,
    pub jwt: JwtConfig,
    /// How often lapsed local rate-limit windows are evicted.
    pub sweep_interval: Duration,
    pub max_upload_bytes: usize,
    /// Take the client address from `Forwarded`/`X-Forwarded-For`. Only safe
    /// behind a proxy that overwrites those headers.
    pub trust_forwarded_headers: bool,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT").unwrap_or(8080),
            #[cfg(feature = "redis")]
            redis: RedisConfig::from_env(),
            jwt: JwtConfig::from_env(),
            sweep_interval: Duration::from_secs(
                parse_var::<u64>("RATE_LIMIT_SWEEP_INTERVAL_SECS")
                    .filter(|secs| *secs > 0)
                    .unwrap_or(60),
            ),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES").unwrap_or(10 * 1024 * 1024),
            trust_forwarded_headers: parse_var("TRUST_PROXY_HEADERS").unwrap_or(false),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.parse().ok())
}
