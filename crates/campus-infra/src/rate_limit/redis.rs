//! Redis window store - counters shared by every server instance.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Script};

use campus_core::ports::{RateLimitError, WindowCount, WindowStore};

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,
    /// Upper bound on the initial connection attempt.
    pub connect_timeout: Duration,
    /// Upper bound on a single counter operation.
    pub operation_timeout: Duration,
    /// Key prefix for rate limit keys
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
            operation_timeout: Duration::from_millis(500),
            key_prefix: "ratelimit".to_string(),
        }
    }
}

impl RedisConfig {
    /// Load configuration from the environment. `None` when `REDIS_URL` is unset.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("REDIS_URL").ok().filter(|u| !u.is_empty())?;
        let defaults = Self::default();

        Some(Self {
            url,
            connect_timeout: env_millis("REDIS_CONNECT_TIMEOUT_MS")
                .unwrap_or(defaults.connect_timeout),
            operation_timeout: env_millis("REDIS_OPERATION_TIMEOUT_MS")
                .unwrap_or(defaults.operation_timeout),
            key_prefix: std::env::var("RATE_LIMIT_KEY_PREFIX").unwrap_or(defaults.key_prefix),
        })
    }
}

fn env_millis(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_millis)
}

// Returns {count, pttl_ms}. The expiry is set on the first touch of a window,
// and again if the key somehow lost its TTL.
const INCREMENT_SCRIPT: &str = r#"
local key = KEYS[1]
local window_ms = tonumber(ARGV[1])

local current = redis.call('INCR', key)
local ttl = redis.call('PTTL', key)
if current == 1 or ttl < 0 then
    redis.call('PEXPIRE', key, window_ms)
    ttl = window_ms
end

return {current, ttl}
"#;

/// Redis-backed fixed-window store.
pub struct RedisWindowStore {
    conn: ConnectionManager,
    config: RedisConfig,
    script: Script,
}

impl RedisWindowStore {
    /// Connect, giving up after `connect_timeout`.
    pub async fn connect(config: RedisConfig) -> Result<Self, RateLimitError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| RateLimitError::Unavailable(e.to_string()))?;

        // Use timeout to prevent hanging if Redis is unreachable
        let conn = tokio::time::timeout(config.connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| RateLimitError::Timeout)?
            .map_err(|e| RateLimitError::Unavailable(e.to_string()))?;

        tracing::info!(url = %config.url, "Connected to Redis rate limit store");

        Ok(Self {
            conn,
            config,
            script: Script::new(INCREMENT_SCRIPT),
        })
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}:{}", self.config.key_prefix, key)
    }
}

#[async_trait]
impl WindowStore for RedisWindowStore {
    async fn increment_and_get(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<WindowCount, RateLimitError> {
        let redis_key = self.make_key(key);
        let window_ms = window.as_millis().max(1) as u64;
        let mut conn = self.conn.clone();

        let mut invocation = self.script.key(&redis_key);
        invocation.arg(window_ms);

        let result: Vec<i64> = tokio::time::timeout(
            self.config.operation_timeout,
            invocation.invoke_async(&mut conn),
        )
        .await
        .map_err(|_| RateLimitError::Timeout)?
        .map_err(|e| RateLimitError::Unavailable(e.to_string()))?;

        let count = result.first().copied().unwrap_or(1);
        let ttl_ms = result.get(1).copied().unwrap_or(window_ms as i64);

        Ok(WindowCount {
            count: count.max(0) as u64,
            reset_after: Duration::from_millis(ttl_ms.clamp(0, window_ms as i64) as u64),
        })
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::{BackendSelector, BackendState, LocalWindowStore, WindowRateLimiter};
    use campus_core::ports::RateLimiter;
    use campus_core::{Decision, IdentityKey, RateLimitPolicy};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Length of the first complete RESP command in `buf`.
    fn command_len(buf: &[u8]) -> Option<usize> {
        fn header(buf: &[u8], from: usize) -> Option<(usize, usize)> {
            let end = buf.get(from..)?.windows(2).position(|w| w == b"\r\n")? + from;
            let n = std::str::from_utf8(buf.get(from + 1..end)?).ok()?.parse().ok()?;
            Some((n, end + 2))
        }

        if *buf.first()? != b'*' {
            return None;
        }
        let (args, mut pos) = header(buf, 0)?;
        for _ in 0..args {
            let (len, start) = header(buf, pos)?;
            pos = start + len + 2;
            if pos > buf.len() {
                return None;
            }
        }
        Some(pos)
    }

    /// Speaks just enough RESP to get through the connection handshake.
    /// Every command is answered `+OK`; scripts get no answer at all when
    /// `stall_scripts` is set.
    async fn spawn_misbehaving_server(stall_scripts: bool) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut pending = Vec::new();
                    let mut chunk = [0u8; 4096];
                    loop {
                        let n = match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => n,
                        };
                        pending.extend_from_slice(&chunk[..n]);

                        while let Some(len) = command_len(&pending) {
                            let command: Vec<u8> = pending.drain(..len).collect();
                            let is_script = command.windows(4).any(|w| w == b"EVAL");
                            if stall_scripts && is_script {
                                continue;
                            }
                            if socket.write_all(b"+OK\r\n").await.is_err() {
                                return;
                            }
                        }
                    }
                });
            }
        });

        format!("redis://{}", addr)
    }

    fn misbehaving_config(url: String) -> RedisConfig {
        RedisConfig {
            url,
            connect_timeout: Duration::from_secs(2),
            operation_timeout: Duration::from_millis(100),
            key_prefix: "test_ratelimit".to_string(),
        }
    }

    fn test_config() -> RedisConfig {
        RedisConfig {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6389".to_string()),
            connect_timeout: Duration::from_secs(1),
            operation_timeout: Duration::from_secs(1),
            key_prefix: format!("test_ratelimit:{}", uuid::Uuid::new_v4()),
        }
    }

    #[tokio::test]
    async fn test_redis_window_counts_and_resets() {
        let store = match RedisWindowStore::connect(test_config()).await {
            Ok(s) => s,
            Err(_) => return,
        };
        let window = Duration::from_secs(1);

        let first = store.increment_and_get("userA", window).await.unwrap();
        assert_eq!(first.count, 1);
        assert!(first.reset_after <= window);

        let second = store.increment_and_get("userA", window).await.unwrap();
        assert_eq!(second.count, 2);

        // Other keys start their own window
        let other = store.increment_and_get("userB", window).await.unwrap();
        assert_eq!(other.count, 1);

        tokio::time::sleep(Duration::from_millis(1200)).await;

        let after = store.increment_and_get("userA", window).await.unwrap();
        assert_eq!(after.count, 1);
    }

    #[tokio::test]
    async fn test_stalled_script_times_out() {
        let url = spawn_misbehaving_server(true).await;
        let store = RedisWindowStore::connect(misbehaving_config(url))
            .await
            .unwrap();

        let result = store.increment_and_get("userA", Duration::from_secs(60)).await;
        assert!(matches!(result, Err(RateLimitError::Timeout)));
    }

    #[tokio::test]
    async fn test_malformed_reply_is_unavailable() {
        let url = spawn_misbehaving_server(false).await;
        let store = RedisWindowStore::connect(misbehaving_config(url))
            .await
            .unwrap();

        let result = store.increment_and_get("userA", Duration::from_secs(60)).await;
        assert!(matches!(result, Err(RateLimitError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_stalled_redis_fails_open_to_local_store() {
        let url = spawn_misbehaving_server(true).await;
        let store = RedisWindowStore::connect(misbehaving_config(url))
            .await
            .unwrap();
        let selector = Arc::new(BackendSelector::with_shared(
            Arc::new(store),
            Arc::new(LocalWindowStore::new()),
        ));
        let limiter = WindowRateLimiter::new(selector.clone());
        let policy =
            RateLimitPolicy::new("auth", Duration::from_secs(900), 1, "slow down").unwrap();
        let key = IdentityKey::new("auth", None, Some("203.0.113.9"));

        assert_eq!(limiter.check(&policy, &key).await, Decision::Admit);
        assert_eq!(selector.state(), BackendState::UseLocal);
        assert!(selector.local().is_empty());

        // The local store starts counting from here.
        assert_eq!(limiter.check(&policy, &key).await, Decision::Admit);
        assert!(!limiter.check(&policy, &key).await.is_admit());
        assert_eq!(selector.local().len(), 1);
    }

    #[tokio::test]
    async fn test_connect_to_unreachable_redis_fails() {
        let config = RedisConfig {
            url: "redis://127.0.0.1:1".to_string(),
            connect_timeout: Duration::from_millis(200),
            ..RedisConfig::default()
        };

        assert!(RedisWindowStore::connect(config).await.is_err());
    }
}
