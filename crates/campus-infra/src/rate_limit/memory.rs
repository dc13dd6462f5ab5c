//! In-process window store - the fallback when Redis is not available.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use campus_core::ports::{RateLimitError, WindowCount, WindowStore};

#[derive(Debug, Clone, Copy)]
struct WindowRecord {
    count: u64,
    reset_at: Instant,
}

impl WindowRecord {
    fn touch(&mut self, now: Instant, window: Duration) -> WindowCount {
        if now >= self.reset_at {
            *self = WindowRecord {
                count: 1,
                reset_at: now + window,
            };
        } else {
            self.count += 1;
        }

        WindowCount {
            count: self.count,
            reset_after: self.reset_at.saturating_duration_since(now),
        }
    }
}

/// Fixed-window counters kept in a sharded map.
///
/// Each increment holds the shard lock for its key, so concurrent requests
/// on one key never overshoot the limit. Counters are per-process and are
/// lost on restart.
pub struct LocalWindowStore {
    records: DashMap<String, WindowRecord>,
}

impl LocalWindowStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Count one request against `key` and report the window state.
    pub fn touch(&self, key: &str, window: Duration) -> WindowCount {
        let now = Instant::now();

        if let Some(mut record) = self.records.get_mut(key) {
            return record.touch(now, window);
        }

        // A lapsed placeholder, so the first touch starts a fresh window.
        self.records
            .entry(key.to_string())
            .or_insert(WindowRecord {
                count: 0,
                reset_at: now,
            })
            .touch(now, window)
    }

    /// Evict every record whose window has lapsed. Returns how many went.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut evicted = 0;

        self.records.retain(|_, record| {
            let keep = record.reset_at > now;
            if !keep {
                evicted += 1;
            }
            keep
        });

        evicted
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for LocalWindowStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WindowStore for LocalWindowStore {
    async fn increment_and_get(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<WindowCount, RateLimitError> {
        Ok(self.touch(key, window))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn test_counts_within_window() {
        let store = LocalWindowStore::new();

        for expected in 1..=5 {
            let window = store.touch("userA", MINUTE);
            assert_eq!(window.count, expected);
            assert_eq!(window.reset_after, MINUTE);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets_after_lapse() {
        let store = LocalWindowStore::new();
        store.touch("userA", MINUTE);
        store.touch("userA", MINUTE);

        tokio::time::advance(Duration::from_secs(20)).await;
        let window = store.touch("userA", MINUTE);
        assert_eq!(window.count, 3);
        assert_eq!(window.reset_after, Duration::from_secs(40));

        tokio::time::advance(Duration::from_secs(40)).await;
        let window = store.touch("userA", MINUTE);
        assert_eq!(window.count, 1);
        assert_eq!(window.reset_after, MINUTE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let store = LocalWindowStore::new();
        store.touch("userA", MINUTE);
        store.touch("userA", MINUTE);

        assert_eq!(store.touch("userB", MINUTE).count, 1);
        assert_eq!(store.touch("userA", MINUTE).count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_evicts_only_lapsed_records() {
        let store = LocalWindowStore::new();
        store.touch("short", Duration::from_secs(1));
        store.touch("long", Duration::from_secs(10));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.sweep(), 1);
        assert_eq!(store.len(), 1);

        // The surviving record keeps its count.
        assert_eq!(store.touch("long", Duration::from_secs(10)).count, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(LocalWindowStore::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    store.touch("shared", MINUTE);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.touch("shared", MINUTE).count, 801);
    }
}
