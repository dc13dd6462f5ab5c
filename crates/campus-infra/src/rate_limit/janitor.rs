//! Periodic eviction of lapsed windows from the local store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::selector::{BackendSelector, BackendState};

/// Owned handle to the background sweep task.
///
/// Expired windows are already ignored on their next touch; the sweep only
/// bounds memory. Dropping the handle aborts the task.
pub struct Janitor {
    shutdown: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl Janitor {
    /// Spawn the sweep loop on the current tokio runtime.
    pub fn spawn(selector: Arc<BackendSelector>, interval: Duration) -> Self {
        let (shutdown, mut stop) = watch::channel(false);
        let period = interval.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // Nothing accumulates locally while Redis is serving.
                        if selector.state() == BackendState::ShouldUseShared {
                            continue;
                        }

                        let local = selector.local();
                        let evicted = local.sweep();
                        if evicted > 0 {
                            tracing::debug!(
                                evicted,
                                remaining = local.len(),
                                "Swept expired rate limit windows"
                            );
                        }
                    }
                    _ = stop.changed() => break,
                }
            }

            tracing::debug!("Rate limit janitor stopped");
        });

        tracing::info!(interval_secs = period.as_secs_f64(), "Rate limit janitor started");

        Self {
            shutdown,
            handle: Some(handle),
        }
    }

    /// Stop the loop and wait for it to finish.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Rate limit janitor ended abnormally");
            }
        }
    }
}

impl Drop for Janitor {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::LocalWindowStore;
    use async_trait::async_trait;
    use campus_core::ports::{RateLimitError, WindowCount, WindowStore};

    struct NoopStore;

    #[async_trait]
    impl WindowStore for NoopStore {
        async fn increment_and_get(
            &self,
            _key: &str,
            window: Duration,
        ) -> Result<WindowCount, RateLimitError> {
            Ok(WindowCount {
                count: 1,
                reset_after: window,
            })
        }

        fn backend(&self) -> &'static str {
            "noop"
        }
    }

    fn local_selector() -> Arc<BackendSelector> {
        Arc::new(BackendSelector::local_only(Arc::new(LocalWindowStore::new())))
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeps_expired_and_keeps_live_records() {
        let selector = local_selector();
        selector.local().touch("short", Duration::from_secs(2));
        selector.local().touch("long", Duration::from_secs(60));

        let janitor = Janitor::spawn(selector.clone(), Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(3500)).await;

        assert_eq!(selector.local().len(), 1);
        assert_eq!(selector.local().touch("long", Duration::from_secs(60)).count, 2);

        janitor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_sweeping() {
        let selector = local_selector();
        let janitor = Janitor::spawn(selector.clone(), Duration::from_secs(1));
        janitor.shutdown().await;

        selector.local().touch("short", Duration::from_secs(1));
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(selector.local().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_while_shared_store_is_active() {
        let selector = Arc::new(BackendSelector::with_shared(
            Arc::new(NoopStore),
            Arc::new(LocalWindowStore::new()),
        ));
        selector.local().touch("stale", Duration::from_secs(1));

        let janitor = Janitor::spawn(selector.clone(), Duration::from_secs(1));
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(selector.local().len(), 1);

        // After fail-over the sweep resumes.
        selector.report_failure();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(selector.local().is_empty());

        janitor.shutdown().await;
    }
}
