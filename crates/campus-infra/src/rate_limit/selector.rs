//! Chooses between the shared and the local window store.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use campus_core::ports::WindowStore;

use super::memory::LocalWindowStore;

#[cfg(feature = "redis")]
use super::redis::{RedisConfig, RedisWindowStore};

/// Which store rate-limit checks go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    ShouldUseShared,
    UseLocal,
}

/// Something observed about the shared store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendEvent {
    SharedFailed,
}

impl BackendState {
    /// `UseLocal` is absorbing: nothing moves a process back to the shared store.
    pub fn transition(self, event: BackendEvent) -> Self {
        match (self, event) {
            (BackendState::ShouldUseShared, BackendEvent::SharedFailed) => BackendState::UseLocal,
            (BackendState::UseLocal, _) => BackendState::UseLocal,
        }
    }
}

/// Process-wide owner of both window stores and the degradation flag.
///
/// `active()` only reads an atomic, so a shared-store outage never adds a
/// probe to the request path.
pub struct BackendSelector {
    shared: Option<Arc<dyn WindowStore>>,
    local: Arc<LocalWindowStore>,
    use_shared: AtomicBool,
}

impl BackendSelector {
    /// Local store only, for the lifetime of the process.
    pub fn local_only(local: Arc<LocalWindowStore>) -> Self {
        Self {
            shared: None,
            local,
            use_shared: AtomicBool::new(false),
        }
    }

    /// Start on an already connected shared store.
    pub fn with_shared(shared: Arc<dyn WindowStore>, local: Arc<LocalWindowStore>) -> Self {
        Self {
            shared: Some(shared),
            local,
            use_shared: AtomicBool::new(true),
        }
    }

    /// Probe Redis once at startup. No config or a failed connection means local mode.
    #[cfg(feature = "redis")]
    pub async fn connect(config: Option<&RedisConfig>, local: Arc<LocalWindowStore>) -> Self {
        let Some(config) = config else {
            tracing::warn!("REDIS_URL not set. Rate limiting with the local store.");
            return Self::local_only(local);
        };

        match RedisWindowStore::connect(config.clone()).await {
            Ok(store) => Self::with_shared(Arc::new(store), local),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Failed to connect to Redis. Rate limiting with the local store."
                );
                Self::local_only(local)
            }
        }
    }

    pub fn state(&self) -> BackendState {
        if self.shared.is_some() && self.use_shared.load(Ordering::Acquire) {
            BackendState::ShouldUseShared
        } else {
            BackendState::UseLocal
        }
    }

    /// The store the next check should use.
    pub fn active(&self) -> &dyn WindowStore {
        match (&self.shared, self.state()) {
            (Some(shared), BackendState::ShouldUseShared) => shared.as_ref(),
            _ => self.local.as_ref(),
        }
    }

    pub fn local(&self) -> &Arc<LocalWindowStore> {
        &self.local
    }

    /// Record a shared-store failure. Later checks go to the local store.
    pub fn report_failure(&self) {
        self.apply(BackendEvent::SharedFailed);
    }

    fn apply(&self, event: BackendEvent) {
        let current = self.state();
        let next = current.transition(event);
        if current == next {
            return;
        }

        let switched = self
            .use_shared
            .compare_exchange(
                current == BackendState::ShouldUseShared,
                next == BackendState::ShouldUseShared,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();

        if switched {
            tracing::warn!(from = ?current, to = ?next, "Rate limit backend switched");
        }
    }
}
