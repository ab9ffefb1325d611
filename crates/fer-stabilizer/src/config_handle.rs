//! Shared, atomically swapped smoothing configuration.
//!
//! The settings context publishes a whole new [`SmoothingConfig`]; the frame
//! context takes one `Arc` snapshot per call. A smoothing call therefore sees
//! either the old or the new config, never a mix.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use fer_models::SmoothingConfig;
use tracing::info;

#[derive(Debug)]
struct Inner {
    current: RwLock<Arc<SmoothingConfig>>,
    version: AtomicU64,
}

/// Cloneable handle to the current config snapshot.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    inner: Arc<Inner>,
}

impl ConfigHandle {
    pub fn new(config: SmoothingConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                current: RwLock::new(Arc::new(config)),
                version: AtomicU64::new(0),
            }),
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<SmoothingConfig> {
        // A poisoned lock still holds a complete Arc; the swap below is a
        // single assignment.
        let guard = self.inner.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Snapshot together with the version it was published under.
    pub fn versioned_snapshot(&self) -> (u64, Arc<SmoothingConfig>) {
        let guard = self.inner.current.read().unwrap_or_else(|e| e.into_inner());
        (self.inner.version.load(Ordering::Acquire), Arc::clone(&guard))
    }

    /// Replace the snapshot wholesale and bump the version.
    pub fn publish(&self, config: SmoothingConfig) -> Arc<SmoothingConfig> {
        let config = Arc::new(config);
        let mut guard = self.inner.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::clone(&config);
        let version = self.inner.version.fetch_add(1, Ordering::AcqRel) + 1;
        drop(guard);

        info!(
            version,
            ema_alpha = config.ema_alpha,
            history_window_size = config.history_window_size,
            frames_for_aggregate = config.frames_for_aggregate,
            aggregate_policy = %config.aggregate_policy,
            "Published smoothing config"
        );
        config
    }

    /// Number of publishes since creation.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self::new(SmoothingConfig::default())
    }
}
