//! Pause and cancellation flags for the frame loop.
//!
//! Owned by whoever runs the loop and checked once per frame; there is no
//! process-wide lifecycle singleton.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable pause/cancel flags shared between the frame loop and its
/// controllers (signal handlers, settings UI).
#[derive(Debug, Clone, Default)]
pub struct PipelineControl {
    paused: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
}

impl PipelineControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    pub fn pause(&self) {
        self.set_paused(true);
    }

    pub fn resume(&self) {
        self.set_paused(false);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Stop the loop before its next frame. Not reversible.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
