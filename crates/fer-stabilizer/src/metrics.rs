//! Stabilizer metrics.
//!
//! Counters for monitoring the smoothing pipeline:
//! - Frames smoothed and degenerate inputs seen
//! - Registry rebuilds, config reloads and track evictions

use metrics::counter;

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Raw vectors passed through `smooth()`.
    pub const FRAMES_SMOOTHED_TOTAL: &str = "fer_frames_smoothed_total";

    /// Degenerate raw vectors by kind (`zero_sum`, `non_finite`, `empty`).
    pub const DEGENERATE_INPUTS_TOTAL: &str = "fer_degenerate_inputs_total";

    /// Raw vectors whose length differs from the established EMA length.
    pub const LENGTH_MISMATCH_TOTAL: &str = "fer_length_mismatch_total";

    /// Full registry rebuilds triggered by a slot-count change.
    pub const REGISTRY_REBUILDS_TOTAL: &str = "fer_registry_rebuilds_total";

    /// Config snapshots applied to live stabilizers.
    pub const CONFIG_RELOADS_TOTAL: &str = "fer_config_reloads_total";

    /// Tracked stabilizers evicted after the face-lost gap.
    pub const TRACK_EVICTIONS_TOTAL: &str = "fer_track_evictions_total";
}

// =============================================================================
// Recording Functions
// =============================================================================

pub fn record_frame() {
    counter!(names::FRAMES_SMOOTHED_TOTAL).increment(1);
}

pub fn record_degenerate(kind: &'static str) {
    counter!(names::DEGENERATE_INPUTS_TOTAL, "kind" => kind).increment(1);
}

pub fn record_length_mismatch() {
    counter!(names::LENGTH_MISMATCH_TOTAL).increment(1);
}

pub fn record_rebuild() {
    counter!(names::REGISTRY_REBUILDS_TOTAL).increment(1);
}

pub fn record_config_reload(stabilizers: usize) {
    counter!(names::CONFIG_RELOADS_TOTAL).increment(stabilizers as u64);
}

pub fn record_evictions(count: usize) {
    counter!(names::TRACK_EVICTIONS_TOTAL).increment(count as u64);
}
