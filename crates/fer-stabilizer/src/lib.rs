//! Temporal smoothing and stabilization of per-frame emotion probabilities.
//!
//! This crate provides:
//! - The per-face [`ProbabilityStabilizer`] (boost, renormalize, EMA, windowed aggregate)
//! - A slot-indexed [`StabilizerRegistry`] and a track-keyed [`TrackedStabilizers`] arena
//! - A [`ConfigHandle`] for swapping config snapshots across threads
//! - A display-side [`ProbabilityTimeline`]
//!
//! # Pipeline
//!
//! ```text
//! raw vector (per face, per frame)
//!     │
//!     ▼
//! ┌──────────────────┐
//! │ Boost + Renorm   │ ← neutral_boost at neutral_index
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │       EMA        │ ← ema_alpha, bootstraps on first frame
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │   Ring buffer    │ ← history_window_size
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │ Window aggregate │ ← frames_for_aggregate, mean | lower median
//! └────────┬─────────┘
//!          ▼
//!   stabilized vector
//! ```
//!
//! Every operation is synchronous and bounded by O(classes × window).

pub mod config_handle;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod stabilizer;
pub mod stats;
pub mod timeline;
pub mod tracked;

pub use config_handle::ConfigHandle;
pub use error::{StabilizerError, StabilizerResult};
pub use registry::StabilizerRegistry;
pub use stabilizer::{boost_and_renormalize, ProbabilityStabilizer};
pub use timeline::{ProbabilityTimeline, DEFAULT_TIMELINE_CAPACITY};
pub use tracked::{TrackId, TrackedStabilizers};
