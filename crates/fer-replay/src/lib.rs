//! Offline replay of recorded classifier output.
//!
//! Reads JSON Lines events (frames, settings changes, pause toggles), drives
//! them through the stabilizer registries and writes one JSON line per
//! processed frame with stabilized probabilities and the dominant class.

pub mod config;
pub mod control;
pub mod error;
pub mod event;
pub mod logging;
pub mod replay;

pub use config::{ReplayConfig, ReplayMode};
pub use control::PipelineControl;
pub use error::{ReplayError, ReplayResult};
pub use event::{FaceInput, FaceOutput, FrameInput, FrameOutput, ReplayEvent};
pub use replay::{run_replay, FaceKey, ReplaySession, ReplaySummary};
