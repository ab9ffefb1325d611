//! Error types for stabilizer routing.

use thiserror::Error;

/// Result type for stabilizer operations.
pub type StabilizerResult<T> = Result<T, StabilizerError>;

/// Errors surfaced by the stabilizer registries.
///
/// Smoothing itself never fails; only caller precondition violations are
/// reported here.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StabilizerError {
    #[error("Slot {slot} out of range (registry holds {slot_count} slots)")]
    SlotOutOfRange { slot: usize, slot_count: usize },
}
