//! Display-side history of stabilized vectors for the probability graph.
//!
//! This buffer only feeds drawing. It is separate from the stabilizer's own
//! EMA history and usually has a different capacity.

use std::collections::VecDeque;

use fer_models::ProbabilityVector;
use serde::Serialize;

/// Default number of points drawn per class.
pub const DEFAULT_TIMELINE_CAPACITY: usize = 60;

const PREALLOCATED_FRAMES: usize = 64;

/// Bounded FIFO of stabilized vectors, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct ProbabilityTimeline {
    capacity: usize,
    frames: VecDeque<ProbabilityVector>,
}

impl ProbabilityTimeline {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            frames: VecDeque::with_capacity(capacity.min(PREALLOCATED_FRAMES)),
        }
    }

    /// Append a stabilized vector, dropping the oldest beyond capacity.
    pub fn push(&mut self, probabilities: ProbabilityVector) {
        self.frames.push_back(probabilities);
        while self.frames.len() > self.capacity {
            self.frames.pop_front();
        }
    }

    /// Values of one class over time, oldest first. Frames too short to hold
    /// `class_index` contribute 0.0 so every series has `len()` points.
    pub fn series(&self, class_index: usize) -> Vec<f32> {
        self.frames
            .iter()
            .map(|frame| frame.get(class_index).copied().unwrap_or(0.0))
            .collect()
    }

    pub fn latest(&self) -> Option<&[f32]> {
        self.frames.back().map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl Default for ProbabilityTimeline {
    fn default() -> Self {
        Self::new(DEFAULT_TIMELINE_CAPACITY)
    }
}
