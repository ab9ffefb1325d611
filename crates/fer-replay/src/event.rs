//! JSON Lines event schema for recordings and replay output.

use fer_models::{EmotionPrediction, ProbabilityVector};
use serde::{Deserialize, Serialize};

/// One line of a recording.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ReplayEvent {
    /// Classifier output for every face detected in one camera frame.
    Frame(FrameInput),
    /// Settings change committed by the user. Holds a (possibly partial)
    /// smoothing settings document.
    Config { config: serde_json::Value },
    /// Pause or resume frame processing.
    Control { paused: bool },
}

/// Raw classifier output for one frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FrameInput {
    pub frame: u64,
    pub faces: Vec<FaceInput>,
}

/// Raw classifier output for one face.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FaceInput {
    /// Persistent ID from the face tracker, when available
    #[serde(default)]
    pub track_id: Option<u64>,
    pub probabilities: ProbabilityVector,
}

/// Stabilized output for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameOutput {
    pub frame: u64,
    pub faces: Vec<FaceOutput>,
}

/// Stabilized output for one face.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceOutput {
    pub slot: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_id: Option<u64>,
    pub probabilities: ProbabilityVector,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl FaceOutput {
    pub fn new(
        slot: usize,
        track_id: Option<u64>,
        probabilities: ProbabilityVector,
        prediction: Option<EmotionPrediction>,
    ) -> Self {
        Self {
            slot,
            track_id,
            probabilities,
            label: prediction.map(|p| p.label()),
            emoji: prediction.map(|p| p.emoji()),
            confidence: prediction.map(|p| p.confidence),
        }
    }
}
