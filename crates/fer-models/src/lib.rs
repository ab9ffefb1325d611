//! Shared data models for facial expression recognition smoothing.
//!
//! This crate provides Serde-serializable types for:
//! - Emotion classes and the class layouts classifiers emit
//! - Smoothing configuration (the persisted settings document)
//! - Arg-max predictions derived from stabilized probabilities

pub mod config;
pub mod emotion;
pub mod prediction;

// Re-export common types
pub use config::{AggregatePolicy, ConfigError, SmoothingConfig};
pub use emotion::{ClassLayout, EmotionClass, ParseEmotionError};
pub use prediction::EmotionPrediction;

/// One probability per class, ordered by a [`ClassLayout`].
pub type ProbabilityVector = Vec<f32>;
