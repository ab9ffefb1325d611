//! Smoothing configuration for the probability stabilizer.
//!
//! Centralizes every tunable of the stabilization pipeline. The settings
//! collaborator persists this as a flat JSON document; any key may be
//! omitted and falls back to its default.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};

use crate::emotion::ClassLayout;

/// Per-class aggregation applied over the most recent history frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum AggregatePolicy {
    /// Arithmetic mean of the window.
    Mean,
    /// Lower median (`sorted[len / 2]`) of the window.
    #[default]
    Median,
}

impl AggregatePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregatePolicy::Mean => "mean",
            AggregatePolicy::Median => "median",
        }
    }
}

impl fmt::Display for AggregatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AggregatePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mean" | "average" | "avg" => Ok(AggregatePolicy::Mean),
            "median" => Ok(AggregatePolicy::Median),
            _ => Err(ConfigError::UnknownPolicy(s.to_string())),
        }
    }
}

/// Configuration errors raised by the settings layer.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown aggregate policy: {0} (expected mean or median)")]
    UnknownPolicy(String),

    #[error("Invalid value for {field}: {reason}")]
    OutOfRange { field: &'static str, reason: String },

    #[error("Settings document parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    fn out_of_range(field: &'static str, reason: impl Into<String>) -> Self {
        Self::OutOfRange {
            field,
            reason: reason.into(),
        }
    }
}

/// Immutable smoothing configuration snapshot.
///
/// Instances are replaced wholesale on a settings change, never mutated
/// while a stabilizer is using them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Multiplier applied to the neutral class before renormalization.
    /// Default: 2.0
    pub neutral_boost: f32,

    /// Position of the neutral class in the probability vector.
    /// Boosting is skipped when the vector is too short for this index.
    /// Default: 4 (mobile layout)
    pub neutral_index: usize,

    /// EMA smoothing factor in (0, 1]. Higher = more responsive.
    /// Default: 0.1
    pub ema_alpha: f32,

    /// Capacity of the EMA output ring buffer.
    /// Default: 60
    pub history_window_size: usize,

    /// Most recent retained frames used for the aggregate, clamped to the
    /// available history. Default: 60
    pub frames_for_aggregate: usize,

    /// Aggregation applied per class over the window.
    /// Default: median
    pub aggregate_policy: AggregatePolicy,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            neutral_boost: 2.0,
            neutral_index: 4,
            ema_alpha: 0.1,
            history_window_size: 60,
            frames_for_aggregate: 60,
            aggregate_policy: AggregatePolicy::Median,
        }
    }
}

impl SmoothingConfig {
    /// Settings used by the desktop prototype (neutral at index 3).
    pub fn desktop_prototype() -> Self {
        Self {
            neutral_index: 3,
            ..Default::default()
        }
    }

    /// Snappier tracking for live demos: less lag, more jitter.
    pub fn responsive() -> Self {
        Self {
            ema_alpha: 0.5,
            history_window_size: 15,
            frames_for_aggregate: 5,
            aggregate_policy: AggregatePolicy::Mean,
            ..Default::default()
        }
    }

    /// Copy of this config with `neutral_index` pointing at the layout's
    /// neutral class. Unchanged when the layout has no neutral class.
    pub fn for_layout(&self, layout: &ClassLayout) -> Self {
        let mut config = self.clone();
        if let Some(index) = layout.neutral_index() {
            config.neutral_index = index;
        }
        config
    }

    /// Parse a persisted settings document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to the persisted settings document.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Apply overrides from `FER_*` environment variables.
    ///
    /// Reads `FER_NEUTRAL_BOOST`, `FER_NEUTRAL_INDEX`, `FER_EMA_ALPHA`,
    /// `FER_HISTORY_SIZE`, `FER_AGGREGATE_FRAMES` and `FER_AGGREGATE_POLICY`.
    /// Unparseable values are ignored with a warning.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_parse("FER_NEUTRAL_BOOST") {
            self.neutral_boost = v;
        }
        if let Some(v) = env_parse("FER_NEUTRAL_INDEX") {
            self.neutral_index = v;
        }
        if let Some(v) = env_parse("FER_EMA_ALPHA") {
            self.ema_alpha = v;
        }
        if let Some(v) = env_parse("FER_HISTORY_SIZE") {
            self.history_window_size = v;
        }
        if let Some(v) = env_parse("FER_AGGREGATE_FRAMES") {
            self.frames_for_aggregate = v;
        }
        if let Ok(raw) = std::env::var("FER_AGGREGATE_POLICY") {
            match raw.parse() {
                Ok(policy) => {
                    info!("Using aggregate policy from FER_AGGREGATE_POLICY: {}", policy);
                    self.aggregate_policy = policy;
                }
                Err(e) => warn!("Ignoring FER_AGGREGATE_POLICY: {}", e),
            }
        }
        self
    }

    /// Check every field against its documented range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.neutral_boost.is_finite() || self.neutral_boost < 1.0 {
            return Err(ConfigError::out_of_range(
                "neutral_boost",
                format!("must be a finite value >= 1.0, got {}", self.neutral_boost),
            ));
        }
        if !(self.ema_alpha > 0.0 && self.ema_alpha <= 1.0) {
            return Err(ConfigError::out_of_range(
                "ema_alpha",
                format!("must be in (0, 1], got {}", self.ema_alpha),
            ));
        }
        if self.history_window_size == 0 {
            return Err(ConfigError::out_of_range("history_window_size", "must be >= 1"));
        }
        if self.frames_for_aggregate == 0 {
            return Err(ConfigError::out_of_range("frames_for_aggregate", "must be >= 1"));
        }
        Ok(())
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring {}: cannot parse '{}'", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SmoothingConfig::default().validate().is_ok());
        assert!(SmoothingConfig::desktop_prototype().validate().is_ok());
        assert!(SmoothingConfig::responsive().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = SmoothingConfig::default();
        config.ema_alpha = 0.0;
        assert!(config.validate().is_err());

        let mut config = SmoothingConfig::default();
        config.neutral_boost = 0.5;
        assert!(config.validate().is_err());

        let mut config = SmoothingConfig::default();
        config.history_window_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field: "history_window_size", .. })
        ));
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config = SmoothingConfig::from_json_str(
            r#"{"ema_alpha": 0.25, "aggregate_policy": "mean"}"#,
        )
        .unwrap();
        assert_eq!(config.ema_alpha, 0.25);
        assert_eq!(config.aggregate_policy, AggregatePolicy::Mean);
        assert_eq!(config.history_window_size, 60);
        assert_eq!(config.neutral_index, 4);
    }

    #[test]
    fn test_document_round_trip() {
        let config = SmoothingConfig::responsive();
        let json = config.to_json_string().unwrap();
        assert_eq!(SmoothingConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_bad_policy_in_document() {
        let result = SmoothingConfig::from_json_str(r#"{"aggregate_policy": "mode"}"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_for_layout_moves_neutral_index() {
        let config = SmoothingConfig::default().for_layout(&ClassLayout::desktop());
        assert_eq!(config.neutral_index, 3);
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("MEAN".parse::<AggregatePolicy>().unwrap(), AggregatePolicy::Mean);
        assert_eq!("median".parse::<AggregatePolicy>().unwrap(), AggregatePolicy::Median);
        assert!("mode".parse::<AggregatePolicy>().is_err());
    }
}
