//! Replay configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use fer_models::{ClassLayout, SmoothingConfig};
use fer_stabilizer::DEFAULT_TIMELINE_CAPACITY;
use tracing::{info, warn};

use crate::error::{ReplayError, ReplayResult};

/// How faces are mapped to stabilizers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayMode {
    /// Face position in the frame picks the slot; count changes rebuild.
    #[default]
    Slots,
    /// `track_id` picks the stabilizer; lost tracks are evicted after a gap.
    Tracked,
}

impl fmt::Display for ReplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayMode::Slots => write!(f, "slots"),
            ReplayMode::Tracked => write!(f, "tracked"),
        }
    }
}

impl FromStr for ReplayMode {
    type Err = ReplayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "slots" | "slot" => Ok(ReplayMode::Slots),
            "tracked" | "track" => Ok(ReplayMode::Tracked),
            _ => Err(ReplayError::InvalidMode(s.to_string())),
        }
    }
}

/// Replay configuration.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Persisted smoothing settings document (JSON)
    pub settings_path: Option<PathBuf>,
    /// Face-to-stabilizer mapping
    pub mode: ReplayMode,
    /// Class order the recorded classifier emits
    pub layout: ClassLayout,
    /// Frames a lost face keeps its state: tracks in tracked mode, slots
    /// across empty frames
    pub track_max_gap: u32,
    /// Points kept per face for the probability graph
    pub timeline_size: usize,
    /// Write Prometheus metrics to this file when the replay ends
    pub metrics_dump: Option<PathBuf>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            settings_path: None,
            mode: ReplayMode::Slots,
            layout: ClassLayout::mobile(),
            track_max_gap: 10,
            timeline_size: DEFAULT_TIMELINE_CAPACITY,
            metrics_dump: None,
        }
    }
}

impl ReplayConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mode = match std::env::var("FER_REPLAY_MODE") {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("{}, using {}", e, defaults.mode);
                defaults.mode
            }),
            Err(_) => defaults.mode,
        };

        let layout = match std::env::var("FER_CLASS_LAYOUT") {
            Ok(raw) => ClassLayout::from_preset(&raw).unwrap_or_else(|e| {
                warn!("{}, using mobile layout", e);
                ClassLayout::mobile()
            }),
            Err(_) => defaults.layout,
        };

        Self {
            settings_path: std::env::var("FER_SETTINGS_PATH").ok().map(PathBuf::from),
            mode,
            layout,
            track_max_gap: std::env::var("FER_TRACK_MAX_GAP")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.track_max_gap),
            timeline_size: std::env::var("FER_TIMELINE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeline_size),
            metrics_dump: std::env::var("FER_METRICS_DUMP").ok().map(PathBuf::from),
        }
    }

    /// Load the initial smoothing config.
    ///
    /// Reads the settings document when one is configured, then applies
    /// `FER_*` overrides and validates the result.
    pub async fn load_smoothing_config(&self) -> ReplayResult<SmoothingConfig> {
        let config = match &self.settings_path {
            Some(path) => {
                let json = tokio::fs::read_to_string(path).await?;
                info!("Loaded smoothing settings from {}", path.display());
                let document: serde_json::Value = serde_json::from_str(&json)?;
                resolve_settings(document, &self.layout)?
            }
            None => SmoothingConfig::default().for_layout(&self.layout),
        };

        let config = config.with_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

/// Build a config from a settings document.
///
/// A document without `neutral_index` takes the layout's neutral position;
/// an explicit index is kept as written.
pub fn resolve_settings(
    document: serde_json::Value,
    layout: &ClassLayout,
) -> ReplayResult<SmoothingConfig> {
    let explicit_index = document
        .as_object()
        .map(|fields| fields.contains_key("neutral_index"))
        .unwrap_or(false);

    let config: SmoothingConfig = serde_json::from_value(document)?;
    if explicit_index {
        Ok(config)
    } else {
        Ok(config.for_layout(layout))
    }
}
