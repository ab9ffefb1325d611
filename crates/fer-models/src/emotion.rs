//! Emotion classes and classifier output layouts.
//!
//! Two classifier generations exist with different output orders:
//!
//! - `mobile`: angry, disgust, fear, happy, neutral, sad, surprise
//! - `desktop`: fear, angry, sad, neutral, surprise, disgust, happy
//!
//! A [`ClassLayout`] maps vector positions to [`EmotionClass`] values so the
//! rest of the pipeline never hardcodes either order.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the seven recognized facial expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EmotionClass {
    Angry,
    Disgust,
    Fear,
    Happy,
    Neutral,
    Sad,
    Surprise,
}

impl EmotionClass {
    /// All classes in alphabetical order.
    pub const ALL: &'static [EmotionClass] = &[
        EmotionClass::Angry,
        EmotionClass::Disgust,
        EmotionClass::Fear,
        EmotionClass::Happy,
        EmotionClass::Neutral,
        EmotionClass::Sad,
        EmotionClass::Surprise,
    ];

    /// Returns the class name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionClass::Angry => "angry",
            EmotionClass::Disgust => "disgust",
            EmotionClass::Fear => "fear",
            EmotionClass::Happy => "happy",
            EmotionClass::Neutral => "neutral",
            EmotionClass::Sad => "sad",
            EmotionClass::Surprise => "surprise",
        }
    }

    /// Emoji shown next to the dominant class.
    pub fn emoji(&self) -> &'static str {
        match self {
            EmotionClass::Angry => "😠",
            EmotionClass::Disgust => "🤢",
            EmotionClass::Fear => "😨",
            EmotionClass::Happy => "😄",
            EmotionClass::Neutral => "😐",
            EmotionClass::Sad => "😢",
            EmotionClass::Surprise => "😮",
        }
    }
}

impl fmt::Display for EmotionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EmotionClass {
    type Err = ParseEmotionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "angry" | "anger" => Ok(EmotionClass::Angry),
            "disgust" => Ok(EmotionClass::Disgust),
            "fear" => Ok(EmotionClass::Fear),
            "happy" | "happiness" => Ok(EmotionClass::Happy),
            "neutral" => Ok(EmotionClass::Neutral),
            "sad" | "sadness" => Ok(EmotionClass::Sad),
            "surprise" => Ok(EmotionClass::Surprise),
            _ => Err(ParseEmotionError::UnknownClass(s.to_string())),
        }
    }
}

/// Errors parsing emotion names or layout presets.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseEmotionError {
    #[error("Unknown emotion class: {0}")]
    UnknownClass(String),

    #[error("Unknown class layout: {0} (expected mobile or desktop)")]
    UnknownLayout(String),
}

/// Ordered list of classes a classifier emits, one per vector position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ClassLayout {
    classes: Vec<EmotionClass>,
}

impl ClassLayout {
    /// Build a layout from an explicit class order.
    pub fn new(classes: Vec<EmotionClass>) -> Self {
        Self { classes }
    }

    /// Layout of the mobile classifier (neutral at index 4).
    pub fn mobile() -> Self {
        Self::new(vec![
            EmotionClass::Angry,
            EmotionClass::Disgust,
            EmotionClass::Fear,
            EmotionClass::Happy,
            EmotionClass::Neutral,
            EmotionClass::Sad,
            EmotionClass::Surprise,
        ])
    }

    /// Layout of the desktop prototype classifier (neutral at index 3).
    pub fn desktop() -> Self {
        Self::new(vec![
            EmotionClass::Fear,
            EmotionClass::Angry,
            EmotionClass::Sad,
            EmotionClass::Neutral,
            EmotionClass::Surprise,
            EmotionClass::Disgust,
            EmotionClass::Happy,
        ])
    }

    /// Resolve a named preset (`mobile` or `desktop`).
    pub fn from_preset(name: &str) -> Result<Self, ParseEmotionError> {
        match name.trim().to_lowercase().as_str() {
            "mobile" | "ios" => Ok(Self::mobile()),
            "desktop" | "prototype" => Ok(Self::desktop()),
            _ => Err(ParseEmotionError::UnknownLayout(name.to_string())),
        }
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Class emitted at position `index`, if any.
    pub fn class_at(&self, index: usize) -> Option<EmotionClass> {
        self.classes.get(index).copied()
    }

    /// Position of `class` in this layout, if present.
    pub fn index_of(&self, class: EmotionClass) -> Option<usize> {
        self.classes.iter().position(|c| *c == class)
    }

    /// Position of the neutral class, if the layout has one.
    pub fn neutral_index(&self) -> Option<usize> {
        self.index_of(EmotionClass::Neutral)
    }

    pub fn classes(&self) -> &[EmotionClass] {
        &self.classes
    }
}

impl Default for ClassLayout {
    fn default() -> Self {
        Self::mobile()
    }
}
