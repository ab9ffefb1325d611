//! Dominant-class prediction derived from a stabilized probability vector.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::emotion::{ClassLayout, EmotionClass};

/// Arg-max of a probability vector, resolved against a class layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EmotionPrediction {
    /// Position of the dominant class in the vector
    pub index: usize,
    /// Dominant class
    pub class: EmotionClass,
    /// Probability of the dominant class
    pub confidence: f32,
}

impl EmotionPrediction {
    /// Pick the dominant class of `probabilities`.
    ///
    /// The first maximum wins ties and non-finite entries are skipped, so an
    /// all-zero vector resolves to index 0 with zero confidence. Returns
    /// `None` for an empty vector or when the winning index has no class in
    /// `layout`.
    pub fn from_probabilities(probabilities: &[f32], layout: &ClassLayout) -> Option<Self> {
        let mut best: Option<(usize, f32)> = None;
        for (index, &value) in probabilities.iter().enumerate() {
            if !value.is_finite() {
                continue;
            }
            match best {
                Some((_, current)) if value <= current => {}
                _ => best = Some((index, value)),
            }
        }

        let (index, confidence) = best?;
        let class = layout.class_at(index)?;
        Some(Self {
            index,
            class,
            confidence,
        })
    }

    pub fn label(&self) -> &'static str {
        self.class.as_str()
    }

    pub fn emoji(&self) -> &'static str {
        self.class.emoji()
    }

    /// Confidence as a whole percentage, as shown next to the label.
    pub fn confidence_percent(&self) -> u32 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_mobile_layout() {
        let probs = [0.05, 0.05, 0.1, 0.6, 0.1, 0.05, 0.05];
        let p = EmotionPrediction::from_probabilities(&probs, &ClassLayout::mobile()).unwrap();
        assert_eq!(p.index, 3);
        assert_eq!(p.class, EmotionClass::Happy);
        assert_eq!(p.label(), "happy");
        assert_eq!(p.confidence_percent(), 60);
    }

    #[test]
    fn test_same_index_differs_by_layout() {
        let probs = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        let desktop = EmotionPrediction::from_probabilities(&probs, &ClassLayout::desktop()).unwrap();
        assert_eq!(desktop.class, EmotionClass::Neutral);
    }

    #[test]
    fn test_ties_pick_first() {
        let probs = [0.5, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0];
        let p = EmotionPrediction::from_probabilities(&probs, &ClassLayout::mobile()).unwrap();
        assert_eq!(p.index, 0);
    }

    #[test]
    fn test_degenerate_inputs() {
        let layout = ClassLayout::mobile();
        assert!(EmotionPrediction::from_probabilities(&[], &layout).is_none());

        let zeros = EmotionPrediction::from_probabilities(&[0.0; 7], &layout).unwrap();
        assert_eq!(zeros.index, 0);
        assert_eq!(zeros.confidence, 0.0);

        let nan_first = [f32::NAN, 0.2, 0.1, 0.0, 0.0, 0.0, 0.0];
        let p = EmotionPrediction::from_probabilities(&nan_first, &layout).unwrap();
        assert_eq!(p.index, 1);
    }

    #[test]
    fn test_index_outside_layout() {
        let probs = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.9];
        assert!(EmotionPrediction::from_probabilities(&probs, &ClassLayout::mobile()).is_none());
    }
}
