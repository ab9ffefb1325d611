//! Per-face probability stabilizer.
//!
//! Converts one raw classifier vector into one stabilized vector per call:
//! 1. Boost the neutral class
//! 2. Renormalize to sum 1 (all-zero vectors stay all-zero)
//! 3. Exponential moving average (first frame bootstraps the state)
//! 4. Append the EMA output to a bounded ring buffer
//! 5. Aggregate the most recent frames per class (mean or lower median)

use std::collections::VecDeque;
use std::sync::Arc;

use fer_models::{ProbabilityVector, SmoothingConfig};
use tracing::debug;

use crate::metrics;
use crate::stats::aggregate_window;

/// Upper bound on up-front history allocation; larger windows grow on demand.
const PREALLOCATED_FRAMES: usize = 64;

/// Multiply the neutral entry by `neutral_boost` and renormalize.
///
/// Boosting is skipped when `raw` is too short to hold `neutral_index`.
/// A vector whose sum is not positive is returned as-is.
pub fn boost_and_renormalize(raw: &[f32], neutral_boost: f32, neutral_index: usize) -> ProbabilityVector {
    let mut adjusted = raw.to_vec();
    if let Some(neutral) = adjusted.get_mut(neutral_index) {
        *neutral *= neutral_boost;
    }

    let sum: f32 = adjusted.iter().sum();
    if sum > 0.0 {
        for p in adjusted.iter_mut() {
            *p /= sum;
        }
    }
    adjusted
}

/// EMA state and history for one tracked face.
#[derive(Debug, Clone)]
pub struct ProbabilityStabilizer {
    config: Arc<SmoothingConfig>,
    /// `None` until the first frame bootstraps it
    ema: Option<ProbabilityVector>,
    /// EMA outputs, oldest first
    history: VecDeque<ProbabilityVector>,
}

impl ProbabilityStabilizer {
    /// Create an empty stabilizer using `config`.
    pub fn new(config: Arc<SmoothingConfig>) -> Self {
        let capacity = config.history_window_size.clamp(1, PREALLOCATED_FRAMES);
        Self {
            config,
            ema: None,
            history: VecDeque::with_capacity(capacity),
        }
    }

    /// Smooth one raw probability vector and return the stabilized vector.
    ///
    /// Never fails: degenerate input produces the degenerate output described
    /// on [`boost_and_renormalize`]. Once bootstrapped the output length is
    /// the EMA's established length; a raw vector of a different length only
    /// blends into the overlapping classes.
    pub fn smooth(&mut self, raw: &[f32]) -> ProbabilityVector {
        let config = Arc::clone(&self.config);
        metrics::record_frame();
        self.inspect_input(raw, &config);

        let adjusted = boost_and_renormalize(raw, config.neutral_boost, config.neutral_index);

        match self.ema.as_mut() {
            None if adjusted.is_empty() => {
                debug!("Empty probability vector before bootstrap, stabilizer stays uninitialized");
                return Vec::new();
            }
            None => self.ema = Some(adjusted),
            Some(ema) => {
                if ema.len() != adjusted.len() {
                    metrics::record_length_mismatch();
                    debug!(
                        expected = ema.len(),
                        actual = adjusted.len(),
                        "Probability vector length mismatch, blending overlapping classes only"
                    );
                }
                let alpha = config.ema_alpha;
                for (state, value) in ema.iter_mut().zip(&adjusted) {
                    *state = alpha * value + (1.0 - alpha) * *state;
                }
            }
        }

        let Some(ema) = self.ema.as_ref() else {
            return Vec::new();
        };
        self.history.push_back(ema.clone());
        let capacity = config.history_window_size.max(1);
        while self.history.len() > capacity {
            self.history.pop_front();
        }

        aggregate_window(&self.history, config.frames_for_aggregate, config.aggregate_policy)
    }

    /// Use `config` for subsequent calls. EMA state and history are kept.
    pub fn reconfigure(&mut self, config: Arc<SmoothingConfig>) {
        self.config = config;
    }

    /// Clear EMA state and history; the next call bootstraps again.
    pub fn reset(&mut self) {
        self.ema = None;
        self.history.clear();
    }

    pub fn config(&self) -> &Arc<SmoothingConfig> {
        &self.config
    }

    /// Current EMA accumulator, `None` before the first frame.
    pub fn ema(&self) -> Option<&[f32]> {
        self.ema.as_deref()
    }

    pub fn is_initialized(&self) -> bool {
        self.ema.is_some()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Retained EMA outputs, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &[f32]> {
        self.history.iter().map(Vec::as_slice)
    }

    fn inspect_input(&self, raw: &[f32], config: &SmoothingConfig) {
        if raw.is_empty() {
            metrics::record_degenerate("empty");
            debug!("Empty probability vector");
            return;
        }
        if raw.iter().any(|p| !p.is_finite()) {
            metrics::record_degenerate("non_finite");
            debug!(?raw, "Non-finite probability in raw vector");
        } else if raw.iter().all(|p| *p == 0.0) {
            metrics::record_degenerate("zero_sum");
            debug!("All-zero probability vector");
        }
        if raw.len() <= config.neutral_index {
            debug!(
                len = raw.len(),
                neutral_index = config.neutral_index,
                "Vector too short for neutral index, boost skipped"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fer_models::AggregatePolicy;

    fn config(alpha: f32, history: usize, frames: usize, policy: AggregatePolicy) -> Arc<SmoothingConfig> {
        Arc::new(SmoothingConfig {
            neutral_boost: 1.0,
            neutral_index: 4,
            ema_alpha: alpha,
            history_window_size: history,
            frames_for_aggregate: frames,
            aggregate_policy: policy,
        })
    }

    fn assert_close(actual: &[f32], expected: &[f32], tol: f32) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < tol, "{:?} != {:?}", actual, expected);
        }
    }

    #[test]
    fn test_boost_and_renormalize_sums_to_one() {
        let raw = [0.3, 0.1, 0.05, 0.2, 0.15, 0.1, 0.4];
        let adjusted = boost_and_renormalize(&raw, 1.5, 4);
        let sum: f32 = adjusted.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(adjusted[4] > raw[4] / raw.iter().sum::<f32>());
    }

    #[test]
    fn test_boost_skipped_for_short_vector() {
        let adjusted = boost_and_renormalize(&[1.0, 3.0], 10.0, 4);
        assert_close(&adjusted, &[0.25, 0.75], 1e-6);
    }

    #[test]
    fn test_zero_vector_passes_through() {
        let adjusted = boost_and_renormalize(&[0.0; 7], 2.0, 4);
        assert_eq!(adjusted, vec![0.0; 7]);

        let mut stabilizer = ProbabilityStabilizer::new(config(0.5, 5, 5, AggregatePolicy::Mean));
        assert_eq!(stabilizer.smooth(&[0.0; 7]), vec![0.0; 7]);
    }

    #[test]
    fn test_non_finite_input_stays_in_its_class() {
        let mut stabilizer = ProbabilityStabilizer::new(config(0.5, 5, 5, AggregatePolicy::Median));
        // NaN sum skips renormalization
        let out = stabilizer.smooth(&[f32::NAN, 0.5, 0.5]);
        assert!(out[0].is_nan());
        assert_close(&out[1..], &[0.5, 0.5], 1e-6);

        // NaN is sticky in the EMA until reset; other classes stay finite
        let out = stabilizer.smooth(&[0.2, 0.4, 0.4]);
        assert!(out[0].is_nan());
        assert_close(&out[1..], &[0.5, 0.5], 1e-6);
        assert_close(&stabilizer.ema().unwrap()[1..], &[0.45, 0.45], 1e-6);

        stabilizer.reset();
        assert_close(&stabilizer.smooth(&[0.2, 0.4, 0.4]), &[0.2, 0.4, 0.4], 1e-6);
    }

    #[test]
    fn test_bootstrap_returns_adjusted_input() {
        let cfg = Arc::new(SmoothingConfig::default());
        let mut stabilizer = ProbabilityStabilizer::new(Arc::clone(&cfg));
        let raw = [0.2, 0.1, 0.1, 0.3, 0.1, 0.1, 0.1];

        let out = stabilizer.smooth(&raw);
        let expected = boost_and_renormalize(&raw, cfg.neutral_boost, cfg.neutral_index);
        assert_eq!(out, expected);
        assert_eq!(stabilizer.ema().unwrap(), expected.as_slice());
    }

    #[test]
    fn test_ema_blend() {
        let mut stabilizer = ProbabilityStabilizer::new(config(0.25, 10, 1, AggregatePolicy::Mean));
        stabilizer.smooth(&[1.0, 0.0]);
        let out = stabilizer.smooth(&[0.0, 1.0]);
        assert_close(&out, &[0.75, 0.25], 1e-6);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut stabilizer = ProbabilityStabilizer::new(config(0.5, 3, 3, AggregatePolicy::Mean));
        for _ in 0..10 {
            stabilizer.smooth(&[0.5, 0.5]);
            assert!(stabilizer.history_len() <= 3);
        }
        assert_eq!(stabilizer.history_len(), 3);
    }

    #[test]
    fn test_length_mismatch_keeps_established_length() {
        let mut stabilizer = ProbabilityStabilizer::new(config(0.5, 5, 1, AggregatePolicy::Mean));
        stabilizer.smooth(&[0.5, 0.25, 0.25]);

        let shorter = stabilizer.smooth(&[1.0, 0.0]);
        assert_eq!(shorter.len(), 3);
        assert_close(&shorter, &[0.75, 0.125, 0.25], 1e-6);

        let longer = stabilizer.smooth(&[0.0, 0.0, 0.0, 1.0]);
        assert_eq!(longer.len(), 3);
    }

    #[test]
    fn test_empty_input_before_bootstrap() {
        let mut stabilizer = ProbabilityStabilizer::new(config(0.5, 5, 5, AggregatePolicy::Median));
        assert!(stabilizer.smooth(&[]).is_empty());
        assert!(!stabilizer.is_initialized());
        assert_eq!(stabilizer.history_len(), 0);
    }

    #[test]
    fn test_reconfigure_keeps_history() {
        let mut stabilizer = ProbabilityStabilizer::new(config(0.5, 5, 5, AggregatePolicy::Mean));
        stabilizer.smooth(&[1.0, 0.0]);
        stabilizer.smooth(&[0.0, 1.0]);
        let before: Vec<Vec<f32>> = stabilizer.history().map(<[f32]>::to_vec).collect();

        stabilizer.reconfigure(config(1.0, 5, 1, AggregatePolicy::Mean));
        let after: Vec<Vec<f32>> = stabilizer.history().map(<[f32]>::to_vec).collect();
        assert_eq!(before, after);

        // alpha = 1.0 now replaces the EMA outright, window of 1 shows it
        let out = stabilizer.smooth(&[1.0, 0.0]);
        assert_close(&out, &[1.0, 0.0], 1e-6);
    }

    #[test]
    fn test_shrinking_history_trims_on_next_frame() {
        let mut stabilizer = ProbabilityStabilizer::new(config(0.5, 10, 10, AggregatePolicy::Mean));
        for _ in 0..8 {
            stabilizer.smooth(&[0.5, 0.5]);
        }
        stabilizer.reconfigure(config(0.5, 4, 10, AggregatePolicy::Mean));
        assert_eq!(stabilizer.history_len(), 8);
        stabilizer.smooth(&[0.5, 0.5]);
        assert_eq!(stabilizer.history_len(), 4);
    }

    #[test]
    fn test_reset_restores_bootstrap() {
        let mut stabilizer = ProbabilityStabilizer::new(config(0.3, 5, 5, AggregatePolicy::Median));
        stabilizer.smooth(&[0.9, 0.1]);
        stabilizer.smooth(&[0.2, 0.8]);
        stabilizer.reset();

        assert!(!stabilizer.is_initialized());
        assert_eq!(stabilizer.history_len(), 0);
        assert_close(&stabilizer.smooth(&[0.2, 0.8]), &[0.2, 0.8], 1e-6);
    }
}
