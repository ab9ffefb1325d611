//! Statistical helpers for windowed aggregation.
//!
//! - Basic statistics (mean, lower median)
//! - Per-class aggregation over a window of probability vectors

use std::collections::VecDeque;

use fer_models::AggregatePolicy;

/// Calculate the arithmetic mean of a slice of values.
pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

/// Calculate the lower median of a slice of values.
///
/// Returns `sorted[len / 2]`. For even lengths this is the upper of the two
/// middle elements; no interpolation, so the result is always an observed
/// value. NaN sorts above every number.
pub fn lower_median(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);
    sorted[sorted.len() / 2]
}

/// Aggregate the most recent `window` entries of `history` per class.
///
/// `window` is clamped to `[1, history.len()]`. The output length is the
/// length of the newest entry; a class missing from an older entry is left
/// out of that class's sample.
pub fn aggregate_window(
    history: &VecDeque<Vec<f32>>,
    window: usize,
    policy: AggregatePolicy,
) -> Vec<f32> {
    let Some(newest) = history.back() else {
        return Vec::new();
    };
    let window = window.clamp(1, history.len());
    let start = history.len() - window;

    let mut column = Vec::with_capacity(window);
    (0..newest.len())
        .map(|class| {
            column.clear();
            column.extend(history.range(start..).filter_map(|frame| frame.get(class).copied()));
            match policy {
                AggregatePolicy::Mean => mean(&column),
                AggregatePolicy::Median => lower_median(&column),
            }
        })
        .collect()
}
