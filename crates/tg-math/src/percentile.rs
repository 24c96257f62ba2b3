//! Nearest-rank percentile estimation.
//!
//! For `n` sorted samples the p-th percentile is the sample at index
//! `ceil(p / 100 * n) - 1`, clamped to `[0, n - 1]`. No interpolation is
//! performed, so the result is always one of the inputs.

/// The percentile used for latency summaries and threshold suggestions.
pub const P95: f64 = 95.0;

/// Index of the p-th percentile in a sorted slice of length `n`.
///
/// Returns `None` for `n == 0`. Percentiles outside `(0, 100]` clamp to the
/// first or last element; a NaN `p` clamps to the first.
pub fn nearest_rank_index(p: f64, n: usize) -> Option<usize> {
    if n == 0 {
        return None;
    }
    let rank = (p / 100.0 * n as f64).ceil();
    let idx = if rank.is_nan() || rank < 1.0 {
        0
    } else {
        (rank as usize - 1).min(n - 1)
    };
    Some(idx)
}

/// Percentile of an already ascending-sorted slice. Returns 0 for empty input.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    nearest_rank_index(p, sorted.len())
        .map(|idx| sorted[idx])
        .unwrap_or(0.0)
}

/// Percentile of an unsorted sample. Returns 0 for empty input.
///
/// NaN samples are discarded before ranking.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);
    percentile_sorted(&sorted, p)
}
