//! Rate arithmetic.

/// `numerator / denominator`, or 0 when the denominator is 0.
pub fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Degradation of a higher-is-better metric: `max(0, previous - current)`.
pub fn degradation_decrease(previous: f64, current: f64) -> f64 {
    (previous - current).max(0.0)
}

/// Degradation of a lower-is-better metric: `max(0, current - previous)`.
pub fn degradation_increase(previous: f64, current: f64) -> f64 {
    (current - previous).max(0.0)
}
