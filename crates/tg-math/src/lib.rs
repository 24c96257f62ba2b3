//! Trend gate math utilities.
//!
//! Percentiles use the nearest-rank method so that numbers reproduce
//! exactly across implementations; rates are total over empty denominators.

pub mod percentile;
pub mod rate;

pub use percentile::{nearest_rank_index, percentile, percentile_sorted, P95};
pub use rate::{degradation_decrease, degradation_increase, ratio};
