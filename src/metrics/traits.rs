//! Metric traits

use std::sync::Arc;

use crate::data::{Dataset, Rating};
use crate::warmup::Warmup;

/// Streaming statistic updated one reward tuple at a time
///
/// Degenerate states (nothing observed, empty catalog) report `NaN`. NaN
/// propagates through averaging, so callers aggregating repeated runs must
/// filter it explicitly.
pub trait CumulativeMetric: Send {
    /// Short identifier used in summaries
    fn name(&self) -> &str;

    /// Clear all state and attach to the dataset of the coming run
    fn reset(&mut self, dataset: &Arc<dyn Dataset>, warmup: &Warmup);

    /// Account for one reward tuple
    fn update(&mut self, rating: &Rating);

    /// Current value
    fn value(&self) -> f64;
}
