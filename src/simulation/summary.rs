//! Run summaries and aggregation over repetitions
//!
//! Metric values are `NaN` when undefined (empty catalog, no relevant
//! ratings left, ...). [`mean`] lets a `NaN` poison the average, which is
//! what [`aggregate`] reports; [`mean_ignoring_nan`] is the explicit filter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Metric values at one iteration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub iteration: usize,
    pub values: Vec<f64>,
}

/// Outcome of one finished run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Recommender name
    pub algorithm: String,
    /// Repetition index within the experiment
    pub repetition: usize,
    pub seed: u64,
    /// Completed interactions
    pub iterations: usize,
    /// Targets dropped for lack of candidates
    pub skipped: usize,
    pub elapsed_ms: u64,
    /// Why the run stopped
    pub finish_reason: String,
    /// Metric names, in the order of `final_values`
    pub metric_names: Vec<String>,
    pub final_values: Vec<f64>,
    /// Periodic metric snapshots, if requested
    #[serde(default)]
    pub history: Vec<MetricSnapshot>,
}

impl RunSummary {
    /// Final value of a metric by name
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metric_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.final_values[i])
    }
}

/// Averages of one algorithm over its repetitions
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateSummary {
    pub algorithm: String,
    pub repetitions: usize,
    pub mean_iterations: f64,
    /// Metric name → mean over repetitions (`NaN` propagates)
    pub metrics: BTreeMap<String, f64>,
}

/// Arithmetic mean; any `NaN` (or an empty slice) gives `NaN`
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean of the non-`NaN` values; `NaN` if none is left
pub fn mean_ignoring_nan(values: &[f64]) -> f64 {
    let kept: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    mean(&kept)
}

/// Group summaries by algorithm and average each metric
pub fn aggregate(summaries: &[RunSummary]) -> Vec<AggregateSummary> {
    let mut groups: BTreeMap<&str, Vec<&RunSummary>> = BTreeMap::new();
    for summary in summaries {
        groups.entry(&summary.algorithm).or_default().push(summary);
    }

    groups
        .into_iter()
        .map(|(algorithm, runs)| {
            let mut per_metric: BTreeMap<String, Vec<f64>> = BTreeMap::new();
            for run in &runs {
                for (name, &value) in run.metric_names.iter().zip(&run.final_values) {
                    per_metric.entry(name.clone()).or_default().push(value);
                }
            }
            let iterations: Vec<f64> = runs.iter().map(|r| r.iterations as f64).collect();
            AggregateSummary {
                algorithm: algorithm.to_string(),
                repetitions: runs.len(),
                mean_iterations: mean(&iterations),
                metrics: per_metric
                    .into_iter()
                    .map(|(name, values)| (name, mean(&values)))
                    .collect(),
            }
        })
        .collect()
}
