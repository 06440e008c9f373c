//! Hit-based metrics: recall and click-through rate

use std::collections::VecDeque;
use std::sync::Arc;

use super::traits::CumulativeMetric;
use crate::data::{Dataset, Rating};
use crate::warmup::Warmup;

fn is_hit(dataset: Option<&Arc<dyn Dataset>>, rating: &Rating) -> bool {
    match dataset {
        Some(data) => rating.is_known() && data.is_relevant(rating.value),
        None => false,
    }
}

/// Fraction of the relevant pairs left after warm-up that have been hit
#[derive(Default)]
pub struct CumulativeRecall {
    dataset: Option<Arc<dyn Dataset>>,
    total: usize,
    hits: usize,
}

impl CumulativeRecall {
    /// Create an unattached metric; the denominator is fixed at reset
    pub fn new() -> Self {
        Self::default()
    }
}

impl CumulativeMetric for CumulativeRecall {
    fn name(&self) -> &str {
        "recall"
    }

    fn reset(&mut self, dataset: &Arc<dyn Dataset>, warmup: &Warmup) {
        self.total = dataset.num_relevant().saturating_sub(warmup.num_relevant());
        self.dataset = Some(Arc::clone(dataset));
        self.hits = 0;
    }

    fn update(&mut self, rating: &Rating) {
        if is_hit(self.dataset.as_ref(), rating) {
            self.hits += 1;
        }
    }

    fn value(&self) -> f64 {
        if self.total == 0 {
            return f64::NAN;
        }
        self.hits as f64 / self.total as f64
    }
}

/// Fraction of recommendations that were hits
///
/// Pairs absent from the ground truth count as shown but not clicked.
#[derive(Default)]
pub struct ClickThroughRate {
    dataset: Option<Arc<dyn Dataset>>,
    shown: usize,
    hits: usize,
}

impl ClickThroughRate {
    /// Create a new click-through rate metric
    pub fn new() -> Self {
        Self::default()
    }
}

impl CumulativeMetric for ClickThroughRate {
    fn name(&self) -> &str {
        "ctr"
    }

    fn reset(&mut self, dataset: &Arc<dyn Dataset>, _warmup: &Warmup) {
        self.dataset = Some(Arc::clone(dataset));
        self.shown = 0;
        self.hits = 0;
    }

    fn update(&mut self, rating: &Rating) {
        self.shown += 1;
        if is_hit(self.dataset.as_ref(), rating) {
            self.hits += 1;
        }
    }

    fn value(&self) -> f64 {
        if self.shown == 0 {
            return f64::NAN;
        }
        self.hits as f64 / self.shown as f64
    }
}

/// Click-through rate over the last `window` recommendations only
pub struct WindowedClickThroughRate {
    dataset: Option<Arc<dyn Dataset>>,
    window: usize,
    recent: VecDeque<bool>,
    hits: usize,
}

impl WindowedClickThroughRate {
    /// Create a windowed metric; a zero window is treated as one
    pub fn new(window: usize) -> Self {
        Self {
            dataset: None,
            window: window.max(1),
            recent: VecDeque::new(),
            hits: 0,
        }
    }
}

impl CumulativeMetric for WindowedClickThroughRate {
    fn name(&self) -> &str {
        "ctr-window"
    }

    fn reset(&mut self, dataset: &Arc<dyn Dataset>, _warmup: &Warmup) {
        self.dataset = Some(Arc::clone(dataset));
        self.recent.clear();
        self.hits = 0;
    }

    fn update(&mut self, rating: &Rating) {
        let hit = is_hit(self.dataset.as_ref(), rating);
        self.recent.push_back(hit);
        if hit {
            self.hits += 1;
        }
        if self.recent.len() > self.window && self.recent.pop_front() == Some(true) {
            self.hits -= 1;
        }
    }

    fn value(&self) -> f64 {
        if self.recent.is_empty() {
            return f64::NAN;
        }
        self.hits as f64 / self.recent.len() as f64
    }
}
