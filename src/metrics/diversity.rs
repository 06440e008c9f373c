//! Diversity and novelty metrics

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::warn;

use super::gini::GiniIndex;
use super::traits::CumulativeMetric;
use crate::data::{Dataset, Rating};
use crate::warmup::Warmup;

/// Gini index of how often each item has been recommended
#[derive(Clone, Debug)]
pub struct CumulativeGini {
    index: GiniIndex,
}

impl CumulativeGini {
    /// Create an unattached metric; the catalog size is taken at reset
    pub fn new() -> Self {
        Self {
            index: GiniIndex::new(0),
        }
    }
}

impl Default for CumulativeGini {
    fn default() -> Self {
        Self::new()
    }
}

impl CumulativeMetric for CumulativeGini {
    fn name(&self) -> &str {
        "gini"
    }

    fn reset(&mut self, dataset: &Arc<dyn Dataset>, _warmup: &Warmup) {
        self.index = GiniIndex::new(dataset.num_items());
    }

    fn update(&mut self, rating: &Rating) {
        if let Err(e) = self.index.update_frequency(rating.item, 1) {
            warn!(error = %e, "gini update skipped");
        }
    }

    fn value(&self) -> f64 {
        self.index.value()
    }
}

/// Gini index over the last `window` recommendations
#[derive(Clone, Debug)]
pub struct WindowedGini {
    index: GiniIndex,
    window: usize,
    recent: VecDeque<u32>,
}

impl WindowedGini {
    /// Create a windowed metric; a zero window is treated as one
    pub fn new(window: usize) -> Self {
        Self {
            index: GiniIndex::new(0),
            window: window.max(1),
            recent: VecDeque::new(),
        }
    }
}

impl CumulativeMetric for WindowedGini {
    fn name(&self) -> &str {
        "gini-window"
    }

    fn reset(&mut self, dataset: &Arc<dyn Dataset>, _warmup: &Warmup) {
        self.index = GiniIndex::new(dataset.num_items());
        self.recent.clear();
    }

    fn update(&mut self, rating: &Rating) {
        if let Err(e) = self.index.update_frequency(rating.item, 1) {
            warn!(error = %e, "gini update skipped");
            return;
        }
        self.recent.push_back(rating.item);
        if self.recent.len() > self.window {
            if let Some(oldest) = self.recent.pop_front() {
                // the item was counted when it entered the window
                if let Err(e) = self.index.update_frequency(oldest, -1) {
                    warn!(item = oldest, error = %e, "gini eviction skipped");
                }
            }
        }
    }

    fn value(&self) -> f64 {
        self.index.value()
    }
}

/// Mean popularity complement `1 − pop(i) / |U|` of recommended items
#[derive(Clone, Debug, Default)]
pub struct PopularityComplement {
    complement: Vec<f64>,
    sum: f64,
    count: usize,
}

impl PopularityComplement {
    /// Create an unattached metric; popularity is captured at reset
    pub fn new() -> Self {
        Self::default()
    }
}

impl CumulativeMetric for PopularityComplement {
    fn name(&self) -> &str {
        "popularity-complement"
    }

    fn reset(&mut self, dataset: &Arc<dyn Dataset>, _warmup: &Warmup) {
        let users = dataset.num_users().max(1) as f64;
        self.complement = (0..dataset.num_items() as u32)
            .map(|item| 1.0 - dataset.item_popularity(item) as f64 / users)
            .collect();
        self.sum = 0.0;
        self.count = 0;
    }

    fn update(&mut self, rating: &Rating) {
        if let Some(&c) = self.complement.get(rating.item as usize) {
            self.sum += c;
            self.count += 1;
        }
    }

    fn value(&self) -> f64 {
        if self.count == 0 {
            return f64::NAN;
        }
        self.sum / self.count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RatingMatrix;

    fn setup() -> (Arc<dyn Dataset>, Warmup) {
        let data = RatingMatrix::new(
            2,
            3,
            vec![Rating::new(0, 0, 1.0), Rating::new(1, 0, 1.0), Rating::new(1, 1, 1.0)],
            0.5,
        )
        .unwrap();
        let warmup = Warmup::empty(&data);
        (Arc::new(data), warmup)
    }

    #[test]
    fn test_cumulative_gini() {
        let (data, warmup) = setup();
        let mut gini = CumulativeGini::new();
        gini.reset(&data, &warmup);
        assert!(gini.value().is_nan());
        gini.update(&Rating::new(0, 0, 1.0));
        assert!((gini.value() - 1.0).abs() < 1e-12);
        gini.update(&Rating::new(0, 1, 1.0));
        gini.update(&Rating::new(0, 2, 1.0));
        assert!(gini.value().abs() < 1e-12);
    }

    #[test]
    fn test_windowed_gini_forgets() {
        let (data, warmup) = setup();
        let mut gini = WindowedGini::new(2);
        gini.reset(&data, &warmup);
        gini.update(&Rating::new(0, 0, 1.0));
        gini.update(&Rating::new(0, 1, 1.0));
        gini.update(&Rating::new(0, 1, 1.0));
        // window holds [1, 1]
        assert!((gini.value() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_popularity_complement() {
        let (data, warmup) = setup();
        let mut pc = PopularityComplement::new();
        pc.reset(&data, &warmup);
        assert!(pc.value().is_nan());
        pc.update(&Rating::new(0, 0, 1.0)); // 1 - 2/2
        pc.update(&Rating::new(0, 2, 1.0)); // 1 - 0/2
        assert!((pc.value() - 0.5).abs() < 1e-12);
    }
}
