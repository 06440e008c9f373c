//! Limited candidate pools
//!
//! Bounds the cost of large catalogs: each target is offered a fixed-size
//! sample of its available items that contains at least one relevant item
//! whenever one is still available.

use std::collections::BTreeSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::Rng;

use super::non_sequential::NonSequentialSelection;
use super::traits::SelectionStrategy;
use super::user_selector::UserSelection;
use crate::data::Dataset;
use crate::error::{SimError, SimResult};
use crate::warmup::Warmup;

/// Non-sequential selection with sampled candidate sets
pub struct LimitedSelection {
    inner: NonSequentialSelection,
    dataset: Option<Arc<dyn Dataset>>,
    size: usize,
}

impl LimitedSelection {
    /// Create with candidate sets of `size` items
    pub fn new(size: usize, users: UserSelection) -> SimResult<Self> {
        if size == 0 {
            return Err(SimError::Configuration(
                "candidate pool size must be positive".to_string(),
            ));
        }
        Ok(Self {
            inner: NonSequentialSelection::with_user_selection(users),
            dataset: None,
            size,
        })
    }

    /// Candidate set size
    pub fn size(&self) -> usize {
        self.size
    }
}

impl SelectionStrategy for LimitedSelection {
    fn init(
        &mut self,
        dataset: &Arc<dyn Dataset>,
        warmup: &Warmup,
        rng: &mut StdRng,
    ) -> SimResult<()> {
        self.dataset = Some(Arc::clone(dataset));
        self.inner.init(dataset, warmup, rng)
    }

    fn select_target(&mut self, rng: &mut StdRng) -> SimResult<Option<u32>> {
        self.inner.select_target(rng)
    }

    fn select_candidates(&mut self, user: u32, rng: &mut StdRng) -> Option<Vec<u32>> {
        let all = self.inner.select_candidates(user, rng)?;
        if all.len() <= self.size {
            return Some(all);
        }

        let mut chosen = BTreeSet::new();
        if let Some(data) = &self.dataset {
            let positives: Vec<u32> = all
                .iter()
                .copied()
                .filter(|&item| {
                    data.preference(user, item)
                        .map_or(false, |v| data.is_relevant(v))
                })
                .collect();
            if !positives.is_empty() {
                chosen.insert(positives[rng.gen_range(0..positives.len())]);
            }
        }

        // reject and resample on collision
        while chosen.len() < self.size {
            chosen.insert(all[rng.gen_range(0..all.len())]);
        }
        Some(chosen.into_iter().collect())
    }

    fn update(&mut self, user: u32, item: u32, value: f64) {
        self.inner.update(user, item, value);
    }

    fn is_available(&self, user: u32, item: u32) -> bool {
        self.inner.is_available(user, item)
    }
}
