//! Contact recommendation
//!
//! In an undirected network a recommended link is also consumed, and
//! scored, in the opposite direction. In a directed network that does not recommend
//! reciprocal links, the reverse pair is consumed with its own ground truth.

use std::sync::Arc;

use super::traits::{ground_truth, UpdateOutcome, UpdateStrategy};
use crate::data::Dataset;
use crate::selection::traits::SelectionStrategy;

/// Reciprocity-aware update for user-to-user datasets
#[derive(Default)]
pub struct ContactUpdate {
    dataset: Option<Arc<dyn Dataset>>,
}

impl ContactUpdate {
    /// Create a new contact update strategy
    pub fn new() -> Self {
        Self::default()
    }
}

impl UpdateStrategy for ContactUpdate {
    fn init(&mut self, dataset: &Arc<dyn Dataset>) {
        self.dataset = Some(Arc::clone(dataset));
    }

    fn select_update(
        &self,
        user: u32,
        item: u32,
        selection: &dyn SelectionStrategy,
    ) -> UpdateOutcome {
        if user == item || !selection.is_available(user, item) {
            return UpdateOutcome::empty();
        }
        let Some(data) = self.dataset.as_ref() else {
            return UpdateOutcome::empty();
        };

        let primary = ground_truth(Some(data), user, item);
        let mut outcome = UpdateOutcome::single(primary);

        if selection.is_available(item, user) {
            if !data.is_directed() {
                outcome.recommender.push(primary.reversed());
                outcome.metrics.push(primary.reversed());
            } else if !data.use_reciprocal() {
                outcome.recommender.push(ground_truth(Some(data), item, user));
            }
        }
        outcome
    }
}
