//! Update strategy trait

use std::sync::Arc;

use crate::data::{Dataset, Rating};
use crate::selection::traits::SelectionStrategy;
use crate::warmup::Warmup;

/// Reward tuples produced for one decision
///
/// `recommender` tuples feed the recommender and the selection bookkeeping,
/// `metrics` tuples feed the metrics and the end condition. Both are empty
/// when the decision yields no observable reward.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateOutcome {
    /// Tuples the recommender learns from
    pub recommender: Vec<Rating>,
    /// Tuples the metrics account for
    pub metrics: Vec<Rating>,
}

impl UpdateOutcome {
    /// No reward at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// One tuple shared by recommender and metrics
    pub fn single(rating: Rating) -> Self {
        Self {
            recommender: vec![rating],
            metrics: vec![rating],
        }
    }

    /// The reward of the decision itself
    pub fn primary(&self) -> Option<&Rating> {
        self.metrics.first()
    }

    /// True when nothing was produced
    pub fn is_empty(&self) -> bool {
        self.recommender.is_empty() && self.metrics.is_empty()
    }
}

/// Turns a decision plus ground truth into reward tuples
pub trait UpdateStrategy: Send {
    /// Attach to the dataset of the coming run
    fn init(&mut self, dataset: &Arc<dyn Dataset>);

    /// Resolve the decision `(user, item)`
    fn select_update(
        &self,
        user: u32,
        item: u32,
        selection: &dyn SelectionStrategy,
    ) -> UpdateOutcome;

    /// Warm-up ratings the recommender is trained on
    fn training_list(&self, warmup: &Warmup) -> Vec<Rating> {
        warmup.full_training().to_vec()
    }
}

/// Ground truth of a pair or the absent sentinel
pub(crate) fn ground_truth(dataset: Option<&Arc<dyn Dataset>>, user: u32, item: u32) -> Rating {
    match dataset.and_then(|d| d.preference(user, item)) {
        Some(value) => Rating::new(user, item, value),
        None => Rating::unknown(user, item),
    }
}
