//! Knowledge-filtered updates
//!
//! A side-channel dataset marks which pairs the user already knew about.
//! Only the chosen subset keeps its reward; the rest becomes the absent
//! sentinel.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::traits::{ground_truth, UpdateOutcome, UpdateStrategy};
use crate::data::{Dataset, Rating};
use crate::selection::traits::SelectionStrategy;
use crate::warmup::Warmup;

/// Which subset of pairs keeps its reward
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KnowledgeMode {
    /// Pairs present in the knowledge dataset
    Known,
    /// Pairs absent from the knowledge dataset
    Unknown,
}

/// Update restricted to known or unknown pairs
pub struct KnowledgeUpdate {
    knowledge: Arc<dyn Dataset>,
    mode: KnowledgeMode,
    dataset: Option<Arc<dyn Dataset>>,
}

impl KnowledgeUpdate {
    /// Create over a knowledge dataset
    pub fn new(knowledge: Arc<dyn Dataset>, mode: KnowledgeMode) -> Self {
        Self {
            knowledge,
            mode,
            dataset: None,
        }
    }

    fn keeps(&self, user: u32, item: u32) -> bool {
        let known = self.knowledge.preference(user, item).is_some();
        match self.mode {
            KnowledgeMode::Known => known,
            KnowledgeMode::Unknown => !known,
        }
    }

    fn filter(&self, rating: Rating) -> Rating {
        if self.keeps(rating.user, rating.item) {
            rating
        } else {
            Rating::unknown(rating.user, rating.item)
        }
    }
}

impl UpdateStrategy for KnowledgeUpdate {
    fn init(&mut self, dataset: &Arc<dyn Dataset>) {
        self.dataset = Some(Arc::clone(dataset));
    }

    fn select_update(
        &self,
        user: u32,
        item: u32,
        selection: &dyn SelectionStrategy,
    ) -> UpdateOutcome {
        if !selection.is_available(user, item) {
            return UpdateOutcome::empty();
        }
        UpdateOutcome::single(self.filter(ground_truth(self.dataset.as_ref(), user, item)))
    }

    fn training_list(&self, warmup: &Warmup) -> Vec<Rating> {
        warmup
            .full_training()
            .iter()
            .map(|&r| self.filter(r))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RatingMatrix;
    use crate::selection::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_known_and_unknown_modes() {
        let data: Arc<dyn Dataset> = Arc::new(
            RatingMatrix::new(1, 2, vec![Rating::new(0, 0, 1.0), Rating::new(0, 1, 1.0)], 0.5)
                .unwrap(),
        );
        let knowledge: Arc<dyn Dataset> =
            Arc::new(RatingMatrix::new(1, 2, vec![Rating::new(0, 0, 1.0)], 0.5).unwrap());
        let warmup = Warmup::empty(data.as_ref());
        let mut rng = StdRng::seed_from_u64(0);
        let mut sel = NonSequentialSelection::with_user_selection(UserSelection::Random);
        sel.init(&data, &warmup, &mut rng).unwrap();

        let mut known = KnowledgeUpdate::new(Arc::clone(&knowledge), KnowledgeMode::Known);
        known.init(&data);
        assert!(known.select_update(0, 0, &sel).primary().unwrap().is_known());
        assert!(!known.select_update(0, 1, &sel).primary().unwrap().is_known());

        let mut unknown = KnowledgeUpdate::new(knowledge, KnowledgeMode::Unknown);
        unknown.init(&data);
        assert!(!unknown.select_update(0, 0, &sel).primary().unwrap().is_known());
        assert!(unknown.select_update(0, 1, &sel).primary().unwrap().is_known());
    }
}
