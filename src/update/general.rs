//! Standard rating datasets

use std::sync::Arc;

use super::traits::{ground_truth, UpdateOutcome, UpdateStrategy};
use crate::data::Dataset;
use crate::selection::traits::SelectionStrategy;

/// One tuple per decision: the ground-truth value, or NaN when absent
#[derive(Default)]
pub struct GeneralUpdate {
    dataset: Option<Arc<dyn Dataset>>,
}

impl GeneralUpdate {
    /// Create a new general update strategy
    pub fn new() -> Self {
        Self::default()
    }
}

impl UpdateStrategy for GeneralUpdate {
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
        UpdateOutcome::single(ground_truth(self.dataset.as_ref(), user, item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Rating, RatingMatrix};
    use crate::selection::prelude::*;
    use crate::warmup::Warmup;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_known_and_unknown_pairs() {
        let data: Arc<dyn Dataset> =
            Arc::new(RatingMatrix::new(1, 2, vec![Rating::new(0, 0, 0.0)], 0.5).unwrap());
        let warmup = Warmup::empty(data.as_ref());
        let mut rng = StdRng::seed_from_u64(0);
        let mut sel = NonSequentialSelection::with_user_selection(UserSelection::Random);
        sel.init(&data, &warmup, &mut rng).unwrap();

        let mut update = GeneralUpdate::new();
        update.init(&data);

        let known = update.select_update(0, 0, &sel);
        assert_eq!(known.primary().unwrap().value, 0.0);

        let unknown = update.select_update(0, 1, &sel);
        assert!(!unknown.primary().unwrap().is_known());

        sel.update(0, 1, f64::NAN);
        assert!(update.select_update(0, 1, &sel).is_empty());
    }
}
