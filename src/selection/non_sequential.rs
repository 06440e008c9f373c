//! Non-sequential selection
//!
//! Targets are resampled every iteration from a static preference matrix.
//! Each user keeps an availability set seeded from the warm-up; a consumed
//! item leaves the set and a user whose set empties leaves the pool.

use std::collections::BTreeSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::traits::SelectionStrategy;
use super::user_selector::{TargetUserSelector, UserSelection};
use crate::data::Dataset;
use crate::error::SimResult;
use crate::warmup::Warmup;

/// Resampling selection over per-user availability sets
pub struct NonSequentialSelection {
    selector: Box<dyn TargetUserSelector>,
    pool: Vec<u32>,
    positions: Vec<Option<usize>>,
    available: Vec<BTreeSet<u32>>,
}

impl NonSequentialSelection {
    /// Create with the given target-user sub-strategy
    pub fn new(selector: Box<dyn TargetUserSelector>) -> Self {
        Self {
            selector,
            pool: Vec::new(),
            positions: Vec::new(),
            available: Vec::new(),
        }
    }

    /// Create from a serializable sub-strategy choice
    pub fn with_user_selection(selection: UserSelection) -> Self {
        Self::new(selection.build())
    }

    /// Number of users that can still be targeted
    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    /// Items still eligible for a user, in index order
    pub fn available_items(&self, user: u32) -> Vec<u32> {
        self.available
            .get(user as usize)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    fn remove_user(&mut self, user: u32) {
        let Some(index) = self.positions.get_mut(user as usize).and_then(Option::take) else {
            return;
        };
        self.pool.swap_remove(index);
        if let Some(&moved) = self.pool.get(index) {
            self.positions[moved as usize] = Some(index);
        }
        self.selector.removed(index, self.pool.len());
    }
}

impl SelectionStrategy for NonSequentialSelection {
    fn init(
        &mut self,
        dataset: &Arc<dyn Dataset>,
        warmup: &Warmup,
        rng: &mut StdRng,
    ) -> SimResult<()> {
        let num_users = dataset.num_users();
        self.available = (0..num_users as u32)
            .map(|user| warmup.availability(user).iter().copied().collect())
            .collect();

        self.pool = (0..num_users as u32)
            .filter(|&user| !self.available[user as usize].is_empty())
            .collect();
        self.pool.shuffle(rng);

        self.positions = vec![None; num_users];
        for (index, &user) in self.pool.iter().enumerate() {
            self.positions[user as usize] = Some(index);
        }
        self.selector.reset();
        Ok(())
    }

    fn select_target(&mut self, rng: &mut StdRng) -> SimResult<Option<u32>> {
        if self.pool.is_empty() {
            return Ok(None);
        }
        let index = self.selector.next_index(self.pool.len(), rng);
        Ok(self.pool.get(index).copied())
    }

    fn select_candidates(&mut self, user: u32, _rng: &mut StdRng) -> Option<Vec<u32>> {
        let items = self.available_items(user);
        if items.is_empty() {
            self.remove_user(user);
            None
        } else {
            Some(items)
        }
    }

    fn update(&mut self, user: u32, item: u32, _value: f64) {
        let Some(set) = self.available.get_mut(user as usize) else {
            return;
        };
        if set.remove(&item) && set.is_empty() {
            self.remove_user(user);
        }
    }

    fn is_available(&self, user: u32, item: u32) -> bool {
        self.available
            .get(user as usize)
            .map_or(false, |set| set.contains(&item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Rating, RatingMatrix};
    use rand::SeedableRng;
    use std::collections::BTreeSet;

    fn dataset() -> Arc<dyn Dataset> {
        Arc::new(
            RatingMatrix::new(2, 2, vec![Rating::new(0, 0, 1.0), Rating::new(1, 1, 1.0)], 0.5)
                .unwrap(),
        )
    }

    #[test]
    fn test_user_exhaustion() {
        let data = dataset();
        let warmup = Warmup::build(data.as_ref(), &[(1, 0), (1, 1)], Default::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let mut sel = NonSequentialSelection::with_user_selection(UserSelection::Random);
        sel.init(&data, &warmup, &mut rng).unwrap();

        // user 1 was fully consumed by the warm-up
        assert_eq!(sel.pool_len(), 1);

        let mut served = BTreeSet::new();
        while let Some(user) = sel.select_target(&mut rng).unwrap() {
            assert_eq!(user, 0);
            let candidates = sel.select_candidates(user, &mut rng).unwrap();
            let item = candidates[0];
            assert!(served.insert(item), "item {} offered twice", item);
            sel.update(user, item, 1.0);
        }
        assert_eq!(served, BTreeSet::from([0, 1]));
        assert_eq!(sel.pool_len(), 0);
        assert!(!sel.is_available(0, 0));
    }

    #[test]
    fn test_removed_user_never_returns() {
        let data = dataset();
        let warmup = Warmup::empty(data.as_ref());
        let mut rng = StdRng::seed_from_u64(5);
        let mut sel = NonSequentialSelection::with_user_selection(UserSelection::RoundRobin);
        sel.init(&data, &warmup, &mut rng).unwrap();

        sel.update(0, 0, 1.0);
        sel.update(0, 1, 1.0);
        for _ in 0..20 {
            assert_eq!(sel.select_target(&mut rng).unwrap(), Some(1));
        }
    }
}
