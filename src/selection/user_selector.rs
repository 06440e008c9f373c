//! Target-user sub-strategies for non-sequential selection
//!
//! The pool of selectable users shrinks by swap-removal; selectors get the
//! removed index so they can react without rescanning the pool.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Picks an index into the pool of selectable users
pub trait TargetUserSelector: Send {
    /// Forget any position state
    fn reset(&mut self);

    /// Index of the next target, `pool_len` is never zero
    fn next_index(&mut self, pool_len: usize, rng: &mut StdRng) -> usize;

    /// The user at `index` was swap-removed; the pool now has `pool_len` users
    fn removed(&mut self, index: usize, pool_len: usize);
}

/// Uniformly random target each iteration
#[derive(Clone, Debug, Default)]
pub struct RandomUserSelector;

impl TargetUserSelector for RandomUserSelector {
    fn reset(&mut self) {}

    fn next_index(&mut self, pool_len: usize, rng: &mut StdRng) -> usize {
        rng.gen_range(0..pool_len)
    }

    fn removed(&mut self, _index: usize, _pool_len: usize) {}
}

/// Cycles through the (shuffled) pool
#[derive(Clone, Debug, Default)]
pub struct RoundRobinUserSelector {
    cursor: usize,
}

impl TargetUserSelector for RoundRobinUserSelector {
    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn next_index(&mut self, pool_len: usize, _rng: &mut StdRng) -> usize {
        if self.cursor >= pool_len {
            self.cursor = 0;
        }
        let index = self.cursor;
        self.cursor += 1;
        index
    }

    fn removed(&mut self, index: usize, _pool_len: usize) {
        // the last user now sits at `index`; serve it before moving on
        if index < self.cursor {
            self.cursor = index;
        }
    }
}

/// Serializable choice of target-user sub-strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserSelection {
    /// Uniformly random target
    #[default]
    Random,
    /// Round-robin over a shuffled pool
    RoundRobin,
}

impl UserSelection {
    /// Instantiate the sub-strategy
    pub fn build(self) -> Box<dyn TargetUserSelector> {
        match self {
            Self::Random => Box::new(RandomUserSelector),
            Self::RoundRobin => Box::new(RoundRobinUserSelector::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_round_robin_cycles() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut rr = RoundRobinUserSelector::default();
        let order: Vec<usize> = (0..5).map(|_| rr.next_index(3, &mut rng)).collect();
        assert_eq!(order, vec![0, 1, 2, 0, 1]);
    }

    #[test]
    fn test_round_robin_serves_swapped_user() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut rr = RoundRobinUserSelector::default();
        assert_eq!(rr.next_index(3, &mut rng), 0);
        // user at 0 exhausted, last user moved into slot 0
        rr.removed(0, 2);
        assert_eq!(rr.next_index(2, &mut rng), 0);
        assert_eq!(rr.next_index(2, &mut rng), 1);
    }

    #[test]
    fn test_random_in_range() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut sel = UserSelection::Random.build();
        for _ in 0..100 {
            assert!(sel.next_index(4, &mut rng) < 4);
        }
    }
}
