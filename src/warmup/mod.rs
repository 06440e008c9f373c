//! Warm-up snapshots
//!
//! A [`Warmup`] replays historical interactions once before a run: it fixes
//! the training data handed to recommenders and removes the replayed pairs
//! from every user's availability set. It is immutable once built and is
//! shared between parallel runs through an `Arc`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{Dataset, Rating};
use crate::error::{SimError, SimResult};

/// Which training entries the full training list contains
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarmupKind {
    /// Only pairs present in the ground truth
    #[default]
    OnlyRatings,
    /// Also pairs absent from the ground truth, carrying the NaN sentinel
    Full,
}

/// Snapshot of the state after replaying the warm-up interactions
#[derive(Clone, Debug)]
pub struct Warmup {
    clean_training: Vec<Rating>,
    full_training: Vec<Rating>,
    availability: Vec<Vec<u32>>,
    num_relevant: usize,
}

impl Warmup {
    /// Snapshot with no historical interactions
    pub fn empty(dataset: &dyn Dataset) -> Self {
        Self::build(dataset, &[], WarmupKind::OnlyRatings)
            .unwrap_or_else(|_| unreachable!("an empty warm-up has no out-of-range pairs"))
    }

    /// Replay `training` pairs against the dataset
    ///
    /// Pairs are kept in the given order; repeated pairs are only replayed
    /// once. In an undirected contact network a link consumes both
    /// directions.
    pub fn build(
        dataset: &dyn Dataset,
        training: &[(u32, u32)],
        kind: WarmupKind,
    ) -> SimResult<Self> {
        let num_users = dataset.num_users();
        let num_items = dataset.num_items();
        let contact = dataset.is_contact();
        let undirected = contact && !dataset.is_directed();
        let no_reciprocal = contact && dataset.is_directed() && !dataset.use_reciprocal();

        let mut available: Vec<BTreeSet<u32>> = (0..num_users as u32)
            .map(|user| {
                let mut items: BTreeSet<u32> = dataset.all_item_indices().into_iter().collect();
                if contact {
                    items.remove(&user);
                }
                items
            })
            .collect();

        let mut seen = BTreeSet::new();
        let mut clean_training = Vec::new();
        let mut full_training = Vec::new();
        let mut num_relevant = 0;

        let mut replay = |user: u32, item: u32| {
            if !seen.insert((user, item)) {
                return;
            }
            available[user as usize].remove(&item);
            match dataset.preference(user, item) {
                Some(value) => {
                    if dataset.is_relevant(value) {
                        num_relevant += 1;
                    }
                    clean_training.push(Rating::new(user, item, value));
                    full_training.push(Rating::new(user, item, value));
                }
                None => {
                    if kind == WarmupKind::Full {
                        full_training.push(Rating::unknown(user, item));
                    }
                }
            }
        };

        for &(user, item) in training {
            if user as usize >= num_users || item as usize >= num_items {
                return Err(SimError::Configuration(format!(
                    "warm-up pair ({}, {}) outside the dataset",
                    user, item
                )));
            }
            if contact && user == item {
                continue;
            }
            replay(user, item);
            if undirected {
                replay(item, user);
            }
        }

        if no_reciprocal {
            for &(user, item) in training {
                if user != item && (user as usize) < num_users && (item as usize) < num_users {
                    available[item as usize].remove(&user);
                }
            }
        }

        debug!(
            pairs = training.len(),
            clean = clean_training.len(),
            full = full_training.len(),
            relevant = num_relevant,
            "warm-up built"
        );

        Ok(Self {
            clean_training,
            full_training,
            availability: available
                .into_iter()
                .map(|set| set.into_iter().collect())
                .collect(),
            num_relevant,
        })
    }

    /// Warm-up ratings present in the ground truth
    pub fn clean_training(&self) -> &[Rating] {
        &self.clean_training
    }

    /// Clean training plus sentinel entries, depending on [`WarmupKind`]
    pub fn full_training(&self) -> &[Rating] {
        &self.full_training
    }

    /// Items still eligible for a user after the warm-up, in index order
    pub fn availability(&self, user: u32) -> &[u32] {
        self.availability
            .get(user as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of users covered by the snapshot
    pub fn num_users(&self) -> usize {
        self.availability.len()
    }

    /// Relevant ratings already consumed by the warm-up
    pub fn num_relevant(&self) -> usize {
        self.num_relevant
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RatingMatrix;

    fn dataset() -> RatingMatrix {
        RatingMatrix::new(
            2,
            3,
            vec![Rating::new(0, 0, 1.0), Rating::new(0, 1, 0.0), Rating::new(1, 2, 1.0)],
            0.5,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_warmup_everything_available() {
        let data = dataset();
        let warmup = Warmup::empty(&data);
        assert_eq!(warmup.availability(0), &[0, 1, 2]);
        assert!(warmup.clean_training().is_empty());
        assert_eq!(warmup.num_relevant(), 0);
    }

    #[test]
    fn test_clean_and_full_training() {
        let data = dataset();
        let pairs = [(0, 0), (0, 2), (0, 0)];

        let only = Warmup::build(&data, &pairs, WarmupKind::OnlyRatings).unwrap();
        assert_eq!(only.clean_training().len(), 1);
        assert_eq!(only.full_training().len(), 1);
        assert_eq!(only.availability(0), &[1]);
        assert_eq!(only.num_relevant(), 1);

        let full = Warmup::build(&data, &pairs, WarmupKind::Full).unwrap();
        assert_eq!(full.full_training().len(), 2);
        assert!(!full.full_training()[1].is_known());
    }

    #[test]
    fn test_out_of_range_pair() {
        let data = dataset();
        assert!(Warmup::build(&data, &[(5, 0)], WarmupKind::Full).is_err());
    }

    #[test]
    fn test_contact_availability() {
        let net = RatingMatrix::contact(3, vec![Rating::new(0, 1, 1.0)], 0.5, false, true).unwrap();
        let warmup = Warmup::build(&net, &[(0, 1)], WarmupKind::OnlyRatings).unwrap();
        // no self-loops, both directions consumed
        assert_eq!(warmup.availability(0), &[2]);
        assert_eq!(warmup.availability(1), &[2]);
        assert_eq!(warmup.availability(2), &[0, 1]);
        assert_eq!(warmup.num_relevant(), 2);
    }

    #[test]
    fn test_directed_without_reciprocal() {
        let net = RatingMatrix::contact(2, vec![Rating::new(0, 1, 1.0)], 0.5, true, false).unwrap();
        let warmup = Warmup::build(&net, &[(0, 1)], WarmupKind::OnlyRatings).unwrap();
        assert!(warmup.availability(0).is_empty());
        assert!(warmup.availability(1).is_empty());
    }
}
