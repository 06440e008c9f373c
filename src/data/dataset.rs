//! Dataset capabilities consumed by the simulation
//!
//! The simulation never parses files; it only asks a [`Dataset`] for ground
//! truth. [`RatingMatrix`] is an in-memory implementation.

use std::collections::BTreeMap;

use super::rating::Rating;
use crate::error::{SimError, SimResult};

/// Ground truth consulted by selection, update strategies and metrics
pub trait Dataset: Send + Sync {
    /// Number of users (user indices are `0..num_users`)
    fn num_users(&self) -> usize;

    /// Number of items (item indices are `0..num_items`)
    fn num_items(&self) -> usize;

    /// Ground-truth value of a pair, `None` if absent
    fn preference(&self, user: u32, item: u32) -> Option<f64>;

    /// All known (item, value) pairs of a user, ordered by item
    fn user_preferences(&self, user: u32) -> Vec<(u32, f64)>;

    /// Whether an observed value counts as a relevant hit
    fn is_relevant(&self, value: f64) -> bool;

    /// Total number of relevant pairs in the ground truth
    fn num_relevant(&self) -> usize;

    /// Number of users holding a value for the item
    fn item_popularity(&self, item: u32) -> usize;

    /// All item indices, in index order
    fn all_item_indices(&self) -> Vec<u32> {
        (0..self.num_items() as u32).collect()
    }

    /// Contact datasets: whether links are directed
    fn is_directed(&self) -> bool {
        true
    }

    /// Contact datasets: whether reciprocal links may be recommended
    fn use_reciprocal(&self) -> bool {
        true
    }

    /// Contact datasets: users and items share one index space
    fn is_contact(&self) -> bool {
        false
    }
}

/// In-memory preference matrix
#[derive(Clone, Debug)]
pub struct RatingMatrix {
    rows: Vec<BTreeMap<u32, f64>>,
    popularity: Vec<usize>,
    num_items: usize,
    relevance_threshold: f64,
    num_relevant: usize,
    contact: bool,
    directed: bool,
    reciprocal: bool,
}

impl RatingMatrix {
    /// Create a matrix from ratings
    ///
    /// Later ratings for the same pair overwrite earlier ones.
    pub fn new(
        num_users: usize,
        num_items: usize,
        ratings: impl IntoIterator<Item = Rating>,
        relevance_threshold: f64,
    ) -> SimResult<Self> {
        let mut matrix = Self {
            rows: vec![BTreeMap::new(); num_users],
            popularity: vec![0; num_items],
            num_items,
            relevance_threshold,
            num_relevant: 0,
            contact: false,
            directed: true,
            reciprocal: true,
        };
        for rating in ratings {
            matrix.insert(rating)?;
        }
        Ok(matrix)
    }

    /// Create a contact (user-to-user) network from links
    ///
    /// In an undirected network every link is stored in both directions.
    pub fn contact(
        num_users: usize,
        links: impl IntoIterator<Item = Rating>,
        relevance_threshold: f64,
        directed: bool,
        reciprocal: bool,
    ) -> SimResult<Self> {
        let mut matrix = Self::new(num_users, num_users, Vec::new(), relevance_threshold)?;
        matrix.contact = true;
        matrix.directed = directed;
        matrix.reciprocal = reciprocal;
        for link in links {
            if link.user == link.item {
                continue;
            }
            matrix.insert(link)?;
            if !directed {
                matrix.insert(link.reversed())?;
            }
        }
        Ok(matrix)
    }

    fn insert(&mut self, rating: Rating) -> SimResult<()> {
        if rating.user as usize >= self.rows.len() || rating.item as usize >= self.num_items {
            return Err(SimError::Configuration(format!(
                "rating ({}, {}) outside a {}x{} matrix",
                rating.user,
                rating.item,
                self.rows.len(),
                self.num_items
            )));
        }
        if !rating.is_known() {
            return Err(SimError::Configuration(format!(
                "rating ({}, {}) has no value",
                rating.user, rating.item
            )));
        }

        let previous = self.rows[rating.user as usize].insert(rating.item, rating.value);
        match previous {
            Some(old) => {
                if self.is_relevant(old) {
                    self.num_relevant -= 1;
                }
            }
            None => self.popularity[rating.item as usize] += 1,
        }
        if self.is_relevant(rating.value) {
            self.num_relevant += 1;
        }
        Ok(())
    }

    /// Relevance threshold in use
    pub fn relevance_threshold(&self) -> f64 {
        self.relevance_threshold
    }

    /// Total number of stored pairs
    pub fn num_ratings(&self) -> usize {
        self.rows.iter().map(BTreeMap::len).sum()
    }

    /// All stored ratings, ordered by user then item
    pub fn ratings(&self) -> impl Iterator<Item = Rating> + '_ {
        self.rows.iter().enumerate().flat_map(|(user, row)| {
            row.iter()
                .map(move |(&item, &value)| Rating::new(user as u32, item, value))
        })
    }
}

impl Dataset for RatingMatrix {
    fn num_users(&self) -> usize {
        self.rows.len()
    }

    fn num_items(&self) -> usize {
        self.num_items
    }

    fn preference(&self, user: u32, item: u32) -> Option<f64> {
        self.rows
            .get(user as usize)
            .and_then(|row| row.get(&item))
            .copied()
    }

    fn user_preferences(&self, user: u32) -> Vec<(u32, f64)> {
        self.rows
            .get(user as usize)
            .map(|row| row.iter().map(|(&i, &v)| (i, v)).collect())
            .unwrap_or_default()
    }

    fn is_relevant(&self, value: f64) -> bool {
        value >= self.relevance_threshold
    }

    fn num_relevant(&self) -> usize {
        self.num_relevant
    }

    fn item_popularity(&self, item: u32) -> usize {
        self.popularity.get(item as usize).copied().unwrap_or(0)
    }

    fn is_directed(&self) -> bool {
        self.directed
    }

    fn use_reciprocal(&self) -> bool {
        self.reciprocal
    }

    fn is_contact(&self) -> bool {
        self.contact
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> RatingMatrix {
        RatingMatrix::new(
            2,
            3,
            vec![
                Rating::new(0, 0, 5.0),
                Rating::new(0, 2, 1.0),
                Rating::new(1, 2, 4.0),
            ],
            3.0,
        )
        .unwrap()
    }

    #[test]
    fn test_preferences() {
        let m = small();
        assert_eq!(m.preference(0, 0), Some(5.0));
        assert_eq!(m.preference(0, 1), None);
        assert_eq!(m.user_preferences(0), vec![(0, 5.0), (2, 1.0)]);
        assert_eq!(m.num_relevant(), 2);
        assert_eq!(m.item_popularity(2), 2);
        assert_eq!(m.all_item_indices(), vec![0, 1, 2]);
    }

    #[test]
    fn test_overwrite_keeps_counts_consistent() {
        let m = RatingMatrix::new(
            1,
            1,
            vec![Rating::new(0, 0, 5.0), Rating::new(0, 0, 1.0)],
            3.0,
        )
        .unwrap();
        assert_eq!(m.num_relevant(), 0);
        assert_eq!(m.item_popularity(0), 1);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let result = RatingMatrix::new(1, 1, vec![Rating::new(0, 3, 1.0)], 0.5);
        assert!(matches!(result, Err(SimError::Configuration(_))));
    }

    #[test]
    fn test_undirected_contact_is_symmetric() {
        let m = RatingMatrix::contact(
            3,
            vec![Rating::new(0, 1, 1.0), Rating::new(2, 2, 1.0)],
            0.5,
            false,
            true,
        )
        .unwrap();
        assert!(m.is_contact());
        assert!(!m.is_directed());
        assert_eq!(m.preference(1, 0), Some(1.0));
        // self-loops are dropped
        assert_eq!(m.preference(2, 2), None);
        assert_eq!(m.num_relevant(), 2);
    }
}
