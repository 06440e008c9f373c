//! Incremental Gini index
//!
//! Keeps the Gini coefficient of an item-frequency vector up to date in
//! O(log n) per unit update instead of re-sorting the whole vector.
//!
//! Frequencies are viewed as sorted ascending with 1-based ranks. Items
//! sharing a frequency occupy a contiguous rank interval, so only the
//! *distinct* frequencies are stored, each with its `[min, max]` interval.
//! The coefficient is
//!
//! ```text
//! G = Σ freq_r · (2r − n − 1) / ((n − 1) · Σ freq)
//! ```
//!
//! and a bucket with value `v` over `[a, b]` contributes
//! `v · (b − a + 1) · (a + b − n − 1)` to the numerator.

use std::collections::BTreeMap;
use std::ops::Bound::Excluded;

use crate::error::{SimError, SimResult};

/// Rank interval `[min, max]` occupied by one distinct frequency
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct RankInterval {
    min: u64,
    max: u64,
}

impl RankInterval {
    fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    fn len(&self) -> u64 {
        self.max - self.min + 1
    }
}

/// Gini index over a fixed catalog, updated one frequency change at a time
#[derive(Clone, Debug)]
pub struct GiniIndex {
    frequencies: Vec<u64>,
    buckets: BTreeMap<u64, RankInterval>,
    numerator: i128,
    total: u64,
}

impl GiniIndex {
    /// All-zero frequencies over `num_items` items
    pub fn new(num_items: usize) -> Self {
        let mut buckets = BTreeMap::new();
        if num_items > 0 {
            buckets.insert(0, RankInterval::new(1, num_items as u64));
        }
        Self {
            frequencies: vec![0; num_items],
            buckets,
            numerator: 0,
            total: 0,
        }
    }

    /// Catalog size
    pub fn num_items(&self) -> usize {
        self.frequencies.len()
    }

    /// Current frequency of an item
    pub fn frequency(&self, item: u32) -> u64 {
        self.frequencies.get(item as usize).copied().unwrap_or(0)
    }

    /// Sum of all frequencies
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Add `delta` (possibly negative) to an item's frequency
    pub fn update_frequency(&mut self, item: u32, delta: i64) -> SimResult<()> {
        let idx = item as usize;
        let old = *self.frequencies.get(idx).ok_or_else(|| {
            SimError::Configuration(format!(
                "item {} outside a catalog of {}",
                item,
                self.frequencies.len()
            ))
        })?;
        let new = i128::from(old) + i128::from(delta);
        if new < 0 {
            return Err(SimError::Numerical(format!(
                "frequency of item {} would become {}",
                item, new
            )));
        }
        let new = new as u64;
        if new == old {
            return Ok(());
        }

        if new > old {
            self.move_up(old, new);
        } else {
            self.move_down(old, new);
        }

        self.frequencies[idx] = new;
        self.total = self.total + new - old;
        Ok(())
    }

    /// Current Gini coefficient, NaN for fewer than two items or no mass
    pub fn value(&self) -> f64 {
        let n = self.frequencies.len();
        if n < 2 || self.total == 0 {
            return f64::NAN;
        }
        self.numerator as f64 / ((n - 1) as f64 * self.total as f64)
    }

    fn contribution(&self, value: u64, interval: RankInterval) -> i128 {
        let n = self.frequencies.len() as i128;
        i128::from(value)
            * i128::from(interval.len())
            * (i128::from(interval.min) + i128::from(interval.max) - n - 1)
    }

    fn set_bucket(&mut self, value: u64, interval: Option<RankInterval>) {
        if let Some(old) = self.buckets.remove(&value) {
            self.numerator -= self.contribution(value, old);
        }
        if let Some(iv) = interval {
            self.numerator += self.contribution(value, iv);
            self.buckets.insert(value, iv);
        }
    }

    /// The item leaves the top of its bucket, every bucket strictly between
    /// shifts one rank down and the item enters the bottom of `new`.
    fn move_up(&mut self, old: u64, new: u64) {
        let from = self.buckets[&old];
        let rank = from.max;
        let rest = (from.min < from.max).then(|| RankInterval::new(from.min, from.max - 1));
        self.set_bucket(old, rest);

        let between: Vec<(u64, RankInterval)> = self
            .buckets
            .range((Excluded(old), Excluded(new)))
            .map(|(&v, &iv)| (v, iv))
            .collect();
        let mut shifted = 0;
        for (value, iv) in between {
            shifted += iv.len();
            self.set_bucket(value, Some(RankInterval::new(iv.min - 1, iv.max - 1)));
        }

        let new_rank = rank + shifted;
        let target = match self.buckets.get(&new) {
            Some(iv) => RankInterval::new(new_rank, iv.max),
            None => RankInterval::new(new_rank, new_rank),
        };
        self.set_bucket(new, Some(target));
    }

    /// Mirror image of [`Self::move_up`].
    fn move_down(&mut self, old: u64, new: u64) {
        let from = self.buckets[&old];
        let rank = from.min;
        let rest = (from.min < from.max).then(|| RankInterval::new(from.min + 1, from.max));
        self.set_bucket(old, rest);

        let between: Vec<(u64, RankInterval)> = self
            .buckets
            .range((Excluded(new), Excluded(old)))
            .map(|(&v, &iv)| (v, iv))
            .collect();
        let mut shifted = 0;
        for (value, iv) in between {
            shifted += iv.len();
            self.set_bucket(value, Some(RankInterval::new(iv.min + 1, iv.max + 1)));
        }

        let new_rank = rank - shifted;
        let target = match self.buckets.get(&new) {
            Some(iv) => RankInterval::new(iv.min, new_rank),
            None => RankInterval::new(new_rank, new_rank),
        };
        self.set_bucket(new, Some(target));
    }
}

/// Gini coefficient of a frequency vector by full sort
pub fn gini_coefficient(frequencies: &[u64]) -> f64 {
    let n = frequencies.len();
    let total: u64 = frequencies.iter().sum();
    if n < 2 || total == 0 {
        return f64::NAN;
    }
    let mut sorted = frequencies.to_vec();
    sorted.sort_unstable();
    let numerator: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, &f)| f as f64 * (2.0 * (i + 1) as f64 - n as f64 - 1.0))
        .sum();
    numerator / ((n - 1) as f64 * total as f64)
}
