//! Incremental cosine similarity
//!
//! The accumulator keeps, per ordered pair of peers, the sum of rating
//! products and the number of co-rated contexts, and per peer the sum of
//! squared ratings. Every `update` has an exact inverse `update_del`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// What a rating contributes to the cosine
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimilarityKind {
    /// Cosine over rating vectors
    #[default]
    VectorCosine,
    /// Cosine over sets: every interaction counts as 1
    SetCosine,
}

impl SimilarityKind {
    fn weight(self, value: f64) -> f64 {
        match self {
            Self::VectorCosine => value,
            Self::SetCosine => 1.0,
        }
    }
}

/// Partial sums for one ordered pair
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PairStat {
    /// Σ r_a · r_b over the shared contexts
    pub dot: f64,
    /// Number of shared contexts
    pub common: u32,
}

/// Sparse similarity accumulator over `size` peers
#[derive(Clone, Debug)]
pub struct SimilarityAccumulator {
    kind: SimilarityKind,
    pairs: Vec<BTreeMap<u32, PairStat>>,
    norms: Vec<f64>,
    sizes: Vec<u32>,
}

impl SimilarityAccumulator {
    /// Create an empty accumulator
    pub fn new(size: usize, kind: SimilarityKind) -> Self {
        Self {
            kind,
            pairs: vec![BTreeMap::new(); size],
            norms: vec![0.0; size],
            sizes: vec![0; size],
        }
    }

    /// Number of peers
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True if there are no peers
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Add one shared context between `a` (rated `ra`) and `b` (rated `rb`)
    pub fn update(&mut self, a: u32, b: u32, ra: f64, rb: f64) {
        if a == b {
            return;
        }
        let dot = self.kind.weight(ra) * self.kind.weight(rb);
        self.add_pair(a, b, dot, 1);
        self.add_pair(b, a, dot, 1);
    }

    /// Remove a shared context previously added with [`Self::update`]
    pub fn update_del(&mut self, a: u32, b: u32, ra: f64, rb: f64) {
        if a == b {
            return;
        }
        let dot = self.kind.weight(ra) * self.kind.weight(rb);
        self.remove_pair(a, b, dot);
        self.remove_pair(b, a, dot);
    }

    /// Add one rating to the norm of `a`
    pub fn update_norm(&mut self, a: u32, value: f64) {
        let w = self.kind.weight(value);
        if let (Some(norm), Some(size)) = (
            self.norms.get_mut(a as usize),
            self.sizes.get_mut(a as usize),
        ) {
            *norm += w * w;
            *size += 1;
        }
    }

    /// Remove one rating from the norm of `a`
    pub fn update_norm_del(&mut self, a: u32, value: f64) {
        let w = self.kind.weight(value);
        if let (Some(norm), Some(size)) = (
            self.norms.get_mut(a as usize),
            self.sizes.get_mut(a as usize),
        ) {
            *size = size.saturating_sub(1);
            // drop accumulated rounding once the peer is empty again
            *norm = if *size == 0 { 0.0 } else { *norm - w * w };
        }
    }

    fn add_pair(&mut self, a: u32, b: u32, dot: f64, common: u32) {
        if let Some(row) = self.pairs.get_mut(a as usize) {
            let stat = row.entry(b).or_default();
            stat.dot += dot;
            stat.common += common;
        }
    }

    fn remove_pair(&mut self, a: u32, b: u32, dot: f64) {
        let Some(row) = self.pairs.get_mut(a as usize) else {
            return;
        };
        if let Some(stat) = row.get_mut(&b) {
            stat.common = stat.common.saturating_sub(1);
            if stat.common == 0 {
                row.remove(&b);
            } else {
                stat.dot -= dot;
            }
        }
    }

    /// Partial sums of a pair, if any context is shared
    pub fn pair(&self, a: u32, b: u32) -> Option<PairStat> {
        self.pairs.get(a as usize)?.get(&b).copied()
    }

    /// Cosine similarity of `a` and `b`, zero when undefined
    pub fn similarity(&self, a: u32, b: u32) -> f64 {
        self.pair(a, b)
            .map_or(0.0, |stat| self.cosine(a, b, stat.dot))
    }

    fn cosine(&self, a: u32, b: u32, dot: f64) -> f64 {
        let na = self.norms.get(a as usize).copied().unwrap_or(0.0);
        let nb = self.norms.get(b as usize).copied().unwrap_or(0.0);
        let denom = (na * nb).sqrt();
        if denom > 0.0 {
            dot / denom
        } else {
            0.0
        }
    }

    /// Every peer sharing a context with `a`, with its similarity
    pub fn neighbours(&self, a: u32) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.pairs
            .get(a as usize)
            .into_iter()
            .flat_map(move |row| row.iter().map(move |(&b, s)| (b, self.cosine(a, b, s.dot))))
    }

    /// Largest absolute difference of the partial sums of two accumulators
    ///
    /// `f64::INFINITY` if the sparsity patterns or counters differ.
    pub fn max_abs_diff(&self, other: &Self) -> f64 {
        if self.len() != other.len() || self.sizes != other.sizes {
            return f64::INFINITY;
        }
        let mut diff: f64 = 0.0;
        for (left, right) in self.pairs.iter().zip(&other.pairs) {
            if left.len() != right.len() {
                return f64::INFINITY;
            }
            for ((ka, sa), (kb, sb)) in left.iter().zip(right) {
                if ka != kb || sa.common != sb.common {
                    return f64::INFINITY;
                }
                diff = diff.max((sa.dot - sb.dot).abs());
            }
        }
        for (a, b) in self.norms.iter().zip(&other.norms) {
            diff = diff.max((a - b).abs());
        }
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> SimilarityAccumulator {
        let mut sim = SimilarityAccumulator::new(3, SimilarityKind::VectorCosine);
        // item 0 and 1 both rated by two users
        for (r0, r1) in [(5.0, 4.0), (3.0, 3.0)] {
            sim.update_norm(0, r0);
            sim.update_norm(1, r1);
            sim.update(0, 1, r0, r1);
        }
        sim.update_norm(2, 2.0);
        sim
    }

    #[test]
    fn test_cosine_value() {
        let sim = filled();
        let expected = (5.0 * 4.0 + 3.0 * 3.0) / ((25.0f64 + 9.0) * (16.0 + 9.0)).sqrt();
        assert!((sim.similarity(0, 1) - expected).abs() < 1e-12);
        assert_eq!(sim.similarity(0, 1), sim.similarity(1, 0));
        assert_eq!(sim.similarity(0, 2), 0.0);
        assert_eq!(sim.pair(0, 1).unwrap().common, 2);
    }

    #[test]
    fn test_update_del_restores_state() {
        let before = filled();
        let mut sim = before.clone();
        sim.update_norm(2, 4.0);
        sim.update_norm(0, 1.5);
        sim.update(0, 2, 1.5, 4.0);
        assert!(sim.similarity(0, 2) > 0.0);

        sim.update_del(0, 2, 1.5, 4.0);
        sim.update_norm_del(0, 1.5);
        sim.update_norm_del(2, 4.0);
        assert!(sim.pair(0, 2).is_none());
        assert!(sim.max_abs_diff(&before) < 1e-9);
    }

    #[test]
    fn test_set_cosine_ignores_values() {
        let mut sim = SimilarityAccumulator::new(2, SimilarityKind::SetCosine);
        sim.update_norm(0, 5.0);
        sim.update_norm(1, 0.1);
        sim.update(0, 1, 5.0, 0.1);
        assert!((sim.similarity(0, 1) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_norm_resets_when_empty() {
        let mut sim = SimilarityAccumulator::new(1, SimilarityKind::VectorCosine);
        sim.update_norm(0, 0.1);
        sim.update_norm(0, 0.2);
        sim.update_norm_del(0, 0.1);
        sim.update_norm_del(0, 0.2);
        assert_eq!(sim.max_abs_diff(&SimilarityAccumulator::new(1, SimilarityKind::VectorCosine)), 0.0);
    }

    #[test]
    fn test_self_pairs_ignored() {
        let mut sim = SimilarityAccumulator::new(2, SimilarityKind::VectorCosine);
        sim.update(1, 1, 2.0, 2.0);
        assert!(sim.pair(1, 1).is_none());
        assert_eq!(sim.neighbours(1).count(), 0);
    }
}
