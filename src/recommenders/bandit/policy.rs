//! Arm selection policies
//!
//! Policies only look at arm statistics; they know nothing about users or
//! similarity.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::arms::ArmTable;
use crate::error::{SimError, SimResult};
use crate::selection::tie_break::{argmax_random_tie, uniform_choice};

/// Chooses an arm among the candidates
pub trait ArmPolicy: Send {
    /// Pick an arm, `None` for an empty candidate list
    fn select(&self, table: &ArmTable, candidates: &[u32], rng: &mut StdRng) -> Option<u32>;
}

/// Explore uniformly with probability ε, otherwise exploit the best mean
#[derive(Clone, Debug)]
pub struct EpsilonGreedy {
    epsilon: f64,
}

impl EpsilonGreedy {
    /// Create with exploration probability `epsilon`
    pub fn new(epsilon: f64) -> SimResult<Self> {
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(SimError::Configuration(format!(
                "epsilon must be in [0, 1], got {}",
                epsilon
            )));
        }
        Ok(Self { epsilon })
    }
}

impl ArmPolicy for EpsilonGreedy {
    fn select(&self, table: &ArmTable, candidates: &[u32], rng: &mut StdRng) -> Option<u32> {
        if rng.gen::<f64>() < self.epsilon {
            return uniform_choice(candidates, rng);
        }
        argmax_random_tie(candidates.iter().map(|&a| (a, table.stats(a).mean)), rng)
    }
}

/// UCB1: mean plus `c · sqrt(2 ln N / n)`, unplayed arms first
#[derive(Clone, Debug)]
pub struct Ucb1 {
    exploration: f64,
}

impl Ucb1 {
    /// Create with exploration weight `c`
    pub fn new(exploration: f64) -> Self {
        Self { exploration }
    }
}

impl Default for Ucb1 {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl ArmPolicy for Ucb1 {
    fn select(&self, table: &ArmTable, candidates: &[u32], rng: &mut StdRng) -> Option<u32> {
        let log_total = (table.total_pulls().max(1) as f64).ln();
        let scores = candidates.iter().map(|&arm| {
            let stats = table.stats(arm);
            if stats.pulls == 0 {
                return (arm, f64::INFINITY);
            }
            let n = stats.pulls as f64;
            (arm, stats.mean + self.exploration * (2.0 * log_total / n).sqrt())
        });
        argmax_random_tie(scores, rng)
    }
}

/// UCB1-tuned: variance-aware exploration bonus
#[derive(Clone, Debug, Default)]
pub struct Ucb1Tuned;

impl ArmPolicy for Ucb1Tuned {
    fn select(&self, table: &ArmTable, candidates: &[u32], rng: &mut StdRng) -> Option<u32> {
        let log_total = (table.total_pulls().max(1) as f64).ln();
        let scores = candidates.iter().map(|&arm| {
            let stats = table.stats(arm);
            if stats.pulls == 0 {
                return (arm, f64::INFINITY);
            }
            let n = stats.pulls as f64;
            let v = stats.variance() + (2.0 * log_total / n).sqrt();
            (arm, stats.mean + (log_total / n * v.min(0.25)).sqrt())
        });
        argmax_random_tie(scores, rng)
    }
}

/// Thompson sampling from each arm's Beta posterior
#[derive(Clone, Debug, Default)]
pub struct ThompsonSampling;

impl ArmPolicy for ThompsonSampling {
    fn select(&self, table: &ArmTable, candidates: &[u32], rng: &mut StdRng) -> Option<u32> {
        let scores: Vec<(u32, f64)> = candidates
            .iter()
            .map(|&arm| (arm, table.stats(arm).posterior.sample(rng)))
            .collect();
        argmax_random_tie(scores, rng)
    }
}

/// Serializable choice of arm policy
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyConfig {
    /// ε-greedy
    EpsilonGreedy {
        /// Exploration probability
        epsilon: f64,
    },
    /// UCB1
    Ucb1 {
        /// Exploration weight
        exploration: f64,
    },
    /// UCB1-tuned
    Ucb1Tuned,
    /// Beta Thompson sampling
    Thompson,
}

impl PolicyConfig {
    /// Instantiate the policy
    pub fn build(&self) -> SimResult<Box<dyn ArmPolicy>> {
        Ok(match *self {
            Self::EpsilonGreedy { epsilon } => Box::new(EpsilonGreedy::new(epsilon)?),
            Self::Ucb1 { exploration } => Box::new(Ucb1::new(exploration)),
            Self::Ucb1Tuned => Box::new(Ucb1Tuned),
            Self::Thompson => Box::new(ThompsonSampling),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn table() -> ArmTable {
        let mut table = ArmTable::new();
        for _ in 0..20 {
            table.observe(0, 0.0);
            table.observe(1, 1.0);
        }
        table
    }

    #[test]
    fn test_greedy_exploits() {
        let mut rng = StdRng::seed_from_u64(0);
        let policy = EpsilonGreedy::new(0.0).unwrap();
        assert_eq!(policy.select(&table(), &[0, 1], &mut rng), Some(1));
        assert!(EpsilonGreedy::new(2.0).is_err());
    }

    #[test]
    fn test_ucb_plays_unplayed_arm_first() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(Ucb1::default().select(&table(), &[0, 1, 2], &mut rng), Some(2));
        assert_eq!(Ucb1Tuned.select(&table(), &[0, 1, 2], &mut rng), Some(2));
        assert_eq!(Ucb1::default().select(&table(), &[0, 1], &mut rng), Some(1));
    }

    #[test]
    fn test_thompson_prefers_rewarding_arm() {
        let mut rng = StdRng::seed_from_u64(3);
        let t = table();
        let wins = (0..200)
            .filter(|_| ThompsonSampling.select(&t, &[0, 1], &mut rng) == Some(1))
            .count();
        assert!(wins > 190);
    }

    #[test]
    fn test_empty_candidates() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(Ucb1::default().select(&ArmTable::new(), &[], &mut rng), None);
    }
}
