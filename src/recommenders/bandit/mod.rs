//! Multi-armed bandit recommenders
//!
//! Items are arms. A bandit keeps either one table of arm statistics for
//! everybody or one table per user, and delegates the choice to an
//! [`ArmPolicy`].

pub mod arms;
pub mod policy;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::data::{resolve_reward, Rating};
use crate::recommenders::traits::InteractiveRecommender;

pub use arms::{ArmStats, ArmTable};
pub use policy::{ArmPolicy, EpsilonGreedy, PolicyConfig, ThompsonSampling, Ucb1, Ucb1Tuned};

/// Whose rewards an arm aggregates
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BanditScope {
    /// One table shared by all users
    #[default]
    Global,
    /// One table per user
    PerUser,
}

/// Bandit recommender over item arms
pub struct MultiArmedBandit {
    name: String,
    scope: BanditScope,
    policy: Box<dyn ArmPolicy>,
    tables: Vec<ArmTable>,
    num_users: usize,
    ignore_not_rated: bool,
    relevance: Option<f64>,
}

impl MultiArmedBandit {
    /// Create a bandit for `num_users` users
    pub fn new(
        name: impl Into<String>,
        num_users: usize,
        scope: BanditScope,
        policy: Box<dyn ArmPolicy>,
        ignore_not_rated: bool,
    ) -> Self {
        let mut bandit = Self {
            name: name.into(),
            scope,
            policy,
            tables: Vec::new(),
            num_users,
            ignore_not_rated,
            relevance: None,
        };
        bandit.reset();
        bandit
    }

    /// Feed the arms `1.0` for rewards at or above `threshold` and `0.0`
    /// otherwise
    ///
    /// Graded ratings such as 1–5 stars otherwise saturate the Beta
    /// posterior of [`ThompsonSampling`], which clamps rewards to `[0, 1]`.
    pub fn binarize_at(mut self, threshold: f64) -> Self {
        self.relevance = Some(threshold);
        self
    }

    fn reset(&mut self) {
        let count = match self.scope {
            BanditScope::Global => 1,
            BanditScope::PerUser => self.num_users,
        };
        self.tables = vec![ArmTable::new(); count];
    }

    fn table_index(&self, user: u32) -> usize {
        match self.scope {
            BanditScope::Global => 0,
            BanditScope::PerUser => user as usize,
        }
    }

    /// Statistics of an arm as seen by `user`
    pub fn arm(&self, user: u32, item: u32) -> ArmStats {
        self.tables
            .get(self.table_index(user))
            .map(|t| t.stats(item))
            .unwrap_or_default()
    }
}

impl InteractiveRecommender for MultiArmedBandit {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, training: &[Rating], _rng: &mut StdRng) {
        self.reset();
        for r in training {
            self.update(r.user, r.item, r.value);
        }
    }

    fn decide(&mut self, user: u32, candidates: &[u32], rng: &mut StdRng) -> Option<u32> {
        let table = self.tables.get(self.table_index(user))?;
        self.policy.select(table, candidates, rng)
    }

    fn update(&mut self, user: u32, item: u32, value: f64) {
        let Some(reward) = resolve_reward(value, self.ignore_not_rated) else {
            return;
        };
        let reward = match self.relevance {
            Some(threshold) if reward >= threshold => 1.0,
            Some(_) => 0.0,
            None => reward,
        };
        let index = self.table_index(user);
        if let Some(table) = self.tables.get_mut(index) {
            table.observe(item, reward);
        }
    }
}
