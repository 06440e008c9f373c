//! Per-arm running statistics

use std::collections::BTreeMap;

use crate::recommenders::posterior::BetaPosterior;

/// Running statistics of one arm
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ArmStats {
    /// Number of observed rewards
    pub pulls: u64,
    /// Mean reward
    pub mean: f64,
    m2: f64,
    /// Beta posterior over the reward rate
    pub posterior: BetaPosterior,
}

impl ArmStats {
    /// Add one reward (Welford update)
    pub fn observe(&mut self, reward: f64) {
        self.pulls += 1;
        let delta = reward - self.mean;
        self.mean += delta / self.pulls as f64;
        self.m2 += delta * (reward - self.mean);
        self.posterior.observe(reward);
    }

    /// Population variance `m2 / n` of the rewards, zero with fewer than two pulls
    pub fn variance(&self) -> f64 {
        if self.pulls < 2 {
            0.0
        } else {
            self.m2 / self.pulls as f64
        }
    }
}

/// Statistics of every arm that has been pulled at least once
#[derive(Clone, Debug, Default)]
pub struct ArmTable {
    arms: BTreeMap<u32, ArmStats>,
    total_pulls: u64,
}

impl ArmTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics of an arm, default for an unplayed arm
    pub fn stats(&self, arm: u32) -> ArmStats {
        self.arms.get(&arm).copied().unwrap_or_default()
    }

    /// Add one reward to an arm
    pub fn observe(&mut self, arm: u32, reward: f64) {
        self.arms.entry(arm).or_default().observe(reward);
        self.total_pulls += 1;
    }

    /// Rewards observed across all arms
    pub fn total_pulls(&self) -> u64 {
        self.total_pulls
    }
}
