//! End conditions
//!
//! This module provides the stateful predicates that halt a simulation run.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// End condition trait
pub trait EndCondition: Send {
    /// Reset the internal counter at run start
    fn init(&mut self);

    /// Account for the reward of one iteration (NaN when there was none)
    fn update(&mut self, user: u32, item: u32, value: f64);

    /// Account for an extra reward produced by the same decision, such as
    /// the mirrored link of an undirected network
    ///
    /// Does not count as an iteration.
    fn update_secondary(&mut self, _user: u32, _item: u32, _value: f64) {}

    /// Check if the run should stop
    fn has_ended(&self) -> bool;

    /// Get a description of why the run stopped
    fn reason(&self) -> &'static str;
}

/// Never ends; the run stops only when selection is exhausted
#[derive(Clone, Debug, Default)]
pub struct NoLimit;

impl EndCondition for NoLimit {
    fn init(&mut self) {}

    fn update(&mut self, _user: u32, _item: u32, _value: f64) {}

    fn has_ended(&self) -> bool {
        false
    }

    fn reason(&self) -> &'static str {
        "No limit"
    }
}

/// Terminate after a fixed number of iterations
#[derive(Clone, Debug)]
pub struct NumIterations {
    target: usize,
    done: usize,
}

impl NumIterations {
    /// Create a new iteration-count condition
    pub fn new(target: usize) -> Self {
        Self { target, done: 0 }
    }

    /// Iterations counted so far
    pub fn done(&self) -> usize {
        self.done
    }
}

impl EndCondition for NumIterations {
    fn init(&mut self) {
        self.done = 0;
    }

    fn update(&mut self, _user: u32, _item: u32, _value: f64) {
        self.done += 1;
    }

    fn has_ended(&self) -> bool {
        self.done >= self.target
    }

    fn reason(&self) -> &'static str {
        "Maximum iterations reached"
    }
}

/// Terminate once a fraction of the relevant ratings has been hit
///
/// Only rewards at or above `threshold` count. The target is
/// `ceil(total · percentage)`.
#[derive(Clone, Debug)]
pub struct PercentagePositiveRatings {
    threshold: f64,
    target: usize,
    hits: usize,
}

impl PercentagePositiveRatings {
    /// Create a new percentage condition
    pub fn new(total: usize, percentage: f64, threshold: f64) -> SimResult<Self> {
        if !(0.0..=1.0).contains(&percentage) {
            return Err(SimError::Configuration(format!(
                "percentage must be in [0, 1], got {}",
                percentage
            )));
        }
        // 10 * 0.3 is 3.0000000000000004 in binary floating point
        let exact = total as f64 * percentage;
        let rounded = exact.round();
        let target = if (exact - rounded).abs() < 1e-9 {
            rounded
        } else {
            exact.ceil()
        };
        Ok(Self {
            threshold,
            target: target as usize,
            hits: 0,
        })
    }

    /// Number of hits needed
    pub fn target(&self) -> usize {
        self.target
    }

    /// Hits so far
    pub fn hits(&self) -> usize {
        self.hits
    }
}

impl EndCondition for PercentagePositiveRatings {
    fn init(&mut self) {
        self.hits = 0;
    }

    fn update(&mut self, _user: u32, _item: u32, value: f64) {
        if value >= self.threshold {
            self.hits += 1;
        }
    }

    fn update_secondary(&mut self, user: u32, item: u32, value: f64) {
        self.update(user, item, value);
    }

    fn has_ended(&self) -> bool {
        self.hits >= self.target
    }

    fn reason(&self) -> &'static str {
        "Target share of relevant ratings reached"
    }
}

/// Combine conditions with OR logic (any one ends the run)
pub struct AnyOf {
    conditions: Vec<Box<dyn EndCondition>>,
}

impl AnyOf {
    /// Create a new AnyOf combinator
    pub fn new(conditions: Vec<Box<dyn EndCondition>>) -> Self {
        Self { conditions }
    }
}

impl EndCondition for AnyOf {
    fn init(&mut self) {
        self.conditions.iter_mut().for_each(|c| c.init());
    }

    fn update(&mut self, user: u32, item: u32, value: f64) {
        for condition in &mut self.conditions {
            condition.update(user, item, value);
        }
    }

    fn update_secondary(&mut self, user: u32, item: u32, value: f64) {
        for condition in &mut self.conditions {
            condition.update_secondary(user, item, value);
        }
    }

    fn has_ended(&self) -> bool {
        self.conditions.iter().any(|c| c.has_ended())
    }

    fn reason(&self) -> &'static str {
        self.conditions
            .iter()
            .find(|c| c.has_ended())
            .map_or("One of multiple conditions met", |c| c.reason())
    }
}

/// Serializable choice of end condition
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EndConditionConfig {
    /// Run until selection is exhausted
    #[default]
    NoLimit,
    /// Fixed iteration count
    NumIterations {
        /// Iterations to run
        iterations: usize,
    },
    /// Share of the relevant ratings left after warm-up
    PercentagePositive {
        /// Fraction in `[0, 1]`
        percentage: f64,
        /// Minimum reward counted as a hit
        threshold: f64,
    },
}

impl EndConditionConfig {
    /// Build the condition; `relevant_total` is the number of relevant
    /// ratings still reachable in the run
    pub fn build(&self, relevant_total: usize) -> SimResult<Box<dyn EndCondition>> {
        Ok(match *self {
            Self::NoLimit => Box::new(NoLimit),
            Self::NumIterations { iterations } => Box::new(NumIterations::new(iterations)),
            Self::PercentagePositive {
                percentage,
                threshold,
            } => Box::new(PercentagePositiveRatings::new(
                relevant_total,
                percentage,
                threshold,
            )?),
        })
    }
}

pub mod prelude {
    pub use super::{
        AnyOf, EndCondition, EndConditionConfig, NoLimit, NumIterations,
        PercentagePositiveRatings,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_iterations() {
        let mut condition = NumIterations::new(5);
        condition.init();
        for _ in 0..4 {
            condition.update(0, 0, 1.0);
            assert!(!condition.has_ended());
        }
        condition.update(0, 0, 1.0);
        assert!(condition.has_ended());

        condition.init();
        assert!(!condition.has_ended());
    }

    #[test]
    fn test_percentage_positive() {
        let mut condition = PercentagePositiveRatings::new(10, 0.3, 0.5).unwrap();
        assert_eq!(condition.target(), 3);
        condition.init();

        condition.update(0, 0, 1.0);
        condition.update(0, 1, 0.2);
        condition.update(0, 2, f64::NAN);
        condition.update(0, 3, 0.5);
        assert!(!condition.has_ended());
        condition.update(0, 4, 0.9);
        assert!(condition.has_ended());
    }

    #[test]
    fn test_percentage_rounds_up() {
        let condition = PercentagePositiveRatings::new(7, 0.5, 0.5).unwrap();
        assert_eq!(condition.target(), 4);
        assert!(PercentagePositiveRatings::new(7, 1.5, 0.5).is_err());
    }

    #[test]
    fn test_secondary_rewards() {
        let mut iterations = NumIterations::new(2);
        iterations.init();
        iterations.update(0, 1, 1.0);
        iterations.update_secondary(1, 0, 1.0);
        assert!(!iterations.has_ended());

        let mut share = PercentagePositiveRatings::new(2, 1.0, 0.5).unwrap();
        share.init();
        share.update(0, 1, 1.0);
        share.update_secondary(1, 0, 1.0);
        assert!(share.has_ended());
    }

    #[test]
    fn test_no_limit() {
        let mut condition = NoLimit;
        condition.update(0, 0, 1.0);
        assert!(!condition.has_ended());
    }

    #[test]
    fn test_any_of() {
        let mut condition = AnyOf::new(vec![
            Box::new(NumIterations::new(3)),
            Box::new(PercentagePositiveRatings::new(1, 1.0, 0.5).unwrap()),
        ]);
        condition.init();
        condition.update(0, 0, 0.0);
        assert!(!condition.has_ended());
        condition.update(0, 0, 1.0);
        assert!(condition.has_ended());
        assert_eq!(condition.reason(), "Target share of relevant ratings reached");
    }

    #[test]
    fn test_config_roundtrip() {
        let config: EndConditionConfig =
            serde_json::from_str(r#"{"type":"num_iterations","iterations":5}"#).unwrap();
        assert_eq!(config, EndConditionConfig::NumIterations { iterations: 5 });
        let mut condition = config.build(0).unwrap();
        condition.init();
        assert!(!condition.has_ended());
    }
}
