//! Rating records

use serde::{Deserialize, Serialize};

/// Reward sentinel for a pair that is absent from the ground truth.
///
/// Distinct from an observed value of `0.0`; consumers check it with
/// [`Rating::is_known`] or `f64::is_nan`.
pub const NOT_IN_GROUND_TRUTH: f64 = f64::NAN;

/// Value substituted for [`NOT_IN_GROUND_TRUTH`] by recommenders that do not
/// ignore unrated pairs.
pub const NOT_RATED_NOT_IGNORED: f64 = 0.0;

/// An immutable (user, item, value) triple
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    /// User index
    pub user: u32,
    /// Item index
    pub item: u32,
    /// Observed value, or [`NOT_IN_GROUND_TRUTH`]
    pub value: f64,
}

impl Rating {
    /// Create a new rating
    pub fn new(user: u32, item: u32, value: f64) -> Self {
        Self { user, item, value }
    }

    /// Create a rating carrying the absent-pair sentinel
    pub fn unknown(user: u32, item: u32) -> Self {
        Self::new(user, item, NOT_IN_GROUND_TRUTH)
    }

    /// True when the value is an actual observation
    pub fn is_known(&self) -> bool {
        !self.value.is_nan()
    }

    /// Same pair, user and item swapped
    pub fn reversed(&self) -> Self {
        Self::new(self.item, self.user, self.value)
    }
}

/// Resolve the sentinel for a recommender update.
///
/// Returns `None` when the value is absent and should be ignored, otherwise
/// the value to learn from.
pub fn resolve_reward(value: f64, ignore_not_rated: bool) -> Option<f64> {
    if value.is_nan() {
        if ignore_not_rated {
            None
        } else {
            Some(NOT_RATED_NOT_IGNORED)
        }
    } else {
        Some(value)
    }
}
