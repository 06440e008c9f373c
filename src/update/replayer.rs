//! Replayer evaluation
//!
//! Offline logs cannot certify relevance for pairs that were never
//! collected. A decision is rewarded only when it matches the current log
//! entry exactly; any other decision yields no data at all, neither a hit
//! nor a miss.

use std::sync::Arc;

use super::traits::{UpdateOutcome, UpdateStrategy};
use crate::data::{Dataset, Rating};
use crate::selection::traits::SelectionStrategy;
use crate::warmup::Warmup;

/// Reward only exact matches with the log
///
/// The reward is the logged value; the static dataset is never consulted.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReplayerUpdate;

impl ReplayerUpdate {
    /// Create a new replayer
    pub fn new() -> Self {
        Self::default()
    }
}

impl UpdateStrategy for ReplayerUpdate {
    fn init(&mut self, _dataset: &Arc<dyn Dataset>) {}

    fn select_update(
        &self,
        user: u32,
        item: u32,
        selection: &dyn SelectionStrategy,
    ) -> UpdateOutcome {
        match selection.current_record() {
            Some(record) if record.user == user && record.item == item => {
                UpdateOutcome::single(Rating::new(user, item, record.value))
            }
            _ => UpdateOutcome::empty(),
        }
    }

    fn training_list(&self, warmup: &Warmup) -> Vec<Rating> {
        warmup.clean_training().to_vec()
    }
}
