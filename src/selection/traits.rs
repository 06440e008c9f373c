//! Selection strategy trait

use std::sync::Arc;

use rand::rngs::StdRng;

use crate::data::{Dataset, Rating};
use crate::error::SimResult;
use crate::warmup::Warmup;

/// Chooses the next target user and the items it may be offered
pub trait SelectionStrategy: Send {
    /// Attach to a dataset and warm-up snapshot, discarding previous state
    fn init(
        &mut self,
        dataset: &Arc<dyn Dataset>,
        warmup: &Warmup,
        rng: &mut StdRng,
    ) -> SimResult<()>;

    /// Next target user, `Ok(None)` once no user is left
    ///
    /// Errors only come from an underlying log and end the run.
    fn select_target(&mut self, rng: &mut StdRng) -> SimResult<Option<u32>>;

    /// Candidate items for the target, `None` if the user is exhausted
    fn select_candidates(&mut self, user: u32, rng: &mut StdRng) -> Option<Vec<u32>>;

    /// Record that `item` has been consumed by `user`
    fn update(&mut self, user: u32, item: u32, value: f64);

    /// Whether the pair may still be recommended
    fn is_available(&self, user: u32, item: u32) -> bool;

    /// Position of the underlying log, for log-driven strategies
    fn current_record(&self) -> Option<Rating> {
        None
    }
}
