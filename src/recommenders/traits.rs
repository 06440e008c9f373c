//! Interactive recommender trait

use rand::rngs::StdRng;

use crate::data::Rating;

/// Stateful decision-maker driven by a simulation loop
///
/// Implementations own their state exclusively; parallel runs never share
/// an instance.
pub trait InteractiveRecommender: Send {
    /// Identifier used in logs and summaries
    fn name(&self) -> &str;

    /// Reset all state and learn from the warm-up ratings
    fn init(&mut self, training: &[Rating], rng: &mut StdRng);

    /// Pick one of `candidates` for `user`
    ///
    /// Returns `None` only for an empty candidate list.
    fn decide(&mut self, user: u32, candidates: &[u32], rng: &mut StdRng) -> Option<u32>;

    /// Ranked list of up to `k` distinct candidates
    fn decide_top(
        &mut self,
        user: u32,
        candidates: &[u32],
        k: usize,
        rng: &mut StdRng,
    ) -> Vec<u32> {
        let mut remaining = candidates.to_vec();
        let mut ranked = Vec::with_capacity(k.min(candidates.len()));
        while ranked.len() < k {
            match self.decide(user, &remaining, rng) {
                Some(item) => {
                    ranked.push(item);
                    remaining.retain(|&c| c != item);
                }
                None => break,
            }
        }
        ranked
    }

    /// Learn from an observed reward (NaN for a pair absent from the ground
    /// truth)
    fn update(&mut self, user: u32, item: u32, value: f64);
}
