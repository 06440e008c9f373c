//! Nearest-neighbour recommender over an incremental similarity

use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::similarity::{SimilarityAccumulator, SimilarityKind};
use crate::data::{resolve_reward, Rating};
use crate::recommenders::traits::InteractiveRecommender;
use crate::selection::tie_break::{argmax_random_tie, uniform_choice};

/// Which entities are compared
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KnnMode {
    /// Items are peers; a user's rated items vote for similar candidates
    #[default]
    ItemBased,
    /// Users are peers; similar users vote with their ratings
    UserBased,
}

/// KNN parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnnConfig {
    pub mode: KnnMode,
    /// Rated items (item-based) or neighbours (user-based) consulted
    pub user_k: usize,
    /// Peers kept per consulted item or neighbour
    pub item_k: usize,
    pub similarity: SimilarityKind,
    pub ignore_not_rated: bool,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self {
            mode: KnnMode::ItemBased,
            user_k: 10,
            item_k: 10,
            similarity: SimilarityKind::VectorCosine,
            ignore_not_rated: true,
        }
    }
}

/// Interactive KNN with O(profile) similarity maintenance per rating
pub struct InteractiveKnn {
    name: String,
    config: KnnConfig,
    num_users: usize,
    num_items: usize,
    similarity: SimilarityAccumulator,
    profiles: Vec<BTreeMap<u32, f64>>,
    raters: Vec<BTreeMap<u32, f64>>,
    user_untie: Vec<usize>,
    item_untie: Vec<usize>,
}

impl InteractiveKnn {
    /// Create an untrained recommender
    pub fn new(name: impl Into<String>, num_users: usize, num_items: usize, config: KnnConfig) -> Self {
        let peers = match config.mode {
            KnnMode::ItemBased => num_items,
            KnnMode::UserBased => num_users,
        };
        Self {
            name: name.into(),
            similarity: SimilarityAccumulator::new(peers, config.similarity),
            config,
            num_users,
            num_items,
            profiles: vec![BTreeMap::new(); num_users],
            raters: vec![BTreeMap::new(); num_items],
            user_untie: (0..num_users).collect(),
            item_untie: (0..num_items).collect(),
        }
    }

    /// Current similarity state
    pub fn similarity(&self) -> &SimilarityAccumulator {
        &self.similarity
    }

    /// Ratings observed for `user`
    pub fn profile(&self, user: u32) -> Option<&BTreeMap<u32, f64>> {
        self.profiles.get(user as usize)
    }

    fn apply(&mut self, user: u32, item: u32, value: f64, add: bool) {
        let (peer, others) = match self.config.mode {
            KnnMode::ItemBased => (item, &self.profiles[user as usize]),
            KnnMode::UserBased => (user, &self.raters[item as usize]),
        };
        for (&other, &other_value) in others {
            if other == peer {
                continue;
            }
            if add {
                self.similarity.update(peer, other, value, other_value);
            } else {
                self.similarity.update_del(peer, other, value, other_value);
            }
        }
        if add {
            self.similarity.update_norm(peer, value);
        } else {
            self.similarity.update_norm_del(peer, value);
        }
    }

    fn scores(&self, user: u32, candidates: &BTreeSet<u32>) -> BTreeMap<u32, f64> {
        let mut scores = BTreeMap::new();
        let Some(profile) = self.profiles.get(user as usize) else {
            return scores;
        };
        match self.config.mode {
            KnnMode::ItemBased => {
                let rated = top_k(
                    profile.iter().map(|(&i, &v)| (i, v)),
                    self.config.user_k,
                    &self.item_untie,
                );
                for (item, value) in rated {
                    let peers = top_k(
                        self.similarity
                            .neighbours(item)
                            .filter(|(c, _)| candidates.contains(c)),
                        self.config.item_k,
                        &self.item_untie,
                    );
                    for (candidate, sim) in peers {
                        *scores.entry(candidate).or_insert(0.0) += sim * value;
                    }
                }
            }
            KnnMode::UserBased => {
                let neighbours = top_k(
                    self.similarity.neighbours(user),
                    self.config.user_k,
                    &self.user_untie,
                );
                for (neighbour, sim) in neighbours {
                    let rated = top_k(
                        self.profiles[neighbour as usize]
                            .iter()
                            .filter(|(c, _)| candidates.contains(c))
                            .map(|(&i, &v)| (i, v)),
                        self.config.item_k,
                        &self.item_untie,
                    );
                    for (candidate, value) in rated {
                        *scores.entry(candidate).or_insert(0.0) += sim * value;
                    }
                }
            }
        }
        scores
    }
}

/// Best `k` entries by score, equal scores ordered by `untie` rank
fn top_k(entries: impl Iterator<Item = (u32, f64)>, k: usize, untie: &[usize]) -> Vec<(u32, f64)> {
    let rank = |id: u32| untie.get(id as usize).copied().unwrap_or(usize::MAX);
    let mut entries: Vec<(u32, f64)> = entries.filter(|(_, s)| !s.is_nan()).collect();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| rank(a.0).cmp(&rank(b.0))));
    entries.truncate(k);
    entries
}

fn untie_ranks(n: usize, rng: &mut StdRng) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    let mut ranks = vec![0; n];
    for (position, &id) in order.iter().enumerate() {
        ranks[id] = position;
    }
    ranks
}

impl InteractiveRecommender for InteractiveKnn {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, training: &[Rating], rng: &mut StdRng) {
        let peers = self.similarity.len();
        self.similarity = SimilarityAccumulator::new(peers, self.config.similarity);
        self.profiles = vec![BTreeMap::new(); self.num_users];
        self.raters = vec![BTreeMap::new(); self.num_items];
        self.user_untie = untie_ranks(self.num_users, rng);
        self.item_untie = untie_ranks(self.num_items, rng);
        for r in training {
            self.update(r.user, r.item, r.value);
        }
    }

    fn decide(&mut self, user: u32, candidates: &[u32], rng: &mut StdRng) -> Option<u32> {
        let allowed: BTreeSet<u32> = candidates.iter().copied().collect();
        let scores = self.scores(user, &allowed);
        if scores.is_empty() {
            return uniform_choice(candidates, rng);
        }
        argmax_random_tie(scores, rng)
    }

    fn update(&mut self, user: u32, item: u32, value: f64) {
        let Some(reward) = resolve_reward(value, self.config.ignore_not_rated) else {
            return;
        };
        if user as usize >= self.num_users || item as usize >= self.num_items {
            return;
        }
        if let Some(previous) = self.profiles[user as usize].remove(&item) {
            self.raters[item as usize].remove(&user);
            self.apply(user, item, previous, false);
        }
        self.apply(user, item, reward, true);
        self.profiles[user as usize].insert(item, reward);
        self.raters[item as usize].insert(user, reward);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn training() -> Vec<Rating> {
        vec![
            Rating::new(0, 0, 1.0),
            Rating::new(0, 1, 1.0),
            Rating::new(1, 0, 1.0),
            Rating::new(1, 1, 1.0),
            Rating::new(2, 2, 1.0),
            Rating::new(2, 3, 1.0),
            Rating::new(3, 0, 1.0),
        ]
    }

    #[test]
    fn test_item_based_follows_co_ratings() {
        let mut knn = InteractiveKnn::new("knn-item", 4, 4, KnnConfig::default());
        let mut rng = StdRng::seed_from_u64(1);
        knn.init(&training(), &mut rng);
        // user 3 rated item 0, which co-occurs with item 1 only
        assert_eq!(knn.decide(3, &[1, 2, 3], &mut rng), Some(1));
    }

    #[test]
    fn test_user_based_follows_neighbours() {
        let config = KnnConfig {
            mode: KnnMode::UserBased,
            ..KnnConfig::default()
        };
        let mut knn = InteractiveKnn::new("knn-user", 4, 4, config);
        let mut rng = StdRng::seed_from_u64(1);
        knn.init(&training(), &mut rng);
        assert_eq!(knn.decide(3, &[1, 2, 3], &mut rng), Some(1));
    }

    #[test]
    fn test_cold_user_gets_a_candidate() {
        let mut knn = InteractiveKnn::new("knn-item", 5, 4, KnnConfig::default());
        let mut rng = StdRng::seed_from_u64(1);
        knn.init(&training(), &mut rng);
        let pick = knn.decide(4, &[2, 3], &mut rng);
        assert!(matches!(pick, Some(2) | Some(3)));
        assert_eq!(knn.decide(4, &[], &mut rng), None);
    }

    #[test]
    fn test_rerating_replaces_contribution() {
        let mut knn = InteractiveKnn::new("knn-item", 2, 2, KnnConfig::default());
        let mut rng = StdRng::seed_from_u64(1);
        knn.init(&[Rating::new(0, 0, 2.0), Rating::new(0, 1, 3.0)], &mut rng);
        let before = knn.similarity().clone();
        knn.update(0, 1, 5.0);
        knn.update(0, 1, 3.0);
        assert!(knn.similarity().max_abs_diff(&before) < 1e-9);
        assert_eq!(knn.profile(0).unwrap().get(&1), Some(&3.0));
    }

    #[test]
    fn test_not_rated_sentinel() {
        let mut knn = InteractiveKnn::new("knn-item", 1, 2, KnnConfig::default());
        let mut rng = StdRng::seed_from_u64(1);
        knn.init(&[], &mut rng);
        knn.update(0, 1, f64::NAN);
        assert!(knn.profile(0).unwrap().is_empty());
    }

    #[test]
    fn test_top_k_untie_order() {
        let untie = vec![2, 0, 1];
        let top = top_k(vec![(0, 1.0), (1, 1.0), (2, 1.0)].into_iter(), 2, &untie);
        assert_eq!(top, vec![(1, 1.0), (2, 1.0)]);
    }
}
