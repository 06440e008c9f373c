//! Interactive recommenders
//!
//! Every recommender implements [`InteractiveRecommender`]. Built-in
//! families:
//!
//! - [`bandit`]: per-arm statistics with pluggable policies
//! - [`knn`]: nearest neighbours over an incrementally maintained cosine
//! - [`particle`]: particle Thompson sampling for matrix factorization
//!
//! [`RecommenderRegistry`] maps algorithm names to factories.

pub mod bandit;
pub mod knn;
pub mod particle;
pub mod posterior;
pub mod registry;
pub mod traits;

pub use registry::{FactoryContext, RecommenderFactory, RecommenderRegistry};
pub use traits::InteractiveRecommender;

pub mod prelude {
    pub use super::bandit::{
        ArmPolicy, ArmStats, ArmTable, BanditScope, EpsilonGreedy, MultiArmedBandit,
        PolicyConfig, ThompsonSampling, Ucb1, Ucb1Tuned,
    };
    pub use super::knn::{InteractiveKnn, KnnConfig, KnnMode, SimilarityAccumulator, SimilarityKind};
    pub use super::particle::{ParticleConfig, ParticleDecision, ParticleThompsonSampling};
    pub use super::posterior::{BetaPosterior, GammaPosterior};
    pub use super::registry::{FactoryContext, RecommenderFactory, RecommenderRegistry};
    pub use super::traits::InteractiveRecommender;
}
