//! Incremental-similarity nearest neighbours

pub mod recommender;
pub mod similarity;

pub use recommender::{InteractiveKnn, KnnConfig, KnnMode};
pub use similarity::{PairStat, SimilarityAccumulator, SimilarityKind};
