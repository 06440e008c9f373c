//! Simulation driver
//!
//! [`RecommendationLoop`] runs one recommender; [`Experiment`] fans out
//! algorithm × repetition runs with seeds from a [`SeedGenerator`].

pub mod experiment;
pub mod recommendation_loop;
pub mod seed;
pub mod summary;

pub use experiment::{Experiment, RunPlan};
pub use recommendation_loop::{
    Interaction, LoopState, RecommendationLoop, RecommendationLoopBuilder, Step,
};
pub use seed::SeedGenerator;
pub use summary::{aggregate, mean, mean_ignoring_nan, AggregateSummary, MetricSnapshot, RunSummary};
