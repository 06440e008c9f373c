//! # interactive-recsim
//!
//! Simulation of interactive recommendation for Rust.
//!
//! A simulation replays or resamples user–item interactions against a
//! stateful recommender, one decision at a time, and measures it with
//! streaming metrics that never recompute from scratch.
//!
//! ## Core Concepts
//!
//! - **Step-based loop**: selection → decision → update → termination check
//! - **Online learners**: bandits, incremental-similarity KNN and a
//!   particle filter over matrix factorizations
//! - **Incremental metrics**: an O(log n) Gini index, recall, CTR
//! - **Reproducibility**: every run owns a generator seeded from an
//!   explicit seed service
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use interactive_recsim::prelude::*;
//! use std::sync::Arc;
//!
//! let dataset: Arc<dyn Dataset> = Arc::new(RatingMatrix::new(100, 50, ratings, 4.0)?);
//! let config = SimulationConfig::default()
//!     .with_repetitions(5)
//!     .with_algorithm("ucb1")
//!     .with_algorithm("knn-item")
//!     .with_end_condition(EndConditionConfig::NumIterations { iterations: 1000 });
//!
//! let experiment = Experiment::new(dataset, &warmup_pairs, RecommenderRegistry::with_defaults(), config)?;
//! for summary in experiment.run_aggregated()? {
//!     println!("{}: {:?}", summary.algorithm, summary.metrics);
//! }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod recommenders;
pub mod selection;
pub mod simulation;
pub mod termination;
pub mod trace;
pub mod update;
pub mod warmup;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        MetricConfig, SelectionConfig, SimulationConfig, StreamSource, UpdateConfig,
    };
    pub use crate::data::prelude::*;
    pub use crate::error::*;
    pub use crate::metrics::prelude::*;
    pub use crate::recommenders::prelude::*;
    pub use crate::selection::prelude::*;
    pub use crate::simulation::{
        Experiment, Interaction, LoopState, RecommendationLoop, RunSummary, SeedGenerator, Step,
    };
    pub use crate::termination::prelude::*;
    pub use crate::trace::{read_binary, read_text, TraceFormat, TraceRecord, TraceWriter};
    pub use crate::update::prelude::*;
    pub use crate::warmup::{Warmup, WarmupKind};
}
