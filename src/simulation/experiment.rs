//! Fan-out of independent runs
//!
//! An experiment runs every configured algorithm `repetitions` times. Runs
//! share only the dataset and the warm-up snapshot, both read-only, so they
//! are executed on the rayon pool when the `parallel` feature is enabled.

use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::{SimulationConfig, StreamSource};
use crate::data::Dataset;
use crate::error::SimResult;
use crate::recommenders::registry::{FactoryContext, RecommenderRegistry};
use crate::simulation::recommendation_loop::RecommendationLoop;
use crate::simulation::seed::SeedGenerator;
use crate::simulation::summary::{aggregate, AggregateSummary, RunSummary};
use crate::warmup::Warmup;

/// One scheduled run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunPlan {
    pub algorithm: String,
    pub repetition: usize,
    pub seed: u64,
}

/// A set of runs over one dataset
pub struct Experiment {
    dataset: Arc<dyn Dataset>,
    warmup: Arc<Warmup>,
    registry: RecommenderRegistry,
    config: SimulationConfig,
    stream: Option<StreamSource>,
    knowledge: Option<Arc<dyn Dataset>>,
}

impl Experiment {
    /// Validate the configuration and replay the warm-up pairs once
    pub fn new(
        dataset: Arc<dyn Dataset>,
        training: &[(u32, u32)],
        registry: RecommenderRegistry,
        config: SimulationConfig,
    ) -> SimResult<Self> {
        config.validate()?;
        registry.validate(&config.algorithms)?;
        let warmup = Arc::new(Warmup::build(dataset.as_ref(), training, config.warmup)?);
        Ok(Self {
            dataset,
            warmup,
            registry,
            config,
            stream: None,
            knowledge: None,
        })
    }

    /// Log source for sequential selection
    pub fn with_stream(mut self, stream: StreamSource) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Side dataset for knowledge-filtered updates
    pub fn with_knowledge(mut self, knowledge: Arc<dyn Dataset>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    pub fn warmup(&self) -> &Arc<Warmup> {
        &self.warmup
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Every run with its seed, in algorithm-major order
    ///
    /// Seeds are drawn here, before any fan-out.
    pub fn plan(&self) -> Vec<RunPlan> {
        let reps = self.config.repetitions;
        let mut seeds = SeedGenerator::new(self.config.seed)
            .partition(self.config.algorithms.len() * reps)
            .into_iter();
        let mut plans = Vec::with_capacity(self.config.algorithms.len() * reps);
        for algorithm in &self.config.algorithms {
            for repetition in 0..reps {
                let seed = seeds.next().unwrap_or_default();
                plans.push(RunPlan {
                    algorithm: algorithm.clone(),
                    repetition,
                    seed,
                });
            }
        }
        plans
    }

    /// Build the loop for one planned run
    pub fn build_loop(&self, plan: &RunPlan) -> SimResult<RecommendationLoop> {
        let ctx = FactoryContext {
            num_users: self.dataset.num_users(),
            num_items: self.dataset.num_items(),
            seed: plan.seed,
        };
        let relevant = self
            .dataset
            .num_relevant()
            .saturating_sub(self.warmup.num_relevant());

        let mut builder = RecommendationLoop::builder(Arc::clone(&self.dataset))
            .warmup(Arc::clone(&self.warmup))
            .selection(self.config.selection.build(self.stream.as_ref())?)
            .update(self.config.update.build(self.knowledge.as_ref())?)
            .recommender(self.registry.build(&plan.algorithm, &ctx)?)
            .metrics(self.config.build_metrics())
            .end_condition(self.config.end_condition.build(relevant)?)
            .seed(plan.seed)
            .cutoff(self.config.cutoff);
        if self.config.record_every > 0 {
            builder = builder.record_every(self.config.record_every);
        }
        builder.build()
    }

    fn run_one(&self, plan: &RunPlan) -> SimResult<RunSummary> {
        let mut sim = self.build_loop(plan)?;
        let mut summary = sim.run()?;
        summary.algorithm = plan.algorithm.clone();
        summary.repetition = plan.repetition;
        debug!(
            algorithm = %plan.algorithm,
            repetition = plan.repetition,
            iterations = summary.iterations,
            "run summary"
        );
        Ok(summary)
    }

    /// Execute every run; summaries come back in plan order
    #[cfg(feature = "parallel")]
    pub fn run(&self) -> SimResult<Vec<RunSummary>> {
        let plans = self.plan();
        info!(runs = plans.len(), "starting experiment");
        plans.par_iter().map(|plan| self.run_one(plan)).collect()
    }

    /// Execute every run; summaries come back in plan order
    #[cfg(not(feature = "parallel"))]
    pub fn run(&self) -> SimResult<Vec<RunSummary>> {
        let plans = self.plan();
        info!(runs = plans.len(), "starting experiment");
        plans.iter().map(|plan| self.run_one(plan)).collect()
    }

    /// Run and average per algorithm
    pub fn run_aggregated(&self) -> SimResult<Vec<AggregateSummary>> {
        Ok(aggregate(&self.run()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Rating, RatingMatrix};
    use crate::error::SimError;
    use crate::termination::EndConditionConfig;

    fn dataset() -> Arc<dyn Dataset> {
        let ratings = (0..6u32).flat_map(|u| {
            (0..5u32)
                .filter(move |i| (u + i) % 2 == 0)
                .map(move |i| Rating::new(u, i, 1.0 + (i % 3) as f64))
        });
        Arc::new(RatingMatrix::new(6, 5, ratings, 2.0).unwrap())
    }

    fn config() -> SimulationConfig {
        SimulationConfig::default()
            .with_seed(11)
            .with_repetitions(2)
            .with_algorithm("ucb1")
            .with_algorithm("knn-item")
            .with_end_condition(EndConditionConfig::NumIterations { iterations: 15 })
    }

    #[test]
    fn test_plan_is_deterministic() {
        let registry = RecommenderRegistry::with_defaults();
        let a = Experiment::new(dataset(), &[(0, 0)], registry.clone(), config()).unwrap();
        let b = Experiment::new(dataset(), &[(0, 0)], registry, config()).unwrap();
        assert_eq!(a.plan(), b.plan());
        assert_eq!(a.plan().len(), 4);
        assert_eq!(a.plan()[2].algorithm, "knn-item");
    }

    #[test]
    fn test_runs_match_between_experiments() {
        let registry = RecommenderRegistry::with_defaults();
        let a = Experiment::new(dataset(), &[(1, 1)], registry.clone(), config()).unwrap();
        let b = Experiment::new(dataset(), &[(1, 1)], registry, config()).unwrap();
        let ra = a.run().unwrap();
        let rb = b.run().unwrap();
        assert_eq!(ra.len(), 4);
        for (x, y) in ra.iter().zip(&rb) {
            assert_eq!(x.algorithm, y.algorithm);
            assert_eq!(x.iterations, 15);
            assert_eq!(x.metric_names, y.metric_names);
            for (vx, vy) in x.final_values.iter().zip(&y.final_values) {
                assert!(vx == vy || (vx.is_nan() && vy.is_nan()));
            }
        }

        let agg = a.run_aggregated().unwrap();
        assert_eq!(agg.len(), 2);
        assert_eq!(agg[0].repetitions, 2);
    }

    #[test]
    fn test_unknown_algorithm_fails_early() {
        let config = config().with_algorithm("svd++");
        let result = Experiment::new(
            dataset(),
            &[],
            RecommenderRegistry::with_defaults(),
            config,
        );
        assert!(matches!(result, Err(SimError::Unconfigured(_))));
    }
}
