//! Step-based recommendation loop
//!
//! One [`RecommendationLoop::advance`] call is one simulated interaction:
//! select a target user and its candidates, ask the recommender, resolve the
//! decision into reward tuples and feed them back to every collaborator.
//!
//! ```rust,ignore
//! let mut sim = RecommendationLoop::builder(dataset)
//!     .recommender(recommender)
//!     .metric(Box::new(CumulativeRecall::new()))
//!     .end_condition(Box::new(NumIterations::new(1000)))
//!     .seed(42)
//!     .build()?;
//!
//! sim.initialize()?;
//! loop {
//!     match sim.advance()? {
//!         Step::Interaction(interaction) => log(&interaction.to_record()),
//!         Step::Skipped { .. } => {}
//!         Step::Finished => break,
//!     }
//! }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, trace, warn};

use crate::data::{Dataset, Rating, NOT_IN_GROUND_TRUTH};
use crate::error::{SimError, SimResult};
use crate::metrics::traits::CumulativeMetric;
use crate::recommenders::traits::InteractiveRecommender;
use crate::selection::non_sequential::NonSequentialSelection;
use crate::selection::traits::SelectionStrategy;
use crate::selection::user_selector::UserSelection;
use crate::simulation::summary::{MetricSnapshot, RunSummary};
use crate::termination::{EndCondition, NoLimit};
use crate::trace::TraceRecord;
use crate::update::general::GeneralUpdate;
use crate::update::traits::{UpdateOutcome, UpdateStrategy};
use crate::warmup::Warmup;

/// Lifecycle of a loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Uninitialized,
    Initialized,
    Running,
    Finished,
}

/// One completed interaction
#[derive(Clone, Debug, PartialEq)]
pub struct Interaction {
    /// 1-based iteration number
    pub iteration: usize,
    pub user: u32,
    /// Recommended items, best first
    pub items: Vec<u32>,
    /// Reward tuples seen by the metrics
    pub rewards: Vec<Rating>,
    /// Time spent deciding and updating
    pub elapsed: Duration,
}

impl Interaction {
    /// Trace log form of this interaction
    pub fn to_record(&self) -> TraceRecord {
        TraceRecord {
            iteration: self.iteration,
            user: self.user,
            items: self.items.clone(),
            elapsed_ms: self.elapsed.as_millis() as u64,
        }
    }
}

/// Result of one `advance()` call
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// A decision was made and fed back
    Interaction(Interaction),
    /// The target had no candidates
    Skipped { user: u32 },
    /// Nothing left to do
    Finished,
}

/// Single-threaded simulation of one recommender
pub struct RecommendationLoop {
    dataset: Arc<dyn Dataset>,
    warmup: Option<Arc<Warmup>>,
    selection: Box<dyn SelectionStrategy>,
    update: Box<dyn UpdateStrategy>,
    recommender: Box<dyn InteractiveRecommender>,
    metrics: Vec<Box<dyn CumulativeMetric>>,
    end_condition: Box<dyn EndCondition>,
    seed: u64,
    cutoff: usize,
    record_every: Option<usize>,

    rng: StdRng,
    state: LoopState,
    iteration: usize,
    skipped: usize,
    started: Option<Instant>,
    finish_reason: Option<&'static str>,
    history: Vec<MetricSnapshot>,
}

impl RecommendationLoop {
    /// Start building a loop over `dataset`
    pub fn builder(dataset: Arc<dyn Dataset>) -> RecommendationLoopBuilder {
        RecommendationLoopBuilder::new(dataset)
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Completed interactions
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn recommender(&self) -> &dyn InteractiveRecommender {
        self.recommender.as_ref()
    }

    /// Attached warm-up, available after `initialize()`
    pub fn warmup(&self) -> Option<&Arc<Warmup>> {
        self.warmup.as_ref()
    }

    /// Current metric values as `(name, value)`
    pub fn metric_values(&self) -> Vec<(String, f64)> {
        self.metrics
            .iter()
            .map(|m| (m.name().to_string(), m.value()))
            .collect()
    }

    /// Why the run stopped, once finished
    pub fn finish_reason(&self) -> Option<&'static str> {
        self.finish_reason
    }

    /// Reset every collaborator for a fresh run
    ///
    /// Order: generator, warm-up, selection, update, recommender, metrics,
    /// end condition.
    pub fn initialize(&mut self) -> SimResult<()> {
        self.rng = StdRng::seed_from_u64(self.seed);

        let warmup = match &self.warmup {
            Some(warmup) => Arc::clone(warmup),
            None => {
                let warmup = Arc::new(Warmup::empty(self.dataset.as_ref()));
                self.warmup = Some(Arc::clone(&warmup));
                warmup
            }
        };

        self.selection
            .init(&self.dataset, &warmup, &mut self.rng)?;
        self.update.init(&self.dataset);
        let training = self.update.training_list(&warmup);
        self.recommender.init(&training, &mut self.rng);
        for metric in &mut self.metrics {
            metric.reset(&self.dataset, &warmup);
        }
        self.end_condition.init();

        self.iteration = 0;
        self.skipped = 0;
        self.started = None;
        self.finish_reason = None;
        self.history.clear();
        self.state = LoopState::Initialized;

        debug!(
            recommender = self.recommender.name(),
            seed = self.seed,
            training = training.len(),
            "loop initialized"
        );
        Ok(())
    }

    fn finish(&mut self, reason: &'static str) -> Step {
        self.state = LoopState::Finished;
        self.finish_reason = Some(reason);
        info!(
            recommender = self.recommender.name(),
            iterations = self.iteration,
            reason,
            "run finished"
        );
        Step::Finished
    }

    /// Perform one interaction
    pub fn advance(&mut self) -> SimResult<Step> {
        match self.state {
            LoopState::Uninitialized => return Err(SimError::InvalidState("loop not initialized")),
            LoopState::Finished => return Ok(Step::Finished),
            LoopState::Initialized => {
                self.state = LoopState::Running;
                self.started = Some(Instant::now());
                info!(recommender = self.recommender.name(), seed = self.seed, "run started");
            }
            LoopState::Running => {}
        }

        if self.end_condition.has_ended() {
            let reason = self.end_condition.reason();
            return Ok(self.finish(reason));
        }

        let user = match self.selection.select_target(&mut self.rng) {
            Ok(Some(user)) => user,
            Ok(None) => return Ok(self.finish("Selection exhausted")),
            Err(e) => {
                warn!(error = %e, "stream failure, ending run");
                return Ok(self.finish("Stream failure"));
            }
        };

        let candidates = match self.selection.select_candidates(user, &mut self.rng) {
            Some(candidates) if !candidates.is_empty() => candidates,
            _ => {
                self.skipped += 1;
                trace!(user, "no candidates");
                return Ok(Step::Skipped { user });
            }
        };

        let start = Instant::now();
        let items = if self.cutoff <= 1 {
            self.recommender
                .decide(user, &candidates, &mut self.rng)
                .into_iter()
                .collect()
        } else {
            self.recommender
                .decide_top(user, &candidates, self.cutoff, &mut self.rng)
        };
        if items.is_empty() {
            // selection only advances on a decision
            return Err(SimError::Configuration(format!(
                "recommender {} made no decision for user {} among {} candidates",
                self.recommender.name(),
                user,
                candidates.len()
            )));
        }

        // resolve every item against the same selection state before any
        // feedback moves it
        let outcomes: Vec<(u32, UpdateOutcome)> = items
            .iter()
            .map(|&item| (item, self.update.select_update(user, item, self.selection.as_ref())))
            .collect();

        let mut rewards = Vec::new();
        for (item, outcome) in outcomes {
            self.feed(user, item, &outcome);
            rewards.extend(outcome.metrics);
        }

        self.iteration += 1;
        if let Some(every) = self.record_every {
            if every > 0 && self.iteration % every == 0 {
                self.history.push(MetricSnapshot {
                    iteration: self.iteration,
                    values: self.metrics.iter().map(|m| m.value()).collect(),
                });
            }
        }

        trace!(iteration = self.iteration, user, items = ?items, "interaction");
        Ok(Step::Interaction(Interaction {
            iteration: self.iteration,
            user,
            items,
            rewards,
            elapsed: start.elapsed(),
        }))
    }

    fn feed(&mut self, user: u32, item: u32, outcome: &UpdateOutcome) {
        for r in &outcome.recommender {
            self.recommender.update(r.user, r.item, r.value);
            if (r.user, r.item) != (user, item) {
                self.selection.update(r.user, r.item, r.value);
            }
        }
        for r in &outcome.metrics {
            for metric in &mut self.metrics {
                metric.update(r);
            }
        }

        // the decision is always consumed, even when every tuple was filtered
        let value = outcome
            .primary()
            .map_or(NOT_IN_GROUND_TRUTH, |r| r.value);
        self.selection.update(user, item, value);
        self.end_condition.update(user, item, value);
        for r in outcome.metrics.iter().skip(1) {
            self.end_condition.update_secondary(r.user, r.item, r.value);
        }
    }

    /// Run to completion, initializing first if needed
    pub fn run(&mut self) -> SimResult<RunSummary> {
        self.run_with(|_| {})
    }

    /// Run to completion, handing every interaction to `sink`
    pub fn run_with<F: FnMut(&Interaction)>(&mut self, mut sink: F) -> SimResult<RunSummary> {
        if self.state == LoopState::Uninitialized || self.state == LoopState::Finished {
            self.initialize()?;
        }
        loop {
            match self.advance()? {
                Step::Interaction(interaction) => sink(&interaction),
                Step::Skipped { .. } => {}
                Step::Finished => break,
            }
        }
        Ok(self.summary())
    }

    /// Summary of the run so far
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            algorithm: self.recommender.name().to_string(),
            repetition: 0,
            seed: self.seed,
            iterations: self.iteration,
            skipped: self.skipped,
            elapsed_ms: self
                .started
                .map_or(0, |s| s.elapsed().as_millis() as u64),
            finish_reason: self.finish_reason.unwrap_or("Running").to_string(),
            metric_names: self.metrics.iter().map(|m| m.name().to_string()).collect(),
            final_values: self.metrics.iter().map(|m| m.value()).collect(),
            history: self.history.clone(),
        }
    }
}

/// Builder for [`RecommendationLoop`]
///
/// Defaults: empty warm-up, non-sequential random selection, general
/// update, no end condition, seed 0, one item per decision.
pub struct RecommendationLoopBuilder {
    dataset: Arc<dyn Dataset>,
    warmup: Option<Arc<Warmup>>,
    selection: Option<Box<dyn SelectionStrategy>>,
    update: Option<Box<dyn UpdateStrategy>>,
    recommender: Option<Box<dyn InteractiveRecommender>>,
    metrics: Vec<Box<dyn CumulativeMetric>>,
    end_condition: Option<Box<dyn EndCondition>>,
    seed: u64,
    cutoff: usize,
    record_every: Option<usize>,
}

impl RecommendationLoopBuilder {
    pub fn new(dataset: Arc<dyn Dataset>) -> Self {
        Self {
            dataset,
            warmup: None,
            selection: None,
            update: None,
            recommender: None,
            metrics: Vec::new(),
            end_condition: None,
            seed: 0,
            cutoff: 1,
            record_every: None,
        }
    }

    /// Attach a prebuilt warm-up snapshot
    pub fn warmup(mut self, warmup: Arc<Warmup>) -> Self {
        self.warmup = Some(warmup);
        self
    }

    pub fn selection(mut self, selection: Box<dyn SelectionStrategy>) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn update(mut self, update: Box<dyn UpdateStrategy>) -> Self {
        self.update = Some(update);
        self
    }

    pub fn recommender(mut self, recommender: Box<dyn InteractiveRecommender>) -> Self {
        self.recommender = Some(recommender);
        self
    }

    /// Add a metric
    pub fn metric(mut self, metric: Box<dyn CumulativeMetric>) -> Self {
        self.metrics.push(metric);
        self
    }

    pub fn metrics(mut self, metrics: Vec<Box<dyn CumulativeMetric>>) -> Self {
        self.metrics.extend(metrics);
        self
    }

    pub fn end_condition(mut self, end_condition: Box<dyn EndCondition>) -> Self {
        self.end_condition = Some(end_condition);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Items recommended per decision
    pub fn cutoff(mut self, cutoff: usize) -> Self {
        self.cutoff = cutoff;
        self
    }

    /// Snapshot the metrics every `every` iterations
    pub fn record_every(mut self, every: usize) -> Self {
        self.record_every = Some(every);
        self
    }

    /// Build the loop
    pub fn build(self) -> SimResult<RecommendationLoop> {
        let recommender = self
            .recommender
            .ok_or_else(|| SimError::Configuration("recommender required".into()))?;
        if self.cutoff == 0 {
            return Err(SimError::Configuration("cutoff must be positive".into()));
        }

        Ok(RecommendationLoop {
            dataset: self.dataset,
            warmup: self.warmup,
            selection: self.selection.unwrap_or_else(|| {
                Box::new(NonSequentialSelection::with_user_selection(
                    UserSelection::Random,
                ))
            }),
            update: self.update.unwrap_or_else(|| Box::new(GeneralUpdate::new())),
            recommender,
            metrics: self.metrics,
            end_condition: self.end_condition.unwrap_or_else(|| Box::new(NoLimit)),
            seed: self.seed,
            cutoff: self.cutoff,
            record_every: self.record_every,
            rng: StdRng::seed_from_u64(self.seed),
            state: LoopState::Uninitialized,
            iteration: 0,
            skipped: 0,
            started: None,
            finish_reason: None,
            history: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RatingMatrix, RatingStream, VecStream};
    use crate::metrics::accuracy::{ClickThroughRate, CumulativeRecall};
    use crate::recommenders::bandit::{BanditScope, MultiArmedBandit, Ucb1};
    use crate::selection::sequential::{SequentialSelection, StreamCandidates};
    use crate::termination::{NumIterations, PercentagePositiveRatings};
    use crate::update::replayer::ReplayerUpdate;

    fn dataset() -> Arc<dyn Dataset> {
        let ratings = vec![
            Rating::new(0, 0, 5.0),
            Rating::new(0, 2, 1.0),
            Rating::new(1, 1, 4.0),
            Rating::new(2, 0, 3.0),
        ];
        Arc::new(RatingMatrix::new(3, 3, ratings, 3.0).unwrap())
    }

    fn bandit() -> Box<dyn InteractiveRecommender> {
        Box::new(MultiArmedBandit::new(
            "ucb1",
            3,
            BanditScope::Global,
            Box::new(Ucb1::default()),
            true,
        ))
    }

    #[test]
    fn test_advance_requires_initialize() {
        let mut sim = RecommendationLoop::builder(dataset())
            .recommender(bandit())
            .build()
            .unwrap();
        assert!(matches!(sim.advance(), Err(SimError::InvalidState(_))));
    }

    #[test]
    fn test_builder_requires_recommender() {
        assert!(RecommendationLoop::builder(dataset()).build().is_err());
        assert!(RecommendationLoop::builder(dataset())
            .recommender(bandit())
            .cutoff(0)
            .build()
            .is_err());
    }

    #[test]
    fn test_exhausts_every_pair() {
        let mut sim = RecommendationLoop::builder(dataset())
            .recommender(bandit())
            .metric(Box::new(CumulativeRecall::new()))
            .metric(Box::new(ClickThroughRate::new()))
            .seed(3)
            .build()
            .unwrap();
        let mut seen = Vec::new();
        let summary = sim.run_with(|i| seen.push((i.user, i.items[0]))).unwrap();

        assert_eq!(summary.iterations, 9);
        assert_eq!(summary.finish_reason, "Selection exhausted");
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 9);
        assert_eq!(summary.metric("recall"), Some(1.0));
        assert!((summary.metric("ctr").unwrap() - 3.0 / 9.0).abs() < 1e-12);
        assert_eq!(sim.state(), LoopState::Finished);
        assert_eq!(sim.advance().unwrap(), Step::Finished);
    }

    #[test]
    fn test_recommender_without_decision_is_an_error() {
        let undersized = Box::new(MultiArmedBandit::new(
            "ucb1-user",
            1,
            BanditScope::PerUser,
            Box::new(Ucb1::default()),
            true,
        ));
        let mut sim = RecommendationLoop::builder(dataset())
            .recommender(undersized)
            .seed(7)
            .build()
            .unwrap();
        assert!(matches!(sim.run(), Err(SimError::Configuration(_))));
    }

    #[test]
    fn test_end_condition_stops_run() {
        let mut sim = RecommendationLoop::builder(dataset())
            .recommender(bandit())
            .end_condition(Box::new(NumIterations::new(4)))
            .build()
            .unwrap();
        let summary = sim.run().unwrap();
        assert_eq!(summary.iterations, 4);
        assert_eq!(summary.finish_reason, "Maximum iterations reached");
    }

    #[test]
    fn test_percentage_end_condition() {
        let mut sim = RecommendationLoop::builder(dataset())
            .recommender(bandit())
            .end_condition(Box::new(
                PercentagePositiveRatings::new(3, 1.0, 3.0).unwrap(),
            ))
            .metric(Box::new(CumulativeRecall::new()))
            .build()
            .unwrap();
        let summary = sim.run().unwrap();
        assert_eq!(summary.metric("recall"), Some(1.0));
        assert!(summary.iterations <= 9);
    }

    #[test]
    fn test_cutoff_ranks_distinct_items() {
        let mut sim = RecommendationLoop::builder(dataset())
            .recommender(bandit())
            .cutoff(2)
            .build()
            .unwrap();
        sim.initialize().unwrap();
        match sim.advance().unwrap() {
            Step::Interaction(i) => {
                assert_eq!(i.items.len(), 2);
                assert_ne!(i.items[0], i.items[1]);
                assert_eq!(i.to_record().items, i.items);
            }
            other => panic!("expected an interaction, got {:?}", other),
        }
    }

    #[test]
    fn test_replayer_consumes_non_matching_decisions() {
        let log = vec![Rating::new(0, 2, 1.0), Rating::new(1, 1, 4.0)];
        let stream: Box<dyn RatingStream> = Box::new(VecStream::new(log));
        let mut sim = RecommendationLoop::builder(dataset())
            .selection(Box::new(SequentialSelection::new(
                stream,
                StreamCandidates::Catalog,
            )))
            .update(Box::new(ReplayerUpdate::new()))
            .recommender(bandit())
            .build()
            .unwrap();
        let summary = sim.run().unwrap();
        assert_eq!(summary.iterations, 2);
        assert_eq!(summary.finish_reason, "Selection exhausted");
    }

    #[test]
    fn test_metric_history() {
        let mut sim = RecommendationLoop::builder(dataset())
            .recommender(bandit())
            .metric(Box::new(ClickThroughRate::new()))
            .record_every(3)
            .build()
            .unwrap();
        let summary = sim.run().unwrap();
        let at: Vec<usize> = summary.history.iter().map(|s| s.iteration).collect();
        assert_eq!(at, vec![3, 6, 9]);
    }
}
