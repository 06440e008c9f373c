//! Simulation configuration
//!
//! Everything an experiment needs besides the dataset itself, loadable from
//! JSON. Each strategy enum builds a fresh boxed strategy per run.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data::{Dataset, RatingStream};
use crate::error::{SimError, SimResult};
use crate::metrics::accuracy::{ClickThroughRate, CumulativeRecall, WindowedClickThroughRate};
use crate::metrics::diversity::{CumulativeGini, PopularityComplement, WindowedGini};
use crate::metrics::traits::CumulativeMetric;
use crate::selection::limited::LimitedSelection;
use crate::selection::non_sequential::NonSequentialSelection;
use crate::selection::sequential::{SequentialSelection, StreamCandidates};
use crate::selection::traits::SelectionStrategy;
use crate::selection::user_selector::UserSelection;
use crate::termination::EndConditionConfig;
use crate::update::contact::ContactUpdate;
use crate::update::general::GeneralUpdate;
use crate::update::knowledge::{KnowledgeMode, KnowledgeUpdate};
use crate::update::replayer::ReplayerUpdate;
use crate::update::traits::UpdateStrategy;
use crate::warmup::WarmupKind;

/// Opens a fresh interaction log for one run
pub type StreamSource = Arc<dyn Fn() -> SimResult<Box<dyn RatingStream>> + Send + Sync>;

/// Selection strategy choice
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SelectionConfig {
    /// Resample targets from the preference matrix
    NonSequential {
        #[serde(default)]
        user_selection: UserSelection,
    },
    /// Non-sequential with fixed-size candidate pools
    Limited {
        size: usize,
        #[serde(default)]
        user_selection: UserSelection,
    },
    /// Follow an interaction log
    Sequential {
        #[serde(default)]
        candidates: StreamCandidates,
    },
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self::NonSequential {
            user_selection: UserSelection::Random,
        }
    }
}

impl SelectionConfig {
    /// Build a selection; sequential selection opens a log from `stream`
    pub fn build(&self, stream: Option<&StreamSource>) -> SimResult<Box<dyn SelectionStrategy>> {
        Ok(match self {
            Self::NonSequential { user_selection } => Box::new(
                NonSequentialSelection::with_user_selection(*user_selection),
            ),
            Self::Limited {
                size,
                user_selection,
            } => Box::new(LimitedSelection::new(*size, *user_selection)?),
            Self::Sequential { candidates } => {
                let open = stream.ok_or_else(|| {
                    SimError::Configuration("sequential selection needs a stream source".into())
                })?;
                Box::new(SequentialSelection::new((**open)()?, *candidates))
            }
        })
    }
}

/// Update strategy choice
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateConfig {
    #[default]
    General,
    Contact,
    /// Keep only known or only unknown pairs of a side dataset
    Knowledge { mode: KnowledgeMode },
    Replayer,
}

impl UpdateConfig {
    /// Build an update strategy; knowledge filtering needs `knowledge`
    pub fn build(
        &self,
        knowledge: Option<&Arc<dyn Dataset>>,
    ) -> SimResult<Box<dyn UpdateStrategy>> {
        Ok(match self {
            Self::General => Box::new(GeneralUpdate::new()),
            Self::Contact => Box::new(ContactUpdate::new()),
            Self::Knowledge { mode } => {
                let side = knowledge.ok_or_else(|| {
                    SimError::Configuration("knowledge update needs a knowledge dataset".into())
                })?;
                Box::new(KnowledgeUpdate::new(Arc::clone(side), *mode))
            }
            Self::Replayer => Box::new(ReplayerUpdate::new()),
        })
    }
}

/// Metric choice
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricConfig {
    Recall,
    Ctr,
    WindowedCtr { window: usize },
    Gini,
    WindowedGini { window: usize },
    PopularityComplement,
}

impl MetricConfig {
    pub fn build(&self) -> Box<dyn CumulativeMetric> {
        match *self {
            Self::Recall => Box::new(CumulativeRecall::new()),
            Self::Ctr => Box::new(ClickThroughRate::new()),
            Self::WindowedCtr { window } => Box::new(WindowedClickThroughRate::new(window)),
            Self::Gini => Box::new(CumulativeGini::new()),
            Self::WindowedGini { window } => Box::new(WindowedGini::new(window)),
            Self::PopularityComplement => Box::new(PopularityComplement::new()),
        }
    }
}

/// Experiment configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Master seed; run seeds are derived from it
    pub seed: u64,
    /// Runs per algorithm
    pub repetitions: usize,
    /// Items recommended per decision
    pub cutoff: usize,
    pub warmup: WarmupKind,
    pub selection: SelectionConfig,
    pub update: UpdateConfig,
    pub end_condition: EndConditionConfig,
    pub metrics: Vec<MetricConfig>,
    /// Registered recommender names
    pub algorithms: Vec<String>,
    /// Snapshot metrics every n iterations (0 = final values only)
    pub record_every: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            repetitions: 1,
            cutoff: 1,
            warmup: WarmupKind::OnlyRatings,
            selection: SelectionConfig::default(),
            update: UpdateConfig::General,
            end_condition: EndConditionConfig::NoLimit,
            metrics: vec![MetricConfig::Recall, MetricConfig::Gini],
            algorithms: Vec::new(),
            record_every: 0,
        }
    }
}

impl SimulationConfig {
    /// Parse from a JSON string and validate
    pub fn from_json_str(json: &str) -> SimResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON file and validate
    pub fn from_path(path: impl AsRef<Path>) -> SimResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Serialize as pretty JSON
    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check value ranges
    pub fn validate(&self) -> SimResult<()> {
        if self.repetitions == 0 {
            return Err(SimError::Configuration("repetitions must be positive".into()));
        }
        if self.cutoff == 0 {
            return Err(SimError::Configuration("cutoff must be positive".into()));
        }
        if self.algorithms.is_empty() {
            return Err(SimError::Configuration("no algorithms configured".into()));
        }
        if let SelectionConfig::Limited { size: 0, .. } = self.selection {
            return Err(SimError::Configuration("candidate pool size must be positive".into()));
        }
        if let EndConditionConfig::PercentagePositive { percentage, .. } = self.end_condition {
            if !(0.0..=1.0).contains(&percentage) {
                return Err(SimError::Configuration(format!(
                    "percentage must be in [0, 1], got {}",
                    percentage
                )));
            }
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_repetitions(mut self, repetitions: usize) -> Self {
        self.repetitions = repetitions;
        self
    }

    pub fn with_cutoff(mut self, cutoff: usize) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn with_selection(mut self, selection: SelectionConfig) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_update(mut self, update: UpdateConfig) -> Self {
        self.update = update;
        self
    }

    pub fn with_end_condition(mut self, end_condition: EndConditionConfig) -> Self {
        self.end_condition = end_condition;
        self
    }

    pub fn with_metrics(mut self, metrics: Vec<MetricConfig>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Add an algorithm by registered name
    pub fn with_algorithm(mut self, name: impl Into<String>) -> Self {
        self.algorithms.push(name.into());
        self
    }

    /// Fresh metric instances for one run
    pub fn build_metrics(&self) -> Vec<Box<dyn CumulativeMetric>> {
        self.metrics.iter().map(MetricConfig::build).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json() {
        let json = r#"{
            "seed": 7,
            "repetitions": 3,
            "selection": {"type": "limited", "size": 5},
            "update": {"type": "knowledge", "mode": "Known"},
            "end_condition": {"type": "percentage_positive", "percentage": 0.3, "threshold": 4.0},
            "metrics": [{"type": "recall"}, {"type": "windowed_gini", "window": 10}],
            "algorithms": ["ucb1", "knn-item"]
        }"#;
        let config = SimulationConfig::from_json_str(json).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.cutoff, 1);
        assert_eq!(
            config.selection,
            SelectionConfig::Limited {
                size: 5,
                user_selection: UserSelection::Random
            }
        );
        assert_eq!(config.build_metrics().len(), 2);
        assert_eq!(config.build_metrics()[1].name(), "gini-window");
    }

    #[test]
    fn test_validation() {
        let base = SimulationConfig::default().with_algorithm("ucb1");
        assert!(base.validate().is_ok());
        assert!(SimulationConfig::default().validate().is_err());
        assert!(base.clone().with_cutoff(0).validate().is_err());
        assert!(base.clone().with_repetitions(0).validate().is_err());
        assert!(base
            .with_end_condition(EndConditionConfig::PercentagePositive {
                percentage: 2.0,
                threshold: 1.0
            })
            .validate()
            .is_err());
        assert!(matches!(
            SimulationConfig::from_json_str("{\"seed\": \"x\"}"),
            Err(SimError::Configuration(_))
        ));
    }

    #[test]
    fn test_builders_need_collaborators() {
        let sequential = SelectionConfig::Sequential {
            candidates: StreamCandidates::Logged,
        };
        assert!(sequential.build(None).is_err());
        let knowledge = UpdateConfig::Knowledge {
            mode: KnowledgeMode::Unknown,
        };
        assert!(knowledge.build(None).is_err());
        assert!(UpdateConfig::Replayer.build(None).is_ok());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = SimulationConfig::default()
            .with_algorithm("pts")
            .with_selection(SelectionConfig::Sequential {
                candidates: StreamCandidates::Catalog,
            });
        let back = SimulationConfig::from_json_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }
}
