//! Name → factory registry for recommenders
//!
//! Every algorithm name an experiment mentions is checked against the
//! registry before any run starts; building an unknown name is an
//! [`SimError::Unconfigured`] error.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{SimError, SimResult};
use crate::recommenders::bandit::{
    BanditScope, EpsilonGreedy, MultiArmedBandit, ThompsonSampling, Ucb1, Ucb1Tuned,
};
use crate::recommenders::knn::{InteractiveKnn, KnnConfig, KnnMode};
use crate::recommenders::particle::{ParticleConfig, ParticleThompsonSampling};
use crate::recommenders::traits::InteractiveRecommender;

/// What a factory knows about the run it builds for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FactoryContext {
    pub num_users: usize,
    pub num_items: usize,
    /// Seed of the run
    pub seed: u64,
}

/// Builds a fresh recommender for one run
pub type RecommenderFactory =
    Arc<dyn Fn(&FactoryContext) -> SimResult<Box<dyn InteractiveRecommender>> + Send + Sync>;

/// Registered recommender factories
#[derive(Clone, Default)]
pub struct RecommenderRegistry {
    factories: BTreeMap<String, RecommenderFactory>,
}

impl RecommenderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in algorithm
    ///
    /// `thompson` and `thompson-user` feed raw rewards to a Beta posterior,
    /// so on graded scales every rating of 1 or more counts as a success.
    /// For such datasets register a variant built with
    /// [`MultiArmedBandit::binarize_at`] and the dataset's relevance
    /// threshold.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("eps-greedy", |ctx| {
            Ok(Box::new(MultiArmedBandit::new(
                "eps-greedy",
                ctx.num_users,
                BanditScope::Global,
                Box::new(EpsilonGreedy::new(0.1)?),
                true,
            )))
        });
        registry.register("ucb1", |ctx| {
            Ok(Box::new(MultiArmedBandit::new(
                "ucb1",
                ctx.num_users,
                BanditScope::Global,
                Box::new(Ucb1::default()),
                true,
            )))
        });
        registry.register("ucb1-tuned", |ctx| {
            Ok(Box::new(MultiArmedBandit::new(
                "ucb1-tuned",
                ctx.num_users,
                BanditScope::Global,
                Box::new(Ucb1Tuned),
                true,
            )))
        });
        registry.register("thompson", |ctx| {
            Ok(Box::new(MultiArmedBandit::new(
                "thompson",
                ctx.num_users,
                BanditScope::Global,
                Box::new(ThompsonSampling),
                true,
            )))
        });
        registry.register("thompson-user", |ctx| {
            Ok(Box::new(MultiArmedBandit::new(
                "thompson-user",
                ctx.num_users,
                BanditScope::PerUser,
                Box::new(ThompsonSampling),
                true,
            )))
        });
        registry.register("knn-item", |ctx| {
            Ok(Box::new(InteractiveKnn::new(
                "knn-item",
                ctx.num_users,
                ctx.num_items,
                KnnConfig::default(),
            )))
        });
        registry.register("knn-user", |ctx| {
            let config = KnnConfig {
                mode: KnnMode::UserBased,
                ..KnnConfig::default()
            };
            Ok(Box::new(InteractiveKnn::new(
                "knn-user",
                ctx.num_users,
                ctx.num_items,
                config,
            )))
        });
        registry.register("pts", |ctx| {
            Ok(Box::new(ParticleThompsonSampling::new(
                "pts",
                ctx.num_users,
                ctx.num_items,
                ParticleConfig::default(),
            )?))
        });
        registry
    }

    /// Register (or replace) a factory
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&FactoryContext) -> SimResult<Box<dyn InteractiveRecommender>>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Fail on the first name without a factory
    pub fn validate<S: AsRef<str>>(&self, names: &[S]) -> SimResult<()> {
        match names.iter().find(|n| !self.contains(n.as_ref())) {
            Some(missing) => Err(SimError::Unconfigured(format!(
                "no recommender registered as '{}'",
                missing.as_ref()
            ))),
            None => Ok(()),
        }
    }

    /// Build a fresh recommender
    pub fn build(
        &self,
        name: &str,
        ctx: &FactoryContext,
    ) -> SimResult<Box<dyn InteractiveRecommender>> {
        let factory = self.factories.get(name).ok_or_else(|| {
            SimError::Unconfigured(format!("no recommender registered as '{}'", name))
        })?;
        (**factory)(ctx)
    }
}

impl std::fmt::Debug for RecommenderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ctx() -> FactoryContext {
        FactoryContext {
            num_users: 3,
            num_items: 4,
            seed: 7,
        }
    }

    #[test]
    fn test_defaults_build() {
        let registry = RecommenderRegistry::with_defaults();
        let names: Vec<String> = registry.names().map(str::to_string).collect();
        assert_eq!(names.len(), 8);
        for name in &names {
            let rec = registry.build(name, &ctx()).unwrap();
            assert_eq!(rec.name(), name);
        }
    }

    #[test]
    fn test_unknown_name() {
        let registry = RecommenderRegistry::with_defaults();
        assert!(matches!(
            registry.build("svd", &ctx()),
            Err(SimError::Unconfigured(_))
        ));
        assert!(registry.validate(&["ucb1", "svd"]).is_err());
        assert!(registry.validate(&["ucb1", "pts"]).is_ok());
    }

    #[test]
    fn test_custom_factory() {
        let mut registry = RecommenderRegistry::new();
        registry.register("greedy-user", |ctx| {
            Ok(Box::new(MultiArmedBandit::new(
                "greedy-user",
                ctx.num_users,
                BanditScope::PerUser,
                Box::new(EpsilonGreedy::new(0.0)?),
                false,
            )))
        });
        assert!(registry.contains("greedy-user"));
        assert!(!registry.contains("ucb1"));
    }

    #[test]
    fn test_binarized_thompson_factory() {
        let mut registry = RecommenderRegistry::new();
        registry.register("thompson-4star", |ctx| {
            Ok(Box::new(
                MultiArmedBandit::new(
                    "thompson-4star",
                    ctx.num_users,
                    BanditScope::Global,
                    Box::new(ThompsonSampling),
                    true,
                )
                .binarize_at(4.0),
            ))
        });
        let mut rec = registry.build("thompson-4star", &ctx()).unwrap();
        rec.update(0, 1, 2.0);
        rec.update(0, 1, 3.0);
        rec.update(0, 2, 5.0);
        let mut rng = StdRng::seed_from_u64(1);
        let picks: Vec<Option<u32>> = (0..20).map(|_| rec.decide(0, &[1, 2], &mut rng)).collect();
        assert!(picks.iter().filter(|p| **p == Some(2)).count() > 10);
    }
}
