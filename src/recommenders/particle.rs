//! Particle Thompson sampling for probabilistic matrix factorization
//!
//! Each particle is one hypothesis of the latent factors: a user matrix
//! `U` (users × K), an item matrix `V` (items × K) and the user prior
//! precision `λ_u`. Ratings are modelled as `r ~ N(U_u · V_i, σ²)`.
//!
//! On every observed reward the ensemble is
//! 1. weighted by the Gaussian likelihood of the reward,
//! 2. resampled systematically,
//! 3. refreshed by one Gibbs sweep over `λ_u`, the row of the rating user
//!    and the row of the rated item.
//!
//! The `λ_u` refresh uses the conjugate Gamma update over every user with
//! at least one observation: `Gamma(α + K·n/2, β + ½ Σ ‖U_w‖²)`. Each
//! particle keeps `Σ ‖U_w‖²` as a running sum, and particles picked more
//! than once by the resampler share their factor matrices until a row of
//! one copy is redrawn.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::data::{resolve_reward, Rating};
use crate::error::{SimError, SimResult};
use crate::recommenders::posterior::GammaPosterior;
use crate::recommenders::traits::InteractiveRecommender;
use crate::selection::tie_break::{argmax_random_tie, uniform_choice};

/// How the ensemble scores candidates
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParticleDecision {
    /// Score with one particle drawn uniformly
    #[default]
    Thompson,
    /// Mean prediction across particles
    Mean,
    /// Mean plus `alpha` standard deviations across particles
    Ucb { alpha: f64 },
}

/// Particle filter parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    pub num_particles: usize,
    /// Latent dimension K
    pub latent_dim: usize,
    /// Rating noise standard deviation σ
    pub sigma: f64,
    /// Prior standard deviation of item factors
    pub sigma_v: f64,
    /// Gamma prior shape for `λ_u`
    pub alpha: f64,
    /// Gamma prior rate for `λ_u`
    pub beta: f64,
    pub decision: ParticleDecision,
    pub ignore_not_rated: bool,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            num_particles: 30,
            latent_dim: 2,
            sigma: 0.5,
            sigma_v: 1.0,
            alpha: 2.0,
            beta: 0.5,
            decision: ParticleDecision::Thompson,
            ignore_not_rated: true,
        }
    }
}

impl ParticleConfig {
    /// Check parameter ranges
    pub fn validate(&self) -> SimResult<()> {
        if self.num_particles == 0 || self.latent_dim == 0 {
            return Err(SimError::Configuration(
                "particle filter needs at least one particle and one latent dimension".into(),
            ));
        }
        if self.sigma <= 0.0 || self.sigma_v <= 0.0 || self.alpha <= 0.0 || self.beta <= 0.0 {
            return Err(SimError::Configuration(
                "sigma, sigma_v, alpha and beta must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
struct Particle {
    users: Arc<DMatrix<f64>>,
    items: Arc<DMatrix<f64>>,
    lambda_u: f64,
    /// Σ ‖U_w‖² over the observed users
    sum_sq: f64,
}

impl Particle {
    fn predict(&self, user: u32, item: u32) -> f64 {
        self.users
            .row(user as usize)
            .dot(&self.items.row(item as usize))
    }
}

/// Particle Thompson sampling recommender
pub struct ParticleThompsonSampling {
    name: String,
    config: ParticleConfig,
    num_users: usize,
    num_items: usize,
    particles: Vec<Particle>,
    observed_users: usize,
    user_obs: Vec<Vec<(u32, f64)>>,
    item_obs: Vec<Vec<(u32, f64)>>,
    rng: StdRng,
}

impl ParticleThompsonSampling {
    /// Create an untrained recommender
    pub fn new(
        name: impl Into<String>,
        num_users: usize,
        num_items: usize,
        config: ParticleConfig,
    ) -> SimResult<Self> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            config,
            num_users,
            num_items,
            particles: Vec::new(),
            observed_users: 0,
            user_obs: vec![Vec::new(); num_users],
            item_obs: vec![Vec::new(); num_items],
            rng: StdRng::seed_from_u64(0),
        })
    }

    /// Number of particles in the ensemble
    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    /// Mean prediction across particles
    pub fn mean_prediction(&self, user: u32, item: u32) -> f64 {
        if self.particles.is_empty() {
            return f64::NAN;
        }
        self.particles
            .iter()
            .map(|p| p.predict(user, item))
            .sum::<f64>()
            / self.particles.len() as f64
    }

    fn fresh_particle(&mut self) -> Particle {
        let k = self.config.latent_dim;
        let lambda_u = self.config.alpha / self.config.beta;
        let user_sd = 1.0 / lambda_u.sqrt();
        let item_sd = self.config.sigma_v;
        let rng = &mut self.rng;
        let users = DMatrix::from_fn(self.num_users, k, |_, _| {
            user_sd * rng.sample::<f64, _>(StandardNormal)
        });
        let items = DMatrix::from_fn(self.num_items, k, |_, _| {
            item_sd * rng.sample::<f64, _>(StandardNormal)
        });
        Particle {
            users: Arc::new(users),
            items: Arc::new(items),
            lambda_u,
            sum_sq: 0.0,
        }
    }

    fn reweight(&mut self, user: u32, item: u32, reward: f64) {
        let two_var = 2.0 * self.config.sigma * self.config.sigma;
        let log_weights: Vec<f64> = self
            .particles
            .iter()
            .map(|p| {
                let err = reward - p.predict(user, item);
                -err * err / two_var
            })
            .collect();
        let weights = normalize_log_weights(&log_weights);
        let picks = systematic_resample(&weights, &mut self.rng);
        let previous = std::mem::take(&mut self.particles);
        self.particles = picks.into_iter().map(|i| previous[i].clone()).collect();
    }

    fn observe(&mut self, user: u32, item: u32, reward: f64) {
        let first = self.user_obs[user as usize].is_empty();
        self.user_obs[user as usize].push((item, reward));
        self.item_obs[item as usize].push((user, reward));
        if first {
            self.observed_users += 1;
            for particle in &mut self.particles {
                particle.sum_sq += particle.users.row(user as usize).norm_squared();
            }
        }
    }

    fn refresh(&mut self, user: u32, item: u32) {
        let k = self.config.latent_dim;
        let noise_precision = 1.0 / (self.config.sigma * self.config.sigma);
        let item_precision = 1.0 / (self.config.sigma_v * self.config.sigma_v);
        let prior = GammaPosterior::new(self.config.alpha, self.config.beta);

        for particle in &mut self.particles {
            particle.lambda_u = prior
                .updated(k * self.observed_users, particle.sum_sq.max(0.0))
                .sample(&mut self.rng);

            match sample_row(
                &particle.items,
                &self.user_obs[user as usize],
                particle.lambda_u,
                noise_precision,
                &mut self.rng,
            ) {
                Ok(row) => {
                    let users = Arc::make_mut(&mut particle.users);
                    let before = users.row(user as usize).norm_squared();
                    users.set_row(user as usize, &row.transpose());
                    particle.sum_sq += row.norm_squared() - before;
                }
                Err(e) => warn!(user, error = %e, "skipping user factor refresh"),
            }

            match sample_row(
                &particle.users,
                &self.item_obs[item as usize],
                item_precision,
                noise_precision,
                &mut self.rng,
            ) {
                Ok(row) => {
                    Arc::make_mut(&mut particle.items).set_row(item as usize, &row.transpose())
                }
                Err(e) => warn!(item, error = %e, "skipping item factor refresh"),
            }
        }
    }
}

/// Normalize log-weights with the log-sum-exp trick
///
/// Falls back to uniform weights if no weight is finite.
pub fn normalize_log_weights(log_weights: &[f64]) -> Vec<f64> {
    let n = log_weights.len();
    let max = log_weights
        .iter()
        .copied()
        .filter(|w| w.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return vec![1.0 / n as f64; n];
    }
    let exp: Vec<f64> = log_weights
        .iter()
        .map(|&w| if w.is_nan() { 0.0 } else { (w - max).exp() })
        .collect();
    let total: f64 = exp.iter().sum();
    exp.into_iter().map(|w| w / total).collect()
}

/// Systematic resampling of normalized weights
///
/// Returns one source index per output slot; the output has as many
/// entries as `weights`.
pub fn systematic_resample<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Vec<usize> {
    let n = weights.len();
    if n == 0 {
        return Vec::new();
    }
    let step = 1.0 / n as f64;
    let mut position = rng.gen::<f64>() * step;
    let mut cumulative = weights[0];
    let mut source = 0;
    let mut picks = Vec::with_capacity(n);
    for _ in 0..n {
        while position > cumulative && source + 1 < n {
            source += 1;
            cumulative += weights[source];
        }
        picks.push(source);
        position += step;
    }
    picks
}

/// Draw one factor row from its Gaussian conditional
///
/// Precision `Λ = prior·I + τ Σ v vᵀ`, mean `Λ⁻¹ τ Σ r v`, where the `v` are
/// the rows of `others` named by `obs` and `τ` is the noise precision.
fn sample_row<R: Rng + ?Sized>(
    others: &DMatrix<f64>,
    obs: &[(u32, f64)],
    prior_precision: f64,
    noise_precision: f64,
    rng: &mut R,
) -> SimResult<DVector<f64>> {
    let k = others.ncols();
    let mut precision = DMatrix::from_diagonal_element(k, k, prior_precision);
    let mut rhs = DVector::zeros(k);
    for &(other, value) in obs {
        let v = others.row(other as usize).transpose();
        precision += noise_precision * &v * v.transpose();
        rhs += noise_precision * value * v;
    }

    let chol = precision
        .cholesky()
        .ok_or_else(|| SimError::Numerical("factor precision is not positive definite".into()))?;
    let mean = chol.solve(&rhs);
    let z = DVector::from_fn(k, |_, _| rng.sample::<f64, _>(StandardNormal));
    // x = μ + L⁻ᵀ z has covariance Λ⁻¹
    let noise = chol
        .l()
        .transpose()
        .solve_upper_triangular(&z)
        .ok_or_else(|| SimError::Numerical("singular Cholesky factor".into()))?;
    Ok(mean + noise)
}

impl InteractiveRecommender for ParticleThompsonSampling {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, training: &[Rating], rng: &mut StdRng) {
        self.rng = StdRng::from_seed(rng.gen());
        self.observed_users = 0;
        self.user_obs = vec![Vec::new(); self.num_users];
        self.item_obs = vec![Vec::new(); self.num_items];
        self.particles = (0..self.config.num_particles)
            .map(|_| self.fresh_particle())
            .collect();
        for r in training {
            self.update(r.user, r.item, r.value);
        }
    }

    fn decide(&mut self, user: u32, candidates: &[u32], rng: &mut StdRng) -> Option<u32> {
        let cold = self
            .user_obs
            .get(user as usize)
            .map_or(true, |obs| obs.is_empty());
        if cold || self.particles.is_empty() {
            return uniform_choice(candidates, rng);
        }
        let items = candidates
            .iter()
            .copied()
            .filter(|&c| (c as usize) < self.num_items);
        match self.config.decision {
            ParticleDecision::Thompson => {
                let particle = &self.particles[rng.gen_range(0..self.particles.len())];
                let scores: Vec<(u32, f64)> =
                    items.map(|c| (c, particle.predict(user, c))).collect();
                argmax_random_tie(scores, rng)
            }
            ParticleDecision::Mean => {
                let scores: Vec<(u32, f64)> =
                    items.map(|c| (c, self.mean_prediction(user, c))).collect();
                argmax_random_tie(scores, rng)
            }
            ParticleDecision::Ucb { alpha } => {
                let n = self.particles.len() as f64;
                let scores: Vec<(u32, f64)> = items
                    .map(|c| {
                        let preds: Vec<f64> =
                            self.particles.iter().map(|p| p.predict(user, c)).collect();
                        let mean = preds.iter().sum::<f64>() / n;
                        let var = preds.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
                        (c, mean + alpha * var.sqrt())
                    })
                    .collect();
                argmax_random_tie(scores, rng)
            }
        }
    }

    fn update(&mut self, user: u32, item: u32, value: f64) {
        let Some(reward) = resolve_reward(value, self.config.ignore_not_rated) else {
            return;
        };
        if user as usize >= self.num_users || item as usize >= self.num_items {
            return;
        }
        if self.particles.is_empty() {
            return;
        }
        self.reweight(user, item, reward);
        self.observe(user, item, reward);
        self.refresh(user, item);
    }
}
