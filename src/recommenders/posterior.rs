//! Conjugate posteriors for online reward estimation

use rand::Rng;
use rand_distr::{Beta, Distribution, Gamma};

/// Beta posterior over a success probability
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BetaPosterior {
    /// Alpha parameter (pseudo-count of successes)
    pub alpha: f64,
    /// Beta parameter (pseudo-count of failures)
    pub beta: f64,
}

impl BetaPosterior {
    /// Create with uniform prior (α = β = 1)
    pub fn uniform() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
        }
    }

    /// Create with custom prior
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }

    /// Update with a fractional outcome in `[0, 1]`
    ///
    /// Values outside the interval are clamped.
    pub fn observe(&mut self, reward: f64) {
        let reward = reward.clamp(0.0, 1.0);
        self.alpha += reward;
        self.beta += 1.0 - reward;
    }

    /// Posterior mean
    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }

    /// Posterior variance
    pub fn variance(&self) -> f64 {
        let sum = self.alpha + self.beta;
        (self.alpha * self.beta) / (sum * sum * (sum + 1.0))
    }

    /// Sample from the posterior, the mean if the parameters are degenerate
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match Beta::new(self.alpha, self.beta) {
            Ok(dist) => dist.sample(rng),
            Err(_) => self.mean(),
        }
    }
}

impl Default for BetaPosterior {
    fn default() -> Self {
        Self::uniform()
    }
}

/// Gamma posterior over a positive precision
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GammaPosterior {
    /// Shape parameter (α)
    pub shape: f64,
    /// Rate parameter (β)
    pub rate: f64,
}

impl GammaPosterior {
    /// Create with custom prior
    pub fn new(shape: f64, rate: f64) -> Self {
        Self { shape, rate }
    }

    /// Conjugate update for `count` zero-mean Gaussian draws whose squares
    /// sum to `sum_sq`
    pub fn updated(&self, count: usize, sum_sq: f64) -> Self {
        Self {
            shape: self.shape + count as f64 / 2.0,
            rate: self.rate + sum_sq / 2.0,
        }
    }

    /// Posterior mean
    pub fn mean(&self) -> f64 {
        self.shape / self.rate
    }

    /// Sample from the posterior, the mean if the parameters are degenerate
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match Gamma::new(self.shape, 1.0 / self.rate) {
            Ok(dist) => dist.sample(rng),
            Err(_) => self.mean(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_beta_observe() {
        let mut post = BetaPosterior::uniform();
        post.observe(1.0);
        post.observe(1.0);
        post.observe(0.0);
        assert!((post.mean() - 0.6).abs() < 1e-12);
        post.observe(7.0);
        assert_eq!(post.alpha, 4.0);
    }

    #[test]
    fn test_beta_sample_in_unit_interval() {
        let mut rng = StdRng::seed_from_u64(42);
        let post = BetaPosterior::new(3.0, 5.0);
        for _ in 0..100 {
            let x = post.sample(&mut rng);
            assert!((0.0..=1.0).contains(&x));
        }
    }

    #[test]
    fn test_gamma_update() {
        let prior = GammaPosterior::new(2.0, 1.0);
        let post = prior.updated(4, 6.0);
        assert_eq!(post.shape, 4.0);
        assert_eq!(post.rate, 4.0);
        assert!((post.mean() - 1.0).abs() < 1e-12);

        let mut rng = StdRng::seed_from_u64(1);
        assert!(post.sample(&mut rng) > 0.0);
    }
}
