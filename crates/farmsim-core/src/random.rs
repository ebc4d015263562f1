//! Random processes driving the workload.
//!
//! A single seeded [`ChaCha8Rng`] stream feeds arrival counts, item keys and
//! the uniform draws of randomized dispatch policies, so a run is fully
//! reproducible from its seed.

use farmsim_dispatch::UniformSource;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp1, Poisson};
use std::time::{SystemTime, UNIX_EPOCH};

/// Seeded source of arrivals, item keys and uniform choices.
#[derive(Debug, Clone)]
pub struct RandomProcess {
    rng: ChaCha8Rng,
    seed: u64,
    /// Scale of the exponential key distribution.
    item_parameter: f64,
    /// Poisson distribution for the last requested rate.
    arrivals: Option<(f64, Poisson<f64>)>,
}

impl RandomProcess {
    pub fn new(seed: u64, item_parameter: f64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            item_parameter,
            arrivals: None,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of requests arriving in one tick, Poisson with mean `rate`.
    ///
    /// A rate of zero (or anything not strictly positive) yields no arrivals.
    pub fn next_arrival_count(&mut self, rate: f64) -> u64 {
        if rate.is_nan() || rate <= 0.0 {
            return 0;
        }
        let cached = self
            .arrivals
            .as_ref()
            .filter(|(cached_rate, _)| *cached_rate == rate)
            .map(|(_, poisson)| poisson.clone());
        let poisson = match cached {
            Some(poisson) => poisson,
            None => match Poisson::new(rate) {
                Ok(poisson) => {
                    self.arrivals = Some((rate, poisson.clone()));
                    poisson
                }
                Err(_) => return 0,
            },
        };
        let count: f64 = poisson.sample(&mut self.rng);
        count as u64
    }

    /// Popularity key: `floor(Exp(1) * item_parameter)`.
    ///
    /// Small keys are the most popular ones.
    pub fn next_item_key(&mut self) -> u64 {
        let draw: f64 = Exp1.sample(&mut self.rng);
        (draw * self.item_parameter).floor() as u64
    }

    /// Uniform integer in `[0, n)`; zero when `n` is zero.
    pub fn choose_uniform(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        self.rng.gen_range(0..n)
    }
}

impl UniformSource for RandomProcess {
    fn choose_uniform(&mut self, n: usize) -> usize {
        RandomProcess::choose_uniform(self, n)
    }
}

/// Seed derived from the current wall-clock time in nanoseconds.
pub fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
