// Worker Pool Configuration
// Pool size and fatigue multiplier range, loadable from YAML or JSON

use crate::error::{EngineError, EngineResult};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Configuration for the worker pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PoolConfig {
    /// Number of worker threads (must be > 0)
    pub workers: usize,
    /// Lower bound of the per-worker fatigue multiplier
    pub min_fatigue_factor: f64,
    /// Upper bound of the per-worker fatigue multiplier
    pub max_fatigue_factor: f64,
    /// Seed for the multiplier draw; random when absent
    pub seed: Option<u64>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(4),
            min_fatigue_factor: 0.5,
            max_fatigue_factor: 1.5,
            seed: None,
        }
    }
}

impl PoolConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_fatigue_range(mut self, min: f64, max: f64) -> Self {
        self.min_fatigue_factor = min;
        self.max_fatigue_factor = max;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Parse a configuration document; JSON is a subset of YAML so both are accepted
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.workers == 0 {
            return Err(EngineError::invalid_argument(
                "worker count must be greater than 0",
            ));
        }
        let (min, max) = (self.min_fatigue_factor, self.max_fatigue_factor);
        if !min.is_finite() || !max.is_finite() || min <= 0.0 || min > max {
            return Err(EngineError::invalid_argument(format!(
                "fatigue factor range must satisfy 0 < min <= max, got {}..={}",
                min, max
            )));
        }
        Ok(())
    }

    /// Draw one fatigue multiplier per worker
    pub(crate) fn draw_multipliers(&self) -> Vec<f64> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        (0..self.workers)
            .map(|_| rng.gen_range(self.min_fatigue_factor..=self.max_fatigue_factor))
            .collect()
    }
}
