//! Latency statistics: bounded display history and whole-run aggregates

pub mod history;

pub use history::RollingHistory;

use serde::{Deserialize, Serialize};

/// Streaming statistics over every sample a worker produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingStats {
    pub count: usize,
    pub total_sum: f64,
    /// Sum of squared values for variance calculation
    pub sum_squared: f64,
    pub min_value: f64,
    pub max_value: f64,
}

impl RollingStats {
    /// Create new rolling statistics tracker
    pub fn new() -> Self {
        Self {
            count: 0,
            total_sum: 0.0,
            sum_squared: 0.0,
            min_value: f64::INFINITY,
            max_value: f64::NEG_INFINITY,
        }
    }

    /// Add a new value to the rolling statistics
    pub fn add_value(&mut self, value: f64) {
        self.total_sum += value;
        self.sum_squared += value * value;
        self.count += 1;

        if value < self.min_value {
            self.min_value = value;
        }
        if value > self.max_value {
            self.max_value = value;
        }
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total_sum / self.count as f64)
    }

    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min_value)
    }

    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max_value)
    }

    /// Sample variance (n - 1); `None` below two samples
    pub fn variance(&self) -> Option<f64> {
        if self.count < 2 {
            return None;
        }
        let n = self.count as f64;
        let mean = self.total_sum / n;
        Some(((self.sum_squared - n * mean * mean) / (n - 1.0)).max(0.0))
    }

    pub fn std_dev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }

    /// Reset all values
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for RollingStats {
    fn default() -> Self {
        Self::new()
    }
}
