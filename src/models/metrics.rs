//! Latency samples and run result data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One timed inference call from one worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencySample {
    /// Index of the worker that produced the sample
    pub worker: usize,

    /// Wall-clock duration of the inference call
    pub elapsed_ms: f64,

    /// Per-worker cycle number; increases with every emitted sample
    pub sequence: u64,

    /// Time the call finished
    pub timestamp: DateTime<Utc>,
}

impl LatencySample {
    /// Create a sample from a measured duration
    pub fn new(worker: usize, elapsed: Duration, sequence: u64) -> Self {
        Self {
            worker,
            elapsed_ms: elapsed.as_secs_f64() * 1000.0,
            sequence,
            timestamp: Utc::now(),
        }
    }
}

/// Why a worker loop ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerExit {
    /// Observed the stop signal
    Stopped { worker: usize, samples: u64, failures: u64 },
    /// Model or pipeline could not be created
    LoadFailed { worker: usize, reason: String },
    /// The worker thread panicked
    Panicked { worker: usize },
}

impl WorkerExit {
    pub fn worker(&self) -> usize {
        match self {
            Self::Stopped { worker, .. } | Self::LoadFailed { worker, .. } | Self::Panicked { worker } => *worker,
        }
    }

    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Stopped { .. })
    }
}

/// Final per-worker figures for the summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSummary {
    pub worker: usize,
    pub samples: usize,
    pub last_ms: Option<f64>,
    pub mean_ms: Option<f64>,
    pub min_ms: Option<f64>,
    pub max_ms: Option<f64>,
    pub std_dev_ms: Option<f64>,
    /// Most recent samples, oldest first
    pub history: Vec<f64>,
    pub stopped: bool,
}

/// One round of burst mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurstRound {
    /// 1-based round number
    pub round: u32,
    /// Per-thread cost in milliseconds; `None` when that call failed
    pub thread_costs_ms: Vec<Option<f64>>,
    /// Wall time of the whole round
    pub wall_ms: f64,
}

impl BurstRound {
    /// Slowest successful call of the round
    pub fn slowest_ms(&self) -> Option<f64> {
        self.thread_costs_ms.iter().flatten().copied().fold(None, |acc, v| match acc {
            Some(max) if max >= v => Some(max),
            _ => Some(v),
        })
    }

    pub fn failures(&self) -> usize {
        self.thread_costs_ms.iter().filter(|c| c.is_none()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_from_duration() {
        let sample = LatencySample::new(3, Duration::from_micros(12_345), 7);
        assert_eq!(sample.worker, 3);
        assert_eq!(sample.sequence, 7);
        assert!((sample.elapsed_ms - 12.345).abs() < 1e-9);
    }

    #[test]
    fn test_worker_exit_accessors() {
        let stopped = WorkerExit::Stopped { worker: 1, samples: 10, failures: 0 };
        let failed = WorkerExit::LoadFailed { worker: 2, reason: "missing".into() };
        assert_eq!(stopped.worker(), 1);
        assert_eq!(failed.worker(), 2);
        assert!(stopped.is_clean());
        assert!(!failed.is_clean());
        assert!(!WorkerExit::Panicked { worker: 0 }.is_clean());
    }

    #[test]
    fn test_burst_round_slowest() {
        let round = BurstRound {
            round: 1,
            thread_costs_ms: vec![Some(12.0), None, Some(30.5), Some(8.0)],
            wall_ms: 31.0,
        };
        assert_eq!(round.slowest_ms(), Some(30.5));
        assert_eq!(round.failures(), 1);

        let empty = BurstRound { round: 2, thread_costs_ms: vec![None], wall_ms: 1.0 };
        assert_eq!(empty.slowest_ms(), None);
    }
}
