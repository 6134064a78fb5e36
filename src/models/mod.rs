//! Data models and structures for the inference latency tester

pub mod config;
pub mod metrics;

// Re-export main model types
pub use config::{BenchConfig, LogStyle, RunMode};
pub use metrics::{BurstRound, LatencySample, WorkerExit, WorkerSummary};
