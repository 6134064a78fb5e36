//! Inference Latency Tester
//!
//! Runs N independent inference workers against one model directory, each on its
//! own OS thread with its own pipeline, paced at a fixed interval. Latencies
//! flow through a channel to a single display loop that keeps the latest
//! value, a bounded history and whole-run statistics per worker.

pub mod chart;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod output;
pub mod pacing;
pub mod reporting;
pub mod sdk;
pub mod stats;
pub mod worker;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use models::{BenchConfig, BurstRound, LatencySample, RunMode, WorkerExit, WorkerSummary};
pub use orchestrator::Orchestrator;
pub use output::{OutputCoordinator, OutputFormatter};
pub use reporting::{ReportEvent, ReportingSink, ResultsBoard};
pub use sdk::{InferenceBackend, ModelHandle, Pipeline, SimulatedBackend, VariantOrdering};
pub use stats::{RollingHistory, RollingStats};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const BUILD_TIME: Option<&str> = option_env!("BUILD_TIME");
pub const GIT_COMMIT: Option<&str> = option_env!("GIT_COMMIT");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_THREADS: usize = 2;
    pub const MAX_THREADS: usize = 128;
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);
    /// Samples kept per worker for the history column
    pub const MAX_HISTORY_POINTS: usize = 30;
    pub const DEFAULT_REFRESH: Duration = Duration::from_millis(500);
    pub const DEFAULT_IMAGE_PATH: &str = "./image.bmp";
    pub const DEFAULT_ENABLE_COLOR: bool = true;
}
