//! Run configuration data model and validation

use crate::error::{AppError, Result};
use crate::sdk::{DeviceSelection, VariantOrdering};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// How a run drives the workers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    /// Independent paced workers until stopped
    Paced,
    /// Fixed number of rounds, every pipeline fired concurrently once per round
    Burst { runs: u32 },
}

/// Log output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogStyle {
    Console,
    Json,
    Compact,
}

/// Main benchmark configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Directory holding the model descriptor
    #[serde(default)]
    pub model_dir: PathBuf,

    /// Image fed to every inference call
    #[serde(default = "default_image_path")]
    pub image_path: PathBuf,

    /// Number of worker threads
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Pacing interval between inference calls of one worker
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Rolling history capacity per worker
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    #[serde(default = "default_use_gpu")]
    pub use_gpu: bool,

    #[serde(default)]
    pub device_id: u32,

    /// Explicit module variant; the latest one is used when absent
    #[serde(default)]
    pub module_id: Option<String>,

    #[serde(default)]
    pub variant_order: VariantOrdering,

    #[serde(default = "default_mode")]
    pub mode: RunMode,

    /// Stop a paced run automatically after this many seconds
    #[serde(default)]
    pub duration_secs: Option<u64>,

    /// Table redraw period
    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,

    #[serde(default)]
    pub json_output: bool,

    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    #[serde(default)]
    pub verbose: bool,

    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_log_style")]
    pub log_style: LogStyle,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::new(),
            image_path: default_image_path(),
            threads: default_threads(),
            interval_ms: default_interval_ms(),
            history_capacity: default_history_capacity(),
            use_gpu: default_use_gpu(),
            device_id: 0,
            module_id: None,
            variant_order: VariantOrdering::default(),
            mode: default_mode(),
            duration_secs: None,
            refresh_ms: default_refresh_ms(),
            json_output: false,
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
            log_style: default_log_style(),
        }
    }
}

impl BenchConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Pacing interval as Duration
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Table refresh period as Duration
    pub fn refresh(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }

    /// Device placement handed to pipeline creation
    pub fn device(&self) -> DeviceSelection {
        DeviceSelection {
            use_gpu: self.use_gpu,
            device_id: self.device_id,
        }
    }

    /// Validate the configuration and return the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.model_dir.as_os_str().is_empty() {
            return Err(AppError::config("Model directory cannot be empty"));
        }

        if self.image_path.as_os_str().is_empty() {
            return Err(AppError::config("Image path cannot be empty"));
        }

        if self.threads == 0 {
            return Err(AppError::config("Thread count must be at least 1"));
        }

        if self.threads > crate::defaults::MAX_THREADS {
            return Err(AppError::config(format!(
                "Thread count cannot exceed {}",
                crate::defaults::MAX_THREADS
            )));
        }

        if self.interval_ms == 0 {
            return Err(AppError::config("Interval must be greater than 0"));
        }

        if self.interval_ms > 60_000 {
            return Err(AppError::config("Interval cannot exceed 60000 ms"));
        }

        if self.history_capacity == 0 || self.history_capacity > 1024 {
            return Err(AppError::config("History capacity must be between 1 and 1024"));
        }

        if self.refresh_ms == 0 {
            return Err(AppError::config("Refresh period must be greater than 0"));
        }

        if let RunMode::Burst { runs: 0 } = self.mode {
            return Err(AppError::config("Burst mode needs at least one run"));
        }

        if let Some(ref id) = self.module_id {
            if id.trim().is_empty() {
                return Err(AppError::config("Module id cannot be empty"));
            }
        }

        Ok(())
    }

    /// Merge `ILT_*` environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var("ILT_MODEL_DIR") {
            self.model_dir = PathBuf::from(dir.trim());
        }

        if let Ok(path) = std::env::var("ILT_IMAGE_PATH") {
            self.image_path = PathBuf::from(path.trim());
        }

        if let Ok(threads) = std::env::var("ILT_THREADS") {
            self.threads = threads
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid ILT_THREADS value '{}': {}", threads, e)))?;
        }

        if let Ok(interval) = std::env::var("ILT_INTERVAL_MS") {
            self.interval_ms = interval
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid ILT_INTERVAL_MS value '{}': {}", interval, e)))?;
        }

        if let Ok(history) = std::env::var("ILT_HISTORY") {
            self.history_capacity = history
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid ILT_HISTORY value '{}': {}", history, e)))?;
        }

        if let Ok(use_gpu) = std::env::var("ILT_USE_GPU") {
            self.use_gpu = use_gpu
                .trim()
                .to_lowercase()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid ILT_USE_GPU value '{}': {}", use_gpu, e)))?;
        }

        if let Ok(device_id) = std::env::var("ILT_DEVICE_ID") {
            self.device_id = device_id
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid ILT_DEVICE_ID value '{}': {}", device_id, e)))?;
        }

        if let Ok(module_id) = std::env::var("ILT_MODULE_ID") {
            let module_id = module_id.trim();
            if !module_id.is_empty() {
                self.module_id = Some(module_id.to_string());
            }
        }

        if let Ok(order) = std::env::var("ILT_VARIANT_ORDER") {
            self.variant_order = order.trim().parse()?;
        }

        if let Ok(enable_color) = std::env::var("ILT_ENABLE_COLOR") {
            self.enable_color = enable_color
                .trim()
                .to_lowercase()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid ILT_ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

fn default_image_path() -> PathBuf {
    PathBuf::from(crate::defaults::DEFAULT_IMAGE_PATH)
}

fn default_threads() -> usize {
    crate::defaults::DEFAULT_THREADS
}

fn default_interval_ms() -> u64 {
    crate::defaults::DEFAULT_INTERVAL.as_millis() as u64
}

fn default_history_capacity() -> usize {
    crate::defaults::MAX_HISTORY_POINTS
}

fn default_use_gpu() -> bool {
    true
}

fn default_mode() -> RunMode {
    RunMode::Paced
}

fn default_refresh_ms() -> u64 {
    crate::defaults::DEFAULT_REFRESH.as_millis() as u64
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

fn default_log_style() -> LogStyle {
    LogStyle::Console
}
