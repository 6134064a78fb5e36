//! Command-line interface
//!
//! Every run setting is optional here; anything left unset falls back to the
//! environment and then to the built-in defaults (see [`crate::config`]).

use clap::Parser;
use std::path::PathBuf;

/// Inference Latency Tester - measure per-thread inference latency under concurrency
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "ilt")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory containing the model descriptor (model.vimosln)
    #[arg(short, long, value_name = "DIR")]
    pub model_dir: Option<PathBuf>,

    /// Image fed to every inference call
    #[arg(short, long = "image", value_name = "PATH")]
    pub image_path: Option<PathBuf>,

    /// Number of worker threads
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Pacing interval per worker, in milliseconds
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Stop automatically after this many seconds (default: run until Ctrl-C)
    #[arg(short, long, value_name = "SECS", value_parser = parse_duration)]
    pub duration: Option<u64>,

    /// Number of recent samples kept per worker
    #[arg(long, value_name = "K")]
    pub history: Option<usize>,

    /// Run pipelines on the CPU instead of a GPU
    #[arg(long)]
    pub cpu: bool,

    /// GPU device index
    #[arg(long)]
    pub device_id: Option<u32>,

    /// Module variant to run (default: the latest one)
    #[arg(long)]
    pub module_id: Option<String>,

    /// How "latest" is decided among variant ids: numeric or lexical
    #[arg(long, value_name = "ORDER")]
    pub variant_order: Option<String>,

    /// Fire every pipeline concurrently for a fixed number of rounds
    #[arg(long)]
    pub burst: bool,

    /// Number of burst rounds
    #[arg(long, requires = "burst")]
    pub runs: Option<u32>,

    /// Live table redraw period, in milliseconds
    #[arg(long, value_name = "MS")]
    pub refresh_ms: Option<u64>,

    /// Print the final report as JSON
    #[arg(long)]
    pub json: bool,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Log format: console, json or compact
    #[arg(long, value_name = "FORMAT")]
    pub log_format: Option<String>,

    /// Print an example .env file and exit
    #[arg(long)]
    pub print_env_example: bool,

    /// Write an example model and image into DIR and exit
    #[arg(long, value_name = "DIR")]
    pub init_model: Option<PathBuf>,
}

impl Cli {
    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if self.burst && self.duration.is_some() {
            return Err("--duration only applies to paced runs, not --burst".to_string());
        }

        if self.runs == Some(0) {
            return Err("--runs must be at least 1".to_string());
        }

        if let Some(ref id) = self.module_id {
            if id.trim().is_empty() {
                return Err("--module-id cannot be empty".to_string());
            }
        }

        Ok(())
    }

    /// True for invocations that print something and exit without a run
    pub fn is_utility_command(&self) -> bool {
        self.print_env_example || self.init_model.is_some()
    }

    /// `Some(true)`/`Some(false)` when forced, `None` to auto-detect
    pub fn color_override(&self) -> Option<bool> {
        if self.color {
            Some(true)
        } else if self.no_color {
            Some(false)
        } else {
            None
        }
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        self.color_override().unwrap_or_else(supports_color)
    }
}

/// Parse a run duration in whole seconds
fn parse_duration(s: &str) -> Result<u64, String> {
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid duration: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid duration: {}", s))
        .and_then(|secs| {
            if secs == 0 {
                Err("Duration must be greater than 0".to_string())
            } else if secs > 86_400 {
                Err("Duration cannot exceed 86400 seconds".to_string())
            } else {
                Ok(secs)
            }
        })
}

/// Check if the terminal supports color output
pub fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}
