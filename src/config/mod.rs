//! Configuration management module

pub mod env;
pub mod parser;

pub use env::EnvManager;
pub use parser::{display_config_summary, load_config, ConfigParser, DEFAULT_BURST_RUNS};

pub use crate::models::BenchConfig;
