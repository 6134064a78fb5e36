//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::{AppError, Result},
    models::{BenchConfig, LogStyle, RunMode},
};

/// Runs when `--burst` is given without `--runs`
pub const DEFAULT_BURST_RUNS: u32 = 10;

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Defaults, then `.env`, then `ILT_*` variables, then the command line
    pub fn parse(&self) -> Result<BenchConfig> {
        let mut config = BenchConfig::default();

        EnvManager::load_env_file(self.cli.debug)?;
        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config)?;
        config.validate()?;

        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut BenchConfig) -> Result<()> {
        let cli = &self.cli;

        if let Some(ref dir) = cli.model_dir {
            config.model_dir = dir.clone();
        }
        if let Some(ref path) = cli.image_path {
            config.image_path = path.clone();
        }
        if let Some(threads) = cli.threads {
            config.threads = threads;
        }
        if let Some(interval) = cli.interval_ms {
            config.interval_ms = interval;
        }
        if let Some(history) = cli.history {
            config.history_capacity = history;
        }
        if cli.cpu {
            config.use_gpu = false;
        }
        if let Some(device_id) = cli.device_id {
            config.device_id = device_id;
        }
        if let Some(ref module_id) = cli.module_id {
            config.module_id = Some(module_id.trim().to_string());
        }
        if let Some(ref order) = cli.variant_order {
            config.variant_order = order.parse()?;
        }
        if cli.burst {
            config.mode = RunMode::Burst {
                runs: cli.runs.unwrap_or(DEFAULT_BURST_RUNS),
            };
        }
        if let Some(secs) = cli.duration {
            config.duration_secs = Some(secs);
        }
        if let Some(refresh) = cli.refresh_ms {
            config.refresh_ms = refresh;
        }
        if let Some(ref format) = cli.log_format {
            config.log_style = parse_log_style(format)?;
        }
        if let Some(color) = cli.color_override() {
            config.enable_color = color;
        }

        config.json_output = cli.json;
        // verbose and debug are CLI-only
        config.verbose = cli.verbose;
        config.debug = cli.debug;

        if config.debug {
            eprintln!("Applied CLI overrides to configuration");
            eprintln!("{}", display_config_summary(config));
        }

        Ok(())
    }
}

fn parse_log_style(value: &str) -> Result<LogStyle> {
    match value.to_lowercase().as_str() {
        "console" => Ok(LogStyle::Console),
        "json" => Ok(LogStyle::Json),
        "compact" => Ok(LogStyle::Compact),
        other => Err(AppError::config(format!(
            "Invalid log format '{}': expected console, json or compact",
            other
        ))),
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<BenchConfig> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &BenchConfig) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Model Dir: {}", config.model_dir.display()));
    summary.push(format!("Image: {}", config.image_path.display()));
    summary.push(format!("Threads: {}", config.threads));
    summary.push(format!("Interval: {}ms", config.interval_ms));
    summary.push(format!("History: {}", config.history_capacity));
    summary.push(format!(
        "Device: {}",
        if config.use_gpu {
            format!("GPU {}", config.device_id)
        } else {
            "CPU".to_string()
        }
    ));
    summary.push(format!(
        "Module: {}",
        config
            .module_id
            .clone()
            .unwrap_or_else(|| format!("latest ({})", config.variant_order.as_str()))
    ));
    summary.push(match config.mode {
        RunMode::Paced => match config.duration_secs {
            Some(secs) => format!("Mode: paced for {}s", secs),
            None => "Mode: paced until Ctrl-C".to_string(),
        },
        RunMode::Burst { runs } => format!("Mode: burst, {} rounds", runs),
    });
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}
