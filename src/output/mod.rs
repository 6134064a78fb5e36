//! Output formatting and display system
//!
//! Live tables, the end-of-run summary, burst reports and JSON output. All
//! of it goes to stdout; diagnostics go through the logger to stderr.

mod colored;
mod formatter;

pub use self::colored::{ColorScheme, ColoredFormatter, LatencyLevel};
pub use self::formatter::{
    format_latency, status_label, Alignment, Column, FormattingOptions, OutputFormatter, PlainFormatter, RowData,
    TableFormat, LATENCY_PLACEHOLDER,
};

use crate::{
    chart::{render_canvas, ChartLayout, LabelMetrics, Rect},
    error::Result,
    models::{BenchConfig, BurstRound, WorkerExit, WorkerSummary},
    reporting::WorkerRow,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool, verbose: bool) -> Box<dyn OutputFormatter + Send> {
        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
            ..Default::default()
        };

        if enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }
}

/// Machine-readable result of a paced run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub session_id: String,
    pub finished_at: DateTime<Utc>,
    pub threads: usize,
    pub interval_ms: u64,
    pub workers: Vec<WorkerSummary>,
    pub exits: Vec<WorkerExit>,
}

/// Machine-readable result of a burst run
#[derive(Debug, Clone, Serialize)]
pub struct BurstReport {
    pub session_id: String,
    pub finished_at: DateTime<Utc>,
    pub threads: usize,
    pub rounds: Vec<BurstRound>,
}

/// Main output coordinator that handles all result display
pub struct OutputCoordinator {
    formatter: Box<dyn OutputFormatter + Send>,
    options: FormattingOptions,
}

impl OutputCoordinator {
    pub fn new(config: &BenchConfig) -> Self {
        let options = FormattingOptions {
            enable_color: config.enable_color,
            verbose_mode: config.verbose,
            ..Default::default()
        };
        Self {
            formatter: OutputFormatterFactory::create_formatter(config.enable_color, config.verbose),
            options,
        }
    }

    /// One frame of the live table
    pub fn display_live(&self, rows: &[WorkerRow]) -> Result<String> {
        self.formatter.format_live_table(rows)
    }

    /// Summary table, problem workers and, in verbose mode, history charts
    pub fn display_summary(&self, summaries: &[WorkerSummary], exits: &[WorkerExit]) -> Result<String> {
        let mut output = String::new();
        output.push_str(&self.formatter.format_header("Inference Latency Summary")?);
        output.push_str("\n\n");
        output.push_str(&self.formatter.format_summary(summaries)?);
        output.push_str(&self.formatter.format_exits(exits)?);

        if self.options.verbose_mode {
            for summary in summaries {
                output.push_str(&self.display_chart(summary));
            }
        }
        Ok(output)
    }

    pub fn display_burst(&self, rounds: &[BurstRound]) -> Result<String> {
        let mut output = String::new();
        output.push_str(&self.formatter.format_header("Burst Results")?);
        output.push_str("\n\n");
        output.push_str(&self.formatter.format_burst_report(rounds)?);
        Ok(output)
    }

    /// Multi-line history chart for one worker; empty when nothing to draw
    pub fn display_chart(&self, summary: &WorkerSummary) -> String {
        let rect = Rect::new(0.0, 0.0, self.options.chart_width as f64, self.options.chart_height as f64);
        match ChartLayout::compute(&summary.history, rect, &LabelMetrics::cells()) {
            Some(layout) => {
                let mut output = format!("\nWorker {} history\n", summary.worker);
                for line in render_canvas(&layout, self.options.enable_color) {
                    output.push_str(line.trim_end());
                    output.push('\n');
                }
                output
            }
            None => String::new(),
        }
    }

    pub fn message(&self, message: &str) -> Result<String> {
        self.formatter.format_success(message)
    }

    pub fn warning(&self, warning: &str) -> Result<String> {
        self.formatter.format_warning(warning)
    }
}

/// Pretty-printed JSON for `--json`
pub fn to_json<T: Serialize>(report: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
