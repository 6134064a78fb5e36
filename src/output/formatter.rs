//! Core formatting traits and the plain text implementation
//!
//! Tables are laid out on the plain cell text first and painted afterwards,
//! so ANSI escapes never disturb column widths.

use crate::{
    error::{AppError, Result},
    models::{BurstRound, WorkerExit, WorkerSummary},
    reporting::WorkerRow,
};
use std::fmt::Write as _;

/// Shown in place of a latency that has not been measured yet
pub const LATENCY_PLACEHOLDER: &str = "--";

/// Main trait for output formatting
pub trait OutputFormatter {
    /// Format a header section
    fn format_header(&self, title: &str) -> Result<String>;

    /// Live `Worker | Latency (ms) | History` table
    fn format_live_table(&self, rows: &[WorkerRow]) -> Result<String>;

    /// Whole-run figures per worker
    fn format_summary(&self, summaries: &[WorkerSummary]) -> Result<String>;

    /// Workers that did not stop cleanly; empty when all did
    fn format_exits(&self, exits: &[WorkerExit]) -> Result<String>;

    /// Per-round thread costs and wall time of a burst run
    fn format_burst_report(&self, rounds: &[BurstRound]) -> Result<String>;

    fn format_error(&self, error: &str) -> Result<String>;

    fn format_warning(&self, warning: &str) -> Result<String>;

    fn format_success(&self, message: &str) -> Result<String>;
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Add per-worker history charts to the summary
    pub verbose_mode: bool,
    /// Show table borders
    pub table_borders: bool,
    /// Character cells per history chart
    pub chart_width: usize,
    pub chart_height: usize,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
            table_borders: true,
            chart_width: 60,
            chart_height: 18,
        }
    }
}

/// Table formatting configuration
#[derive(Debug, Clone)]
pub struct TableFormat {
    pub columns: Vec<Column>,
    pub show_borders: bool,
}

/// Column definition for table formatting
#[derive(Debug, Clone)]
pub struct Column {
    pub header: String,
    pub alignment: Alignment,
    pub min_width: usize,
}

impl Column {
    pub fn left(header: &str) -> Self {
        Self {
            header: header.to_string(),
            alignment: Alignment::Left,
            min_width: 0,
        }
    }

    pub fn right(header: &str) -> Self {
        Self {
            header: header.to_string(),
            alignment: Alignment::Right,
            min_width: 0,
        }
    }
}

/// Text alignment options
#[derive(Debug, Clone, Copy)]
pub enum Alignment {
    Left,
    Right,
}

/// Row data for table formatting
pub type RowData = Vec<String>;

/// Two decimals, or the placeholder when there is no value
pub fn format_latency(value: Option<f64>) -> String {
    match value {
        Some(ms) => format!("{:.2}", ms),
        None => LATENCY_PLACEHOLDER.to_string(),
    }
}

/// Short status word for a worker row
pub fn status_label(exit: Option<&WorkerExit>) -> &'static str {
    match exit {
        None => "running",
        Some(WorkerExit::Stopped { .. }) => "stopped",
        Some(WorkerExit::LoadFailed { .. }) => "load failed",
        Some(WorkerExit::Panicked { .. }) => "panicked",
    }
}

pub(crate) fn live_rows(rows: &[WorkerRow]) -> Vec<RowData> {
    rows.iter()
        .map(|row| {
            vec![
                row.worker.to_string(),
                format_latency(row.last_ms),
                crate::chart::sparkline(&row.history.as_vec()),
            ]
        })
        .collect()
}

pub(crate) fn live_format(show_borders: bool) -> TableFormat {
    TableFormat {
        columns: vec![
            Column::right("Worker"),
            Column::right("Latency (ms)"),
            Column {
                min_width: 10,
                ..Column::left("History")
            },
        ],
        show_borders,
    }
}

pub(crate) fn summary_rows(summaries: &[WorkerSummary]) -> Vec<RowData> {
    summaries
        .iter()
        .map(|s| {
            vec![
                s.worker.to_string(),
                s.samples.to_string(),
                format_latency(s.last_ms),
                format_latency(s.mean_ms),
                format_latency(s.min_ms),
                format_latency(s.max_ms),
                format_latency(s.std_dev_ms),
            ]
        })
        .collect()
}

pub(crate) fn summary_format(show_borders: bool) -> TableFormat {
    TableFormat {
        columns: ["Worker", "Samples", "Last", "Mean", "Min", "Max", "Std Dev"]
            .iter()
            .map(|h| Column::right(h))
            .collect(),
        show_borders,
    }
}

pub(crate) fn burst_rows(rounds: &[BurstRound]) -> Vec<RowData> {
    rounds
        .iter()
        .map(|r| {
            let costs: Vec<String> = r.thread_costs_ms.iter().map(|c| format_latency(*c)).collect();
            vec![
                r.round.to_string(),
                costs.join(" "),
                format_latency(r.slowest_ms()),
                format!("{:.2}", r.wall_ms),
                r.failures().to_string(),
            ]
        })
        .collect()
}

pub(crate) fn burst_format(show_borders: bool) -> TableFormat {
    TableFormat {
        columns: vec![
            Column::right("Round"),
            Column::left("Thread costs (ms)"),
            Column::right("Slowest"),
            Column::right("Wall (ms)"),
            Column::right("Failures"),
        ],
        show_borders,
    }
}

pub(crate) fn exit_lines(exits: &[WorkerExit]) -> Vec<String> {
    exits
        .iter()
        .filter_map(|exit| match exit {
            WorkerExit::Stopped { .. } => None,
            WorkerExit::LoadFailed { worker, reason } => Some(format!("worker {}: load failed: {}", worker, reason)),
            WorkerExit::Panicked { worker } => Some(format!("worker {}: panicked", worker)),
        })
        .collect()
}

/// Lay out a table; `paint(column, cell)` decorates each padded cell
pub(crate) fn render_table<F>(format: &TableFormat, rows: &[RowData], paint: F) -> String
where
    F: Fn(usize, &str) -> String,
{
    let widths = column_widths(format, rows);
    let mut output = String::new();

    let headers: Vec<String> = format.columns.iter().map(|c| c.header.clone()).collect();
    if format.show_borders {
        output.push_str(&horizontal_border(&widths));
        output.push('\n');
    }
    output.push_str(&table_row(&headers, &widths, format, |_, cell| cell.to_string()));
    output.push('\n');
    if format.show_borders {
        output.push_str(&horizontal_border(&widths));
        output.push('\n');
    }

    for row in rows {
        output.push_str(&table_row(row, &widths, format, &paint));
        output.push('\n');
    }

    if format.show_borders && !rows.is_empty() {
        output.push_str(&horizontal_border(&widths));
        output.push('\n');
    }

    output
}

fn display_width(text: &str) -> usize {
    text.chars().count()
}

fn column_widths(format: &TableFormat, rows: &[RowData]) -> Vec<usize> {
    format
        .columns
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            rows.iter()
                .filter_map(|row| row.get(idx))
                .map(|cell| display_width(cell))
                .fold(col.min_width.max(display_width(&col.header)), usize::max)
        })
        .collect()
}

fn table_row<F>(data: &[String], widths: &[usize], format: &TableFormat, paint: F) -> String
where
    F: Fn(usize, &str) -> String,
{
    let mut row = String::new();
    if format.show_borders {
        row.push('|');
    }

    for (idx, &width) in widths.iter().enumerate() {
        let cell = data.get(idx).map(String::as_str).unwrap_or("");
        let alignment = format.columns.get(idx).map(|c| c.alignment).unwrap_or(Alignment::Left);
        let padded = paint(idx, &align_text(cell, width, alignment));

        if format.show_borders {
            row.push(' ');
            row.push_str(&padded);
            row.push_str(" |");
        } else {
            row.push_str(&padded);
            row.push_str("  ");
        }
    }

    row.trim_end().to_string()
}

fn horizontal_border(widths: &[usize]) -> String {
    let mut border = String::from("+");
    for &width in widths {
        border.push_str(&"-".repeat(width + 2));
        border.push('+');
    }
    border
}

fn align_text(text: &str, width: usize, alignment: Alignment) -> String {
    let len = display_width(text);
    if len >= width {
        return text.to_string();
    }
    let padding = " ".repeat(width - len);
    match alignment {
        Alignment::Left => format!("{}{}", text, padding),
        Alignment::Right => format!("{}{}", padding, text),
    }
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    /// Create a new plain formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    fn table(&self, format: TableFormat, rows: &[RowData]) -> String {
        render_table(&format, rows, |_, cell| cell.to_string())
    }
}

fn io_err(e: std::fmt::Error) -> AppError {
    AppError::io(format!("Failed to format output: {}", e))
}

impl OutputFormatter for PlainFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "=".repeat(title.len() + 4);
        writeln!(output, "{}", border).map_err(io_err)?;
        writeln!(output, "  {}  ", title).map_err(io_err)?;
        write!(output, "{}", border).map_err(io_err)?;
        Ok(output)
    }

    fn format_live_table(&self, rows: &[WorkerRow]) -> Result<String> {
        Ok(self.table(live_format(self.options.table_borders), &live_rows(rows)))
    }

    fn format_summary(&self, summaries: &[WorkerSummary]) -> Result<String> {
        if summaries.is_empty() {
            return Ok("No samples recorded.\n".to_string());
        }
        Ok(self.table(summary_format(self.options.table_borders), &summary_rows(summaries)))
    }

    fn format_exits(&self, exits: &[WorkerExit]) -> Result<String> {
        let mut output = String::new();
        for line in exit_lines(exits) {
            writeln!(output, "! {}", line).map_err(io_err)?;
        }
        Ok(output)
    }

    fn format_burst_report(&self, rounds: &[BurstRound]) -> Result<String> {
        let mut output = self.table(burst_format(self.options.table_borders), &burst_rows(rounds));
        if !rounds.is_empty() {
            let mean_wall = rounds.iter().map(|r| r.wall_ms).sum::<f64>() / rounds.len() as f64;
            writeln!(output, "Rounds: {}  Mean wall time: {:.2} ms", rounds.len(), mean_wall).map_err(io_err)?;
        }
        Ok(output)
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("ERROR: {}", error))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("WARNING: {}", warning))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("OK: {}", message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(worker: usize, last: Option<f64>) -> WorkerSummary {
        WorkerSummary {
            worker,
            samples: last.map_or(0, |_| 4),
            last_ms: last,
            mean_ms: last,
            min_ms: last,
            max_ms: last,
            std_dev_ms: None,
            history: last.into_iter().collect(),
            stopped: true,
        }
    }

    fn plain() -> PlainFormatter {
        PlainFormatter::new(FormattingOptions {
            enable_color: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_format_latency() {
        assert_eq!(format_latency(Some(12.345)), "12.35");
        assert_eq!(format_latency(Some(3.0)), "3.00");
        assert_eq!(format_latency(None), "--");
    }

    #[test]
    fn test_status_label() {
        assert_eq!(status_label(None), "running");
        assert_eq!(status_label(Some(&WorkerExit::Panicked { worker: 0 })), "panicked");
    }

    #[test]
    fn test_summary_table() {
        let output = plain().format_summary(&[summary(0, Some(12.5)), summary(1, None)]).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert!(lines[1].contains("Worker") && lines[1].contains("Std Dev"));
        assert!(lines[3].contains("12.50"));
        assert!(lines[4].contains("--"));
        // every line of a bordered table has the same width
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == width));
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(plain().format_summary(&[]).unwrap(), "No samples recorded.\n");
    }

    #[test]
    fn test_burst_report() {
        let rounds = vec![
            BurstRound {
                round: 1,
                thread_costs_ms: vec![Some(10.0), Some(12.0)],
                wall_ms: 12.5,
            },
            BurstRound {
                round: 2,
                thread_costs_ms: vec![Some(11.0), None],
                wall_ms: 11.5,
            },
        ];
        let output = plain().format_burst_report(&rounds).unwrap();
        assert!(output.contains("10.00 12.00"));
        assert!(output.contains("11.00 --"));
        assert!(output.contains("Mean wall time: 12.00 ms"));
    }

    #[test]
    fn test_exit_lines_skip_clean() {
        let exits = vec![
            WorkerExit::Stopped {
                worker: 0,
                samples: 3,
                failures: 0,
            },
            WorkerExit::LoadFailed {
                worker: 1,
                reason: "no descriptor".into(),
            },
        ];
        let output = plain().format_exits(&exits).unwrap();
        assert_eq!(output, "! worker 1: load failed: no descriptor\n");
    }

    #[test]
    fn test_align_counts_chars_not_bytes() {
        assert_eq!(align_text("▁▂", 4, Alignment::Left), "▁▂  ");
        assert_eq!(align_text("ab", 4, Alignment::Right), "  ab");
    }
}
