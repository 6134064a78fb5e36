//! Colored formatter implementation with terminal color support

use super::formatter::{
    burst_format, burst_rows, exit_lines, live_format, live_rows, render_table, summary_format, summary_rows,
    FormattingOptions, OutputFormatter, RowData, TableFormat, LATENCY_PLACEHOLDER,
};
use crate::{
    error::Result,
    models::{BurstRound, WorkerExit, WorkerSummary},
    reporting::WorkerRow,
};
use colored::*;

/// Latency classification for color coding
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LatencyLevel {
    Fast,     // < 20ms
    Normal,   // 20-50ms
    Slow,     // 50-200ms
    VerySlow, // > 200ms
}

impl LatencyLevel {
    pub fn from_latency(ms: f64) -> Self {
        if ms < 20.0 {
            Self::Fast
        } else if ms < 50.0 {
            Self::Normal
        } else if ms < 200.0 {
            Self::Slow
        } else {
            Self::VerySlow
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Fast => Color::Green,
            Self::Normal => Color::Cyan,
            Self::Slow => Color::Yellow,
            Self::VerySlow => Color::Red,
        }
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub history: Color,
    pub muted: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            history: Color::TrueColor { r: 30, g: 144, b: 255 },
            muted: Color::BrightBlack,
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self {
            options,
            color_scheme: ColorScheme::default(),
        }
    }

    pub fn with_color_scheme(options: FormattingOptions, color_scheme: ColorScheme) -> Self {
        Self { options, color_scheme }
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: Color) -> String {
        if self.options.enable_color {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    /// Color a padded latency cell by its value
    fn latency_cell(&self, cell: &str) -> String {
        match cell.trim().parse::<f64>() {
            Ok(ms) => self.colorize(cell, LatencyLevel::from_latency(ms).color()),
            Err(_) if cell.trim() == LATENCY_PLACEHOLDER => self.colorize(cell, self.color_scheme.muted),
            Err(_) => cell.to_string(),
        }
    }

    fn table<F>(&self, format: TableFormat, rows: &[RowData], paint: F) -> String
    where
        F: Fn(usize, &str) -> String,
    {
        let table = render_table(&format, rows, paint);
        if !self.options.enable_color {
            return table;
        }
        // Bold the header line
        let mut output = String::new();
        let offset = usize::from(format.show_borders);
        for (i, line) in table.lines().enumerate() {
            if i == offset {
                output.push_str(&line.bold().to_string());
            } else {
                output.push_str(line);
            }
            output.push('\n');
        }
        output
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let border = "═".repeat(title.chars().count() + 4);
        Ok(format!(
            "{}\n  {}  \n{}",
            self.colorize(&border, self.color_scheme.header),
            if self.options.enable_color {
                title.bold().color(self.color_scheme.header).to_string()
            } else {
                title.to_string()
            },
            self.colorize(&border, self.color_scheme.header)
        ))
    }

    fn format_live_table(&self, rows: &[WorkerRow]) -> Result<String> {
        Ok(self.table(live_format(self.options.table_borders), &live_rows(rows), |col, cell| match col {
            1 => self.latency_cell(cell),
            2 => self.colorize(cell, self.color_scheme.history),
            _ => cell.to_string(),
        }))
    }

    fn format_summary(&self, summaries: &[WorkerSummary]) -> Result<String> {
        if summaries.is_empty() {
            return Ok(format!("{}\n", self.colorize("No samples recorded.", self.color_scheme.muted)));
        }
        Ok(self.table(summary_format(self.options.table_borders), &summary_rows(summaries), |col, cell| {
            match col {
                2..=5 => self.latency_cell(cell),
                _ => cell.to_string(),
            }
        }))
    }

    fn format_exits(&self, exits: &[WorkerExit]) -> Result<String> {
        Ok(exit_lines(exits)
            .into_iter()
            .map(|line| format!("{} {}\n", self.colorize("✗", self.color_scheme.error), line))
            .collect())
    }

    fn format_burst_report(&self, rounds: &[BurstRound]) -> Result<String> {
        let mut output = self.table(burst_format(self.options.table_borders), &burst_rows(rounds), |col, cell| {
            match col {
                2 | 3 => self.latency_cell(cell),
                4 if cell.trim() != "0" => self.colorize(cell, self.color_scheme.error),
                _ => cell.to_string(),
            }
        });
        if !rounds.is_empty() {
            let mean_wall = rounds.iter().map(|r| r.wall_ms).sum::<f64>() / rounds.len() as f64;
            output.push_str(&format!(
                "Rounds: {}  Mean wall time: {} ms\n",
                rounds.len(),
                self.colorize(&format!("{:.2}", mean_wall), LatencyLevel::from_latency(mean_wall).color())
            ));
        }
        Ok(output)
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("{} {}", self.colorize("✗", self.color_scheme.error), error))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("{} {}", self.colorize("⚠", self.color_scheme.warning), warning))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("{} {}", self.colorize("✓", self.color_scheme.success), message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formatter(enable_color: bool) -> ColoredFormatter {
        ColoredFormatter::new(FormattingOptions {
            enable_color,
            ..Default::default()
        })
    }

    #[test]
    fn test_latency_levels() {
        assert_eq!(LatencyLevel::from_latency(5.0), LatencyLevel::Fast);
        assert_eq!(LatencyLevel::from_latency(20.0), LatencyLevel::Normal);
        assert_eq!(LatencyLevel::from_latency(120.0), LatencyLevel::Slow);
        assert_eq!(LatencyLevel::from_latency(900.0), LatencyLevel::VerySlow);
    }

    #[test]
    fn test_color_disabled_matches_plain_layout() {
        let summaries = vec![WorkerSummary {
            worker: 0,
            samples: 2,
            last_ms: Some(14.0),
            mean_ms: Some(13.0),
            min_ms: Some(12.0),
            max_ms: Some(14.0),
            std_dev_ms: Some(1.41),
            history: vec![12.0, 14.0],
            stopped: true,
        }];
        let colored = formatter(false).format_summary(&summaries).unwrap();
        assert!(!colored.contains('\x1b'));
        assert!(colored.contains("13.00"));
    }

    #[test]
    fn test_messages() {
        let f = formatter(false);
        assert_eq!(f.format_error("boom").unwrap(), "✗ boom");
        assert_eq!(f.format_success("done").unwrap(), "✓ done");
    }
}
