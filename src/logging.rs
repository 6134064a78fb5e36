//! Structured logging for worker threads and the run loop
//!
//! Loggers are synchronous and cheap to clone, so every worker thread can
//! carry its own. Each entry carries the emitting thread's name, the run's
//! session id and any context fields of its logger. Output goes to stderr in
//! the configured [`LogStyle`]; stdout belongs to the results table.

use crate::error::AppError;
use crate::models::{BenchConfig, LatencySample, LogStyle};
use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

/// Severity, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    /// Skipped cycles and other recoverable problems
    Warn,
    /// A worker or the whole run could not continue
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    fn paint(&self, text: String) -> ColoredString {
        match self {
            LogLevel::Debug => text.cyan(),
            LogLevel::Info => text.green(),
            LogLevel::Warn => text.yellow(),
            LogLevel::Error => text.red().bold(),
        }
    }
}

/// One structured log record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    /// Component that emitted the entry, e.g. `worker-3`
    pub logger: String,
    pub message: String,
    /// Name of the emitting thread, if it has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<LogLocation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLocation {
    pub file: String,
    pub line: u32,
}

/// Collects entries in memory instead of printing them
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl LogBuffer {
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn push(&self, entry: LogEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }
}

#[derive(Debug, Clone)]
enum Destination {
    Stderr,
    Buffer(LogBuffer),
}

/// Named, level-filtered logger
#[derive(Debug, Clone)]
pub struct Logger {
    name: String,
    min_level: LogLevel,
    style: LogStyle,
    use_color: bool,
    include_location: bool,
    /// Fields stamped on every entry; shared by clones, copied by `named`
    context: Arc<RwLock<BTreeMap<String, Value>>>,
    destination: Destination,
}

impl Logger {
    /// Console logger at Info level
    pub fn new(name: String) -> Self {
        Self {
            name,
            min_level: LogLevel::Info,
            style: LogStyle::Console,
            use_color: true,
            include_location: false,
            context: Arc::default(),
            destination: Destination::Stderr,
        }
    }

    /// `--debug` logs everything with source locations, `--verbose` logs
    /// run progress, otherwise only warnings and errors are shown
    pub fn with_config(name: String, config: &BenchConfig) -> Self {
        let min_level = match (config.debug, config.verbose) {
            (true, _) => LogLevel::Debug,
            (false, true) => LogLevel::Info,
            (false, false) => LogLevel::Warn,
        };
        Self {
            min_level,
            style: config.log_style,
            use_color: config.enable_color,
            include_location: config.debug,
            ..Self::new(name)
        }
    }

    /// Logger that keeps every entry in the returned buffer
    pub fn buffered(name: String) -> (Self, LogBuffer) {
        let buffer = LogBuffer::default();
        let logger = Self {
            min_level: LogLevel::Debug,
            destination: Destination::Buffer(buffer.clone()),
            ..Self::new(name)
        };
        (logger, buffer)
    }

    /// Same destination and settings under another component name.
    ///
    /// The child starts with a copy of the parent's context; fields added
    /// to it afterwards stay local to the child.
    pub fn named(&self, name: &str) -> Self {
        let fields = self.context.read().map(|c| c.clone()).unwrap_or_default();
        Self {
            name: name.to_string(),
            context: Arc::new(RwLock::new(fields)),
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    /// Stamp `key = value` on every later entry of this logger and its clones
    pub fn add_context_field<T: Serialize>(&self, key: String, value: T) {
        if let (Ok(value), Ok(mut context)) = (serde_json::to_value(value), self.context.write()) {
            context.insert(key, value);
        }
    }

    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder {
            logger: self,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                logger: self.name.clone(),
                message: message.to_string(),
                thread: std::thread::current().name().map(String::from),
                fields: BTreeMap::new(),
                location: None,
            },
        }
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    fn emit(&self, mut entry: LogEntry) {
        if !self.would_log(entry.level) {
            return;
        }
        if let Ok(context) = self.context.read() {
            for (key, value) in context.iter() {
                entry.fields.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }

        match &self.destination {
            Destination::Buffer(buffer) => buffer.push(entry),
            Destination::Stderr => {
                let line = self.render(&entry);
                let _ = writeln!(io::stderr().lock(), "{}", line);
            }
        }
    }

    fn render(&self, entry: &LogEntry) -> String {
        match self.style {
            LogStyle::Json => serde_json::to_string(entry)
                .unwrap_or_else(|e| format!("{{\"message\":{:?},\"error\":{:?}}}", entry.message, e.to_string())),
            LogStyle::Compact => format!(
                "{} {} {}: {}",
                entry.timestamp.format("%H:%M:%S"),
                &entry.level.as_str()[..1],
                entry.logger,
                entry.message
            ),
            LogStyle::Console => self.render_console(entry),
        }
    }

    fn render_console(&self, entry: &LogEntry) -> String {
        let level = format!("{:>5}", entry.level.as_str());
        let level = if self.use_color {
            entry.level.paint(level).to_string()
        } else {
            level
        };

        let mut line = format!(
            "{} {} [{}] {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            level,
            entry.logger,
            entry.message
        );
        if !entry.fields.is_empty() {
            let fields: Vec<String> = entry.fields.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            line.push_str(&format!(" {{{}}}", fields.join(", ")));
        }
        if let (true, Some(location)) = (self.include_location, &entry.location) {
            line.push_str(&format!(" @ {}:{}", location.file, location.line));
        }
        line
    }
}

/// Accumulates fields for one entry; nothing is written until [`log`](Self::log)
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl LogEntryBuilder<'_> {
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), value);
        }
        self
    }

    pub fn location(mut self, file: &str, line: u32) -> Self {
        self.entry.location = Some(LogLocation {
            file: file.to_string(),
            line,
        });
        self
    }

    pub fn sample(self, sample: &LatencySample) -> Self {
        self.field("worker", sample.worker)
            .field("sequence", sample.sequence)
            .field("elapsed_ms", sample.elapsed_ms)
    }

    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_fatal", error.is_fatal_to_worker())
            .field("error", error.to_string())
    }

    pub fn log(self) {
        self.logger.emit(self.entry);
    }
}

/// Hands out loggers configured from one [`BenchConfig`] and stamped with
/// one random session id per run
pub struct LoggerFactory {
    config: BenchConfig,
    session_id: String,
}

impl LoggerFactory {
    pub fn new(config: BenchConfig) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn create_logger(&self, name: &str) -> Logger {
        let logger = Logger::with_config(name.to_string(), &self.config);
        logger.add_context_field("session_id".to_string(), &self.session_id);
        logger
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// `format!`-style logging that records the call site
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $logger.debug(&format!($($arg)*)).location(file!(), line!()).log()
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {
        $logger.info(&format!($($arg)*)).location(file!(), line!()).log()
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $logger.warn(&format!($($arg)*)).location(file!(), line!()).log()
    };
}
