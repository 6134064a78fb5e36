//! Error handling for the inference latency tester

use thiserror::Error;

/// Custom error types for the inference latency tester
#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid run configuration (thread count, paths, intervals)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model directory unreadable or malformed, pipeline creation failed
    #[error("Model load error: {0}")]
    Load(String),

    /// Input image missing or in an unsupported format
    #[error("Image decode error: {0}")]
    Decode(String),

    /// Inference call rejected by the backend
    #[error("Inference error: {0}")]
    Inference(String),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(String),

    /// Parsing errors (numbers, JSON, etc.)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new model load error
    pub fn load<S: Into<String>>(message: S) -> Self {
        Self::Load(message.into())
    }

    /// Create a new image decode error
    pub fn decode<S: Into<String>>(message: S) -> Self {
        Self::Decode(message.into())
    }

    /// Create a new inference error
    pub fn inference<S: Into<String>>(message: S) -> Self {
        Self::Inference(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Load(_) => "LOAD",
            Self::Decode(_) => "DECODE",
            Self::Inference(_) => "INFER",
            Self::Io(_) => "IO",
            Self::Parse(_) => "PARSE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether a worker hitting this error must exit.
    ///
    /// Decode and inference failures only cost one sample; everything else
    /// means the worker has no usable pipeline.
    pub fn is_fatal_to_worker(&self) -> bool {
        !matches!(self, Self::Decode(_) | Self::Inference(_))
    }

    /// Get user-friendly error message with suggestions
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Config(msg) => {
                format!("Configuration problem: {}\n\nSuggestion: Check your .env file or command line arguments (see --print-env-example).", msg)
            }
            Self::Load(msg) => {
                format!("Model could not be loaded: {}\n\nSuggestion: Make sure the model directory contains model.vimosln and the device id exists.", msg)
            }
            Self::Decode(msg) => {
                format!("Input image could not be decoded: {}\n\nSuggestion: Use a bmp, jpeg, png or tiff file that is readable.", msg)
            }
            Self::Inference(msg) => {
                format!("Inference failed: {}\n\nSuggestion: Check the backend logs; failed calls are skipped and the run continues.", msg)
            }
            Self::Io(msg) => {
                format!("File operation failed: {}\n\nSuggestion: Check file permissions and disk space.", msg)
            }
            Self::Parse(msg) => {
                format!("Failed to parse data: {}\n\nSuggestion: Check the format of your input data or configuration files.", msg)
            }
            Self::Internal(msg) => {
                format!("Internal error: {}\n\nThis is likely a bug. Please report this issue with the error details.", msg)
            }
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Parse(_) => 1,
            Self::Load(_) => 2,
            Self::Decode(_) => 3,
            Self::Inference(_) => 4,
            Self::Io(_) => 5,
            Self::Internal(_) => 99,
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::Parse(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::Load(_) => {
                    format!("[{}] {}", category.magenta().bold(), message.magenta())
                }
                Self::Decode(_) | Self::Inference(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::Io(_) => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
                Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {}", error))
    }
}

impl From<image::ImageError> for AppError {
    fn from(error: image::ImageError) -> Self {
        Self::decode(error.to_string())
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("Integer parse error: {}", error))
    }
}

impl From<std::str::ParseBoolError> for AppError {
    fn from(error: std::str::ParseBoolError) -> Self {
        Self::parse(format!("Boolean parse error: {}", error))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(error.to_string())
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Error context trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error, keeping its category
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Add static context to an error
    fn context(self, message: &'static str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<AppError>,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let context = f();
            match e.into() {
                AppError::Config(msg) => AppError::Config(format!("{}: {}", context, msg)),
                AppError::Load(msg) => AppError::Load(format!("{}: {}", context, msg)),
                AppError::Decode(msg) => AppError::Decode(format!("{}: {}", context, msg)),
                AppError::Inference(msg) => AppError::Inference(format!("{}: {}", context, msg)),
                AppError::Io(msg) => AppError::Io(format!("{}: {}", context, msg)),
                AppError::Parse(msg) => AppError::Parse(format!("{}: {}", context, msg)),
                AppError::Internal(msg) => AppError::Internal(format!("{}: {}", context, msg)),
            }
        })
    }

    fn context(self, message: &'static str) -> Result<T> {
        self.with_context(|| message.to_string())
    }
}

/// Error reporter for user feedback on stderr
pub struct ErrorReporter {
    pub use_color: bool,
    pub verbose: bool,
}

impl ErrorReporter {
    /// Create a new error reporter
    pub fn new(use_color: bool, verbose: bool) -> Self {
        Self { use_color, verbose }
    }

    /// Report an error to the user
    pub fn report_error(&self, error: &AppError) {
        eprintln!("{}", self.render(error));
    }

    /// Render the text `report_error` prints
    pub fn render(&self, error: &AppError) -> String {
        let mut out = error.format_for_console(self.use_color);
        if self.verbose {
            out.push_str("\n\n");
            out.push_str(&error.user_friendly_message());
        }
        out
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_error = AppError::config("Thread count must be at least 1");
        assert_eq!(config_error.category(), "CONFIG");
        assert!(config_error.is_fatal_to_worker());
        assert_eq!(config_error.exit_code(), 1);

        let decode_error = AppError::decode("image.bmp not found");
        assert_eq!(decode_error.category(), "DECODE");
        assert!(!decode_error.is_fatal_to_worker());
        assert_eq!(decode_error.exit_code(), 3);
    }

    #[test]
    fn test_error_display() {
        let error = AppError::load("model.vimosln missing");
        let display = error.to_string();
        assert!(display.contains("Model load error"));
        assert!(display.contains("model.vimosln missing"));
    }

    #[test]
    fn test_error_categories() {
        let errors = [
            AppError::config("config"),
            AppError::load("load"),
            AppError::decode("decode"),
            AppError::inference("infer"),
            AppError::io("io"),
            AppError::parse("parse"),
            AppError::internal("internal"),
        ];
        let expected = ["CONFIG", "LOAD", "DECODE", "INFER", "IO", "PARSE", "INTERNAL"];

        for (error, expected) in errors.iter().zip(expected.iter()) {
            assert_eq!(error.category(), *expected);
        }
    }

    #[test]
    fn test_worker_fatality() {
        assert!(AppError::load("test").is_fatal_to_worker());
        assert!(!AppError::decode("test").is_fatal_to_worker());
        assert!(!AppError::inference("test").is_fatal_to_worker());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::config("test").exit_code(), 1);
        assert_eq!(AppError::load("test").exit_code(), 2);
        assert_eq!(AppError::inference("test").exit_code(), 4);
        assert_eq!(AppError::io("test").exit_code(), 5);
        assert_eq!(AppError::internal("test").exit_code(), 99);
    }

    #[test]
    fn test_error_conversions() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let app_error: AppError = io_error.into();
        assert_eq!(app_error.category(), "IO");

        let parse_error = "not_a_number".parse::<usize>().unwrap_err();
        let app_error: AppError = parse_error.into();
        assert_eq!(app_error.category(), "PARSE");

        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let app_error: AppError = json_error.into();
        assert!(app_error.to_string().contains("JSON parse error"));
    }

    #[test]
    fn test_image_error_conversion() {
        let image_error = image::load_from_memory(b"definitely not an image").unwrap_err();
        let app_error: AppError = image_error.into();
        assert_eq!(app_error.category(), "DECODE");
    }

    #[test]
    fn test_context_keeps_category() {
        let result: Result<()> = Err(AppError::load("descriptor missing"));
        let error = result.context("Worker 3").unwrap_err();
        assert_eq!(error.category(), "LOAD");
        assert_eq!(error.to_string(), "Model load error: Worker 3: descriptor missing");
    }

    #[test]
    fn test_console_formatting() {
        let error = AppError::config("Test error");
        let plain = error.format_for_console(false);
        assert_eq!(plain, "[CONFIG] Configuration error: Test error");
        assert!(error.format_for_console(true).contains("CONFIG"));
    }

    #[test]
    fn test_reporter_verbose_adds_suggestion() {
        let reporter = ErrorReporter::new(false, true);
        let rendered = reporter.render(&AppError::config("threads must be at least 1"));
        assert!(rendered.contains("[CONFIG]"));
        assert!(rendered.contains("Suggestion:"));

        let quiet = ErrorReporter::new(false, false).render(&AppError::config("x"));
        assert!(!quiet.contains("Suggestion:"));
    }
}
