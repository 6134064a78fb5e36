//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use crate::sdk::VariantOrdering;
use std::path::Path;

/// Every variable read by [`crate::models::BenchConfig::merge_from_env`]
pub const ENV_KEYS: &[&str] = &[
    "ILT_MODEL_DIR",
    "ILT_IMAGE_PATH",
    "ILT_THREADS",
    "ILT_INTERVAL_MS",
    "ILT_HISTORY",
    "ILT_USE_GPU",
    "ILT_DEVICE_ID",
    "ILT_MODULE_ID",
    "ILT_VARIANT_ORDER",
    "ILT_ENABLE_COLOR",
];

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load `.env` from the working directory if there is one
    pub fn load_env_file(debug: bool) -> Result<()> {
        Self::load_env_file_from(Path::new(".env"), debug)
    }

    /// Load a specific env file if it exists; already-set variables win
    pub fn load_env_file_from(path: &Path, debug: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path)
                .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;

            if debug {
                eprintln!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            eprintln!("No {} file found, using defaults and CLI arguments", path.display());
        }

        Ok(())
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# Inference Latency Tester Configuration
#
# Values here are used as defaults and can be overridden by
# command-line arguments.

# Directory containing model.vimosln
# ILT_MODEL_DIR=./model

# Image fed to every inference call
# ILT_IMAGE_PATH=./image.bmp

# Number of worker threads (1-128)
# ILT_THREADS=2

# Pacing interval per worker in milliseconds (1-60000)
# ILT_INTERVAL_MS=100

# Recent samples kept per worker for the history column (1-1024)
# ILT_HISTORY=30

# Run on GPU (true) or CPU (false), and which GPU
# ILT_USE_GPU=true
# ILT_DEVICE_ID=0

# Module variant to run; the latest one is used when unset
# ILT_MODULE_ID=

# How "latest" is decided among variant ids: numeric or lexical
# ILT_VARIANT_ORDER=numeric

# Enable colored output (true/false)
# ILT_ENABLE_COLOR=true

# Example: stress a CPU build with many threads
# ILT_USE_GPU=false
# ILT_THREADS=16
# ILT_INTERVAL_MS=50
"#
        .to_string()
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        let content = Self::create_example_env_content();
        std::fs::write(path, content)
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))?;

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "ILT_MODEL_DIR" | "ILT_IMAGE_PATH" => {
                if value.is_empty() {
                    return Err(AppError::config(format!("{} cannot be empty", key)));
                }
            }
            "ILT_THREADS" => {
                let threads: usize = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid ILT_THREADS value '{}': {}", value, e)))?;
                if threads == 0 || threads > crate::defaults::MAX_THREADS {
                    return Err(AppError::config(format!(
                        "ILT_THREADS must be between 1 and {}, got: {}",
                        crate::defaults::MAX_THREADS,
                        threads
                    )));
                }
            }
            "ILT_INTERVAL_MS" => {
                let interval: u64 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid ILT_INTERVAL_MS value '{}': {}", value, e)))?;
                if interval == 0 || interval > 60_000 {
                    return Err(AppError::config(format!(
                        "ILT_INTERVAL_MS must be between 1 and 60000, got: {}",
                        interval
                    )));
                }
            }
            "ILT_HISTORY" => {
                let history: usize = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid ILT_HISTORY value '{}': {}", value, e)))?;
                if history == 0 || history > 1024 {
                    return Err(AppError::config(format!(
                        "ILT_HISTORY must be between 1 and 1024, got: {}",
                        history
                    )));
                }
            }
            "ILT_DEVICE_ID" => {
                value
                    .parse::<u32>()
                    .map_err(|e| AppError::config(format!("Invalid ILT_DEVICE_ID value '{}': {}", value, e)))?;
            }
            "ILT_USE_GPU" | "ILT_ENABLE_COLOR" => {
                value
                    .to_lowercase()
                    .parse::<bool>()
                    .map_err(|_| AppError::config(format!("{} must be 'true' or 'false', got: {}", key, value)))?;
            }
            "ILT_VARIANT_ORDER" => {
                value.parse::<VariantOrdering>()?;
            }
            "ILT_MODULE_ID" => {}
            _ => {
                return Err(AppError::config(format!("Unknown environment variable: {}", key)));
            }
        }

        Ok(())
    }

    /// Validate every `ILT_*` variable currently set
    pub fn validate_environment() -> Result<()> {
        for key in ENV_KEYS {
            if let Ok(value) = std::env::var(key) {
                Self::validate_env_var(key, &value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_env_var_validation() {
        assert!(EnvManager::validate_env_var("ILT_MODEL_DIR", "/models/a").is_ok());
        assert!(EnvManager::validate_env_var("ILT_THREADS", "4").is_ok());
        assert!(EnvManager::validate_env_var("ILT_INTERVAL_MS", "100").is_ok());
        assert!(EnvManager::validate_env_var("ILT_HISTORY", "30").is_ok());
        assert!(EnvManager::validate_env_var("ILT_USE_GPU", "FALSE").is_ok());
        assert!(EnvManager::validate_env_var("ILT_VARIANT_ORDER", "lexical").is_ok());
        assert!(EnvManager::validate_env_var("ILT_MODULE_ID", "10").is_ok());

        assert!(EnvManager::validate_env_var("ILT_MODEL_DIR", "  ").is_err());
        assert!(EnvManager::validate_env_var("ILT_THREADS", "0").is_err());
        assert!(EnvManager::validate_env_var("ILT_THREADS", "129").is_err());
        assert!(EnvManager::validate_env_var("ILT_INTERVAL_MS", "0").is_err());
        assert!(EnvManager::validate_env_var("ILT_HISTORY", "2000").is_err());
        assert!(EnvManager::validate_env_var("ILT_DEVICE_ID", "-1").is_err());
        assert!(EnvManager::validate_env_var("ILT_ENABLE_COLOR", "maybe").is_err());
        assert!(EnvManager::validate_env_var("ILT_VARIANT_ORDER", "random").is_err());
        assert!(EnvManager::validate_env_var("ILT_UNKNOWN", "1").is_err());
    }

    #[test]
    fn test_example_env_content_lists_every_key() {
        let content = EnvManager::create_example_env_content();
        for key in ENV_KEYS {
            assert!(content.contains(&format!("{}=", key)), "missing {}", key);
        }
    }

    #[test]
    fn test_save_example_env_file() {
        let temp_file = NamedTempFile::new().unwrap();
        EnvManager::save_example_env_file(temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("Inference Latency Tester Configuration"));
    }

    #[test]
    fn test_missing_env_file_is_fine() {
        let dir = TempDir::new().unwrap();
        assert!(EnvManager::load_env_file_from(&dir.path().join(".env"), false).is_ok());
    }
}
