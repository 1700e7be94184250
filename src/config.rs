//! Production configuration system
//!
//! Provides centralized configuration management with:
//! - Environment variable support
//! - Config file loading (optional)
//! - Runtime defaults
//! - Validation and type safety

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Fetch and retry configuration
    pub fetch: FetchConfig,

    /// Record validation configuration
    pub records: RecordsConfig,

    /// Output configuration
    pub output: OutputConfig,

    /// Paths configuration
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Azure Resource Manager endpoint.
    pub endpoint: String,
    /// Consumption API version appended to every request.
    pub api_version: String,
    /// Retry bound for rate-limit responses.
    pub rate_limit_retries: u32,
    /// Retry bound for transient network failures.
    pub transient_retries: u32,
    /// First backoff delay in milliseconds; doubles per attempt.
    pub backoff_base_ms: u64,
    /// Backoff ceiling in milliseconds.
    pub backoff_max_ms: u64,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordsConfig {
    /// Per-record tolerance for the price*quantity vs billing-cost check.
    pub epsilon: f64,
    /// Skip invalid records (counting them) instead of aborting.
    pub skip_invalid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub json_pretty: bool,
    pub currency_decimals: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub log_directory: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "ERROR".to_string(),
                format: "pretty".to_string(),
                output: "console".to_string(),
            },
            fetch: FetchConfig {
                endpoint: "https://management.azure.com".to_string(),
                api_version: "2019-11-01".to_string(),
                rate_limit_retries: 5,
                transient_retries: 3,
                backoff_base_ms: 1000,
                backoff_max_ms: 30_000,
                request_timeout_secs: 60,
            },
            records: RecordsConfig {
                epsilon: 1e-4,
                skip_invalid: false,
            },
            output: OutputConfig {
                json_pretty: true,
                currency_decimals: 2,
            },
            paths: PathsConfig {
                log_directory: PathBuf::from("logs"),
            },
        }
    }
}

impl Config {
    /// Load configuration from environment, file, and defaults
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        // Try to load from config file if it exists
        let config_paths = [
            PathBuf::from("azure-usage.toml"),
            PathBuf::from(".azure-usage.toml"),
            dirs::config_dir()
                .map(|d| d.join("azure-usage").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.exists() {
                info!(config_file = %path.display(), "Loading configuration from file");
                config = Self::load_from_file(path)?;
                break;
            }
        }

        // Override with environment variables
        config.apply_env_overrides()?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        // Logging overrides
        if let Ok(val) = env::var("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Ok(val) = env::var("LOG_OUTPUT") {
            self.logging.output = val;
        }

        // Fetch overrides
        if let Ok(val) = env::var("AZURE_USAGE_ENDPOINT") {
            self.fetch.endpoint = val;
        }
        if let Ok(val) = env::var("AZURE_USAGE_API_VERSION") {
            self.fetch.api_version = val;
        }
        if let Ok(val) = env::var("AZURE_USAGE_RATE_LIMIT_RETRIES") {
            self.fetch.rate_limit_retries =
                val.parse().context("Invalid AZURE_USAGE_RATE_LIMIT_RETRIES")?;
        }
        if let Ok(val) = env::var("AZURE_USAGE_TRANSIENT_RETRIES") {
            self.fetch.transient_retries =
                val.parse().context("Invalid AZURE_USAGE_TRANSIENT_RETRIES")?;
        }
        if let Ok(val) = env::var("AZURE_USAGE_BACKOFF_BASE_MS") {
            self.fetch.backoff_base_ms =
                val.parse().context("Invalid AZURE_USAGE_BACKOFF_BASE_MS")?;
        }

        // Record overrides
        if let Ok(val) = env::var("AZURE_USAGE_EPSILON") {
            self.records.epsilon = val.parse().context("Invalid AZURE_USAGE_EPSILON")?;
        }
        if let Ok(val) = env::var("AZURE_USAGE_SKIP_INVALID") {
            self.records.skip_invalid =
                val.parse().context("Invalid AZURE_USAGE_SKIP_INVALID")?;
        }

        // Path overrides
        if let Ok(val) = env::var("AZURE_USAGE_LOG_DIR") {
            self.paths.log_directory = PathBuf::from(val);
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.fetch.endpoint.is_empty() {
            return Err(anyhow::anyhow!("Fetch endpoint must not be empty"));
        }

        if self.fetch.backoff_base_ms == 0 {
            return Err(anyhow::anyhow!("Backoff base must be greater than 0ms"));
        }

        if self.fetch.backoff_max_ms < self.fetch.backoff_base_ms {
            return Err(anyhow::anyhow!(
                "Backoff ceiling {}ms is below the base {}ms",
                self.fetch.backoff_max_ms,
                self.fetch.backoff_base_ms
            ));
        }

        if self.fetch.rate_limit_retries == 0 {
            warn!("Rate-limit retries set to 0; any throttled page fails the fetch");
        }

        if self.records.epsilon <= 0.0 {
            return Err(anyhow::anyhow!(
                "Consistency tolerance must be positive, got {}",
                self.records.epsilon
            ));
        }

        // Validate paths exist (create if needed)
        if self.logging.output != "console" && !self.paths.log_directory.exists() {
            fs::create_dir_all(&self.paths.log_directory)
                .context("Failed to create log directory")?;
        }

        Ok(())
    }

    /// Save current configuration to file
    #[allow(dead_code)]
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        info!(path = %path.display(), "Configuration saved to file");

        Ok(())
    }
}

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration instance
pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(|| Config::load().expect("Failed to load configuration"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "ERROR");
        assert_eq!(config.fetch.api_version, "2019-11-01");
        assert_eq!(config.fetch.rate_limit_retries, 5);
        assert_eq!(config.records.epsilon, 1e-4);
    }

    #[test]
    fn test_env_override() {
        env::set_var("AZURE_USAGE_RATE_LIMIT_RETRIES", "7");
        let mut config = Config::default();
        config.apply_env_overrides().unwrap();
        assert_eq!(config.fetch.rate_limit_retries, 7);
        env::remove_var("AZURE_USAGE_RATE_LIMIT_RETRIES");
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.fetch.backoff_base_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.records.epsilon = -1.0;
        assert!(config.validate().is_err());
    }
}
