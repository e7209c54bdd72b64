//! Configuration management for Formgate.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::{FormgateError, Result};
use crate::ratelimit::SWEEP_INTERVAL;

/// Main configuration for the Formgate service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormgateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Path to a YAML file with additional or overriding limiter definitions
    pub limiters_path: Option<String>,

    /// Interval between store sweeps in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            limiters_path: None,
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl RateLimitingConfig {
    /// The sweep interval as a duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn default_sweep_interval() -> u64 {
    SWEEP_INTERVAL.as_secs()
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl FormgateConfig {
    /// Load configuration from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: FormgateConfig = serde_yaml::from_str(yaml)
            .map_err(|e| FormgateError::Config(e.to_string()))?;

        if config.rate_limiting.sweep_interval_secs == 0 {
            return Err(FormgateError::Config(
                "rate_limiting.sweep_interval_secs must be positive".to_string(),
            ));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FormgateConfig::default();
        assert_eq!(config.server.http_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.rate_limiting.sweep_interval(), Duration::from_secs(300));
        assert!(config.rate_limiting.limiters_path.is_none());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
server:
  http_addr: 0.0.0.0:9000
rate_limiting:
  limiters_path: /etc/formgate/limiters.yaml
logging:
  format: json
"#;
        let config = FormgateConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.server.http_addr, "0.0.0.0:9000".parse().unwrap());
        assert_eq!(
            config.rate_limiting.limiters_path.as_deref(),
            Some("/etc/formgate/limiters.yaml")
        );
        assert_eq!(config.rate_limiting.sweep_interval_secs, 300);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_zero_sweep_interval_rejected() {
        let yaml = "rate_limiting:\n  sweep_interval_secs: 0\n";
        assert!(matches!(
            FormgateConfig::from_yaml(yaml),
            Err(FormgateError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_yaml() {
        let yaml = "server:\n  http_addr: not-an-address\n";
        assert!(matches!(
            FormgateConfig::from_yaml(yaml),
            Err(FormgateError::Config(_))
        ));
    }
}
