use serde::Deserialize;
use std::time::Duration;

use crate::error::{Error, Result};

/// Connection settings for the connector manager, plus the tunables of the
/// retry policy, the task loop and the log bridge.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the connector manager (e.g. "https://console.example.com")
    pub url: String,
    #[serde(rename = "api-key", alias = "api_key")]
    pub api_key: String,
    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure: bool,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub tasks: TaskLoopConfig,
    #[serde(default)]
    pub log: LogBridgeConfig,
}

/// Exponential backoff applied to network failures and 502 responses.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_initial_interval_ms")]
    pub initial_interval_ms: u64,
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Each delay is drawn from `[d * (1 - r), d * (1 + r)]`
    #[serde(default = "default_randomization_factor")]
    pub randomization_factor: f64,
    /// Wall-clock budget for one call, retries included
    #[serde(default = "default_max_elapsed_ms")]
    pub max_elapsed_ms: u64,
}

fn default_initial_interval_ms() -> u64 {
    500
}

fn default_max_interval_ms() -> u64 {
    60_000
}

fn default_multiplier() -> f64 {
    1.5
}

fn default_randomization_factor() -> f64 {
    0.5
}

fn default_max_elapsed_ms() -> u64 {
    3_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: default_initial_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            multiplier: default_multiplier(),
            randomization_factor: default_randomization_factor(),
            max_elapsed_ms: default_max_elapsed_ms(),
        }
    }
}

impl RetryConfig {
    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_interval_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }

    pub fn max_elapsed(&self) -> Duration {
        Duration::from_millis(self.max_elapsed_ms)
    }
}

/// Task loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TaskLoopConfig {
    /// Capacity of the queue between the fetch loop and the dispatcher
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Pause after a non-fatal task fetch failure
    #[serde(default = "default_fetch_error_delay_ms")]
    pub fetch_error_delay_ms: u64,
    /// Pause after a fetch that returned no task. The manager long-polls, so 0
    #[serde(default)]
    pub idle_poll_delay_ms: u64,
}

fn default_queue_capacity() -> usize {
    10
}

fn default_fetch_error_delay_ms() -> u64 {
    1_000
}

impl Default for TaskLoopConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            fetch_error_delay_ms: default_fetch_error_delay_ms(),
            idle_poll_delay_ms: 0,
        }
    }
}

impl TaskLoopConfig {
    pub fn fetch_error_delay(&self) -> Duration {
        Duration::from_millis(self.fetch_error_delay_ms)
    }

    pub fn idle_poll_delay(&self) -> Duration {
        Duration::from_millis(self.idle_poll_delay_ms)
    }
}

/// Log bridge configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LogBridgeConfig {
    /// Upper bound on the time spent pushing one log event
    #[serde(default = "default_notify_timeout_secs")]
    pub notify_timeout_secs: u64,
    /// Records waiting to be forwarded by the console layer; overflow is dropped
    #[serde(default = "default_console_queue_capacity")]
    pub console_queue_capacity: usize,
}

fn default_notify_timeout_secs() -> u64 {
    15
}

fn default_console_queue_capacity() -> usize {
    1024
}

impl Default for LogBridgeConfig {
    fn default() -> Self {
        Self {
            notify_timeout_secs: default_notify_timeout_secs(),
            console_queue_capacity: default_console_queue_capacity(),
        }
    }
}

impl LogBridgeConfig {
    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs)
    }
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            insecure: false,
            retry: RetryConfig::default(),
            tasks: TaskLoopConfig::default(),
            log: LogBridgeConfig::default(),
        }
    }

    /// Build from env vars. URL and API key are required, everything else
    /// falls back to defaults.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("CONNECTOR_MANAGER_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::Config("CONNECTOR_MANAGER_URL is required".to_string()))?;
        let api_key = std::env::var("CONNECTOR_MANAGER_API_KEY")
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::Config("CONNECTOR_MANAGER_API_KEY is required".to_string()))?;

        let mut cfg = Self::new(url, api_key);

        if let Ok(v) = std::env::var("CONNECTOR_MANAGER_INSECURE") {
            if let Ok(b) = v.parse::<bool>() {
                cfg.insecure = b;
            }
        }
        if let Ok(v) = std::env::var("CONNECTOR_MANAGER_RETRY_MAX_ELAPSED_MS") {
            if let Ok(n) = v.parse::<u64>() {
                cfg.retry.max_elapsed_ms = n;
            }
        }

        Ok(cfg)
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<ClientConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {}", path, e)))?;
    toml::from_str(&contents).map_err(|e| Error::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::new("http://localhost:8080", "key");
        assert!(!config.insecure);
        assert_eq!(config.retry.initial_interval_ms, 500);
        assert_eq!(config.retry.max_elapsed(), Duration::from_secs(3));
        assert_eq!(config.tasks.queue_capacity, 10);
        assert_eq!(config.log.notify_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            url = "https://console.example.com"
            api-key = "secret"
            insecure = true

            [retry]
            initial_interval_ms = 10
            max_elapsed_ms = 200

            [tasks]
            queue_capacity = 4
        "#;

        let config: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.url, "https://console.example.com");
        assert_eq!(config.api_key, "secret");
        assert!(config.insecure);
        assert_eq!(config.retry.initial_interval_ms, 10);
        assert_eq!(config.retry.max_elapsed_ms, 200);
        assert_eq!(config.retry.multiplier, 1.5); // Default
        assert_eq!(config.tasks.queue_capacity, 4);
        assert_eq!(config.tasks.fetch_error_delay_ms, 1_000); // Default
        assert_eq!(config.log.notify_timeout_secs, 15); // Default
        assert_eq!(config.log.console_queue_capacity, 1024); // Default
    }

    #[test]
    fn test_missing_api_key_fails() {
        let toml = r#"url = "https://console.example.com""#;
        assert!(toml::from_str::<ClientConfig>(toml).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "url = \"http://localhost:1\"\napi_key = \"k\"").unwrap();

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.url, "http://localhost:1");
        assert_eq!(config.api_key, "k");
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config("/nonexistent/connector.toml").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
