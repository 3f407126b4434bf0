//! Application configuration loaded from environment variables.
//!
//! Fail-fast loading with validation: required variables must be present
//! and valid or the application exits with a clear error message.

use std::env;

use thiserror::Error;

/// Application environment mode.
///
/// Controls security enforcement: in `Production`, plain-HTTP target URLs
/// refuse startup instead of logging a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Production,
}

impl AppEnvironment {
    /// Parse from the `APP_ENV` environment variable value.
    /// Defaults to `Development` if unset or unrecognized.
    pub fn from_env_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => {
                tracing::warn!(
                    value = other,
                    "Unrecognized APP_ENV value, defaulting to Development"
                );
                Self::Development
            }
        }
    }

    #[must_use]
    pub fn is_production(&self) -> bool {
        *self == Self::Production
    }
}

impl std::fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Configuration errors that can occur during environment loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("Failed to parse port: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),
}

/// Retry and outbound-call tuning for the delivery pipeline.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryConfig {
    /// Total delivery attempts per task (default: 5).
    pub max_attempts: i32,

    /// Exponential backoff base in seconds (default: 60 — delays of
    /// 60s, 120s, 240s, 480s between attempts).
    pub backoff_base_secs: i64,

    /// Outbound HTTP call timeout in seconds (default: 7).
    pub timeout_secs: u64,
}

impl DeliveryConfig {
    /// Load delivery tuning from environment variables.
    ///
    /// - `DELIVERY_MAX_ATTEMPTS` — default: 5 (minimum: 1)
    /// - `DELIVERY_BACKOFF_BASE_SECS` — default: 60 (minimum: 1)
    /// - `DELIVERY_TIMEOUT_SECS` — default: 7 (minimum: 1)
    pub fn from_env() -> Self {
        let max_attempts = env::var("DELIVERY_MAX_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse::<i32>().ok())
            .unwrap_or(5)
            .max(1);

        let backoff_base_secs = env::var("DELIVERY_BACKOFF_BASE_SECS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(60)
            .max(1);

        let timeout_secs = env::var("DELIVERY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(7)
            .max(1);

        Self {
            max_attempts,
            backoff_base_secs,
            timeout_secs,
        }
    }
}

/// Delivery worker tuning.
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    /// Number of concurrent worker loops (default: 4).
    pub concurrency: usize,

    /// Queue poll interval in seconds when idle (default: 5).
    pub poll_interval_secs: u64,

    /// Task lease window in seconds (default: 60). Must exceed the
    /// delivery timeout so a healthy in-flight call cannot lose its lease.
    pub lease_secs: u64,
}

impl WorkerConfig {
    /// Load worker tuning from environment variables.
    ///
    /// - `WORKER_CONCURRENCY` — default: 4 (minimum: 1)
    /// - `WORKER_POLL_INTERVAL_SECS` — default: 5 (minimum: 1)
    /// - `WORKER_LEASE_SECS` — default: 60, clamped above the delivery timeout
    pub fn from_env(delivery: &DeliveryConfig) -> Self {
        let concurrency = env::var("WORKER_CONCURRENCY")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(4)
            .max(1);

        let poll_interval_secs = env::var("WORKER_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(5)
            .max(1);

        let lease_secs = env::var("WORKER_LEASE_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60)
            .max(delivery.timeout_secs + 5);

        Self {
            concurrency,
            poll_interval_secs,
            lease_secs,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Application environment (development or production).
    pub app_env: AppEnvironment,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Tracing filter directive (e.g., "info,hookrelay=debug")
    pub rust_log: String,

    /// Server bind address
    pub host: String,

    /// Server listen port
    pub port: u16,

    /// Allow plain-HTTP target URLs (development only).
    pub allow_http_targets: bool,

    /// Delivery pipeline tuning.
    pub delivery: DeliveryConfig,

    /// Worker tuning.
    pub worker: WorkerConfig,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("app_env", &self.app_env)
            .field("database_url", &"[redacted]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("allow_http_targets", &self.allow_http_targets)
            .field("delivery", &self.delivery)
            .field("worker", &self.worker)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// are invalid.
    ///
    /// # Required Variables
    ///
    /// - `DATABASE_URL` - PostgreSQL connection string
    ///
    /// # Optional Variables
    ///
    /// - `RUST_LOG` - Log level filter (default: "info")
    /// - `HOST` - Bind address (default: "0.0.0.0")
    /// - `PORT` - Listen port (default: 8080)
    /// - `ALLOW_HTTP_TARGETS` - Accept http:// target URLs (default: false)
    /// - Delivery/worker tuning, see `DeliveryConfig` and `WorkerConfig`
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (development only)
        let _ = dotenvy::dotenv();

        let app_env = AppEnvironment::from_env_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()?;

        if port == 0 {
            return Err(ConfigError::InvalidValue {
                var: "PORT".to_string(),
                message: "Port must be between 1 and 65535".to_string(),
            });
        }

        let allow_http_targets = env::var("ALLOW_HTTP_TARGETS")
            .map(|s| matches!(s.to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);

        let delivery = DeliveryConfig::from_env();
        let worker = WorkerConfig::from_env(&delivery);

        Ok(Config {
            app_env,
            database_url,
            rust_log,
            host,
            port,
            allow_http_targets,
            delivery,
            worker,
        })
    }

    /// Get the server bind address as a socket address string.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate security configuration based on the application environment.
    ///
    /// In **production** mode: returns `Err(errors)` listing insecure
    /// settings. In **development** mode: returns `Ok(warnings)`.
    pub fn validate_security_config(&self) -> Result<Vec<String>, Vec<String>> {
        let mut issues = Vec::new();

        if self.allow_http_targets {
            issues.push(
                "ALLOW_HTTP_TARGETS is enabled — delivery targets may use plain HTTP".to_string(),
            );
        }

        if issues.is_empty() {
            return Ok(Vec::new());
        }

        if self.app_env.is_production() {
            Err(issues)
        } else {
            Ok(issues)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            app_env: AppEnvironment::Development,
            database_url: "postgres://localhost/test".to_string(),
            rust_log: "info".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            allow_http_targets: false,
            delivery: DeliveryConfig {
                max_attempts: 5,
                backoff_base_secs: 60,
                timeout_secs: 7,
            },
            worker: WorkerConfig {
                concurrency: 4,
                poll_interval_secs: 5,
                lease_secs: 60,
            },
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingVar("DATABASE_URL".to_string());
        assert_eq!(
            err.to_string(),
            "Missing required environment variable: DATABASE_URL"
        );

        let err = ConfigError::InvalidValue {
            var: "PORT".to_string(),
            message: "Must be a number".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid value for PORT: Must be a number");
    }

    #[test]
    fn test_bind_addr() {
        let config = test_config();
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
    }

    #[test]
    fn test_app_environment_parse() {
        assert_eq!(
            AppEnvironment::from_env_str("production"),
            AppEnvironment::Production
        );
        assert_eq!(
            AppEnvironment::from_env_str("prod"),
            AppEnvironment::Production
        );
        assert_eq!(
            AppEnvironment::from_env_str("dev"),
            AppEnvironment::Development
        );
        // Unrecognized values default to Development
        assert_eq!(
            AppEnvironment::from_env_str("staging"),
            AppEnvironment::Development
        );
    }

    #[test]
    fn test_production_rejects_http_targets() {
        let mut config = test_config();
        config.app_env = AppEnvironment::Production;
        config.allow_http_targets = true;

        let result = config.validate_security_config();
        assert!(result.is_err());
        let errors = result.unwrap_err();
        assert!(errors.iter().any(|e| e.contains("ALLOW_HTTP_TARGETS")));
    }

    #[test]
    fn test_development_allows_http_targets_with_warning() {
        let mut config = test_config();
        config.allow_http_targets = true;

        let result = config.validate_security_config();
        assert!(result.is_ok());
        assert!(!result.unwrap().is_empty());
    }

    #[test]
    fn test_secure_config_passes() {
        let mut config = test_config();
        config.app_env = AppEnvironment::Production;

        let result = config.validate_security_config();
        assert!(result.is_ok());
        assert!(result.unwrap().is_empty());
    }

    // All env-var-dependent scenarios are consolidated into a single test
    // to avoid race conditions when Rust runs tests in parallel.
    #[test]
    fn test_tuning_config_from_env() {
        // Scenario 1: defaults (no env vars set)
        std::env::remove_var("DELIVERY_MAX_ATTEMPTS");
        std::env::remove_var("DELIVERY_BACKOFF_BASE_SECS");
        std::env::remove_var("DELIVERY_TIMEOUT_SECS");
        std::env::remove_var("WORKER_LEASE_SECS");
        let delivery = DeliveryConfig::from_env();
        assert_eq!(delivery.max_attempts, 5);
        assert_eq!(delivery.backoff_base_secs, 60);
        assert_eq!(delivery.timeout_secs, 7);

        // Scenario 2: custom values
        std::env::set_var("DELIVERY_MAX_ATTEMPTS", "3");
        std::env::set_var("DELIVERY_BACKOFF_BASE_SECS", "30");
        let delivery = DeliveryConfig::from_env();
        assert_eq!(delivery.max_attempts, 3);
        assert_eq!(delivery.backoff_base_secs, 30);

        // Scenario 3: invalid values fall back to defaults
        std::env::set_var("DELIVERY_MAX_ATTEMPTS", "not_a_number");
        let delivery = DeliveryConfig::from_env();
        assert_eq!(delivery.max_attempts, 5);

        // Scenario 4: the lease is clamped above the delivery timeout
        std::env::set_var("DELIVERY_TIMEOUT_SECS", "30");
        std::env::set_var("WORKER_LEASE_SECS", "10");
        let delivery = DeliveryConfig::from_env();
        let worker = WorkerConfig::from_env(&delivery);
        assert_eq!(worker.lease_secs, 35);

        // Clean up
        std::env::remove_var("DELIVERY_MAX_ATTEMPTS");
        std::env::remove_var("DELIVERY_BACKOFF_BASE_SECS");
        std::env::remove_var("DELIVERY_TIMEOUT_SECS");
        std::env::remove_var("WORKER_LEASE_SECS");
    }
}
