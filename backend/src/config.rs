//! Configuration loaded from environment variables.
//!
//! Two independent pieces:
//!
//! - [`Settings`] - server concerns (port, data directory, bulk pacing).
//!   Never fails; unparsable values fall back to defaults.
//! - [`TimocomConfig`] - credentials and endpoint for the freight exchange.
//!   Fails with [`ConfigError`] when credentials are missing, which makes
//!   client-backed routes answer 500 until the environment is fixed.
//!
//! `.env` is loaded once by the binary via `dotenvy`.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Production base URL of the freight exchange API.
pub const PRODUCTION_BASE_URL: &str = "https://api.timocom.com/freight-exchange/2";

/// Sandbox base URL of the freight exchange API.
pub const SANDBOX_BASE_URL: &str = "https://sandbox.timocom.com/freight-exchange/2";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

// =============================================================================
// Environment selection
// =============================================================================

/// Which freight exchange deployment to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Sandbox,
}

impl Environment {
    /// Parse `TIMOCOM_ENV`. Anything but `production`/`prod` is sandbox.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Sandbox,
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Production => PRODUCTION_BASE_URL,
            Environment::Sandbox => SANDBOX_BASE_URL,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Sandbox => "sandbox",
        }
    }
}

// =============================================================================
// Client configuration
// =============================================================================

/// Credentials and endpoint for the freight exchange client.
#[derive(Clone)]
pub struct TimocomConfig {
    pub username: String,
    pub password: String,
    /// Company identifier sent as `timocom_id` on every call.
    pub company_id: String,
    pub environment: Environment,
    pub base_url: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for TimocomConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimocomConfig")
            .field("username", &self.username)
            .field("password", &"***")
            .field("company_id", &self.company_id)
            .field("environment", &self.environment)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TimocomConfig {
    /// Build a config for an explicit base URL (tests, proxies).
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        company_id: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            company_id: company_id.into(),
            environment: Environment::Sandbox,
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Load from `TIMOCOM_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let username = required("TIMOCOM_USERNAME")?;
        let password = required("TIMOCOM_PASSWORD")?;
        let company_id = required("TIMOCOM_ID")?;

        let environment = env::var("TIMOCOM_ENV")
            .map(|v| Environment::parse(&v))
            .unwrap_or(Environment::Sandbox);

        let base_url = match env::var("TIMOCOM_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => url.trim().trim_end_matches('/').to_string(),
            _ => environment.base_url().to_string(),
        };

        let timeout = match env::var("TIMOCOM_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidVar {
                    var: "TIMOCOM_TIMEOUT_SECS",
                    message: format!("'{}' is not a number of seconds", raw),
                })?;
                Duration::from_secs(secs.max(1))
            }
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            username,
            password,
            company_id,
            environment,
            base_url,
            timeout,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(var)),
    }
}

// =============================================================================
// Server settings
// =============================================================================

/// Server-side settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    /// Root for canonical CSVs, backups and JSON exports.
    pub data_dir: PathBuf,
    /// Backups kept per CSV type.
    pub backup_retention: usize,
    /// Chunk size for bulk submissions.
    pub bulk_concurrency: usize,
    pub retry_delay: Duration,
    pub batch_delay: Duration,
    pub delete_delay: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: 3000,
            data_dir: PathBuf::from("data"),
            backup_retention: 10,
            bulk_concurrency: 5,
            retry_delay: Duration::from_secs(1),
            batch_delay: Duration::from_secs(1),
            delete_delay: Duration::from_millis(500),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: parsed("PORT").unwrap_or(defaults.port),
            data_dir: env::var("DATA_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            backup_retention: parsed("CSV_BACKUP_RETENTION").unwrap_or(defaults.backup_retention),
            bulk_concurrency: parsed::<usize>("BULK_CONCURRENCY")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.bulk_concurrency),
            ..defaults
        }
    }
}

fn parsed<T: std::str::FromStr>(var: &str) -> Option<T> {
    env::var(var).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse(" PROD "), Environment::Production);
        assert_eq!(Environment::parse("sandbox"), Environment::Sandbox);
        assert_eq!(Environment::parse("staging"), Environment::Sandbox);
        assert_eq!(Environment::Production.base_url(), PRODUCTION_BASE_URL);
    }

    #[test]
    fn test_default_settings() {
        let s = Settings::default();
        assert_eq!(s.port, 3000);
        assert_eq!(s.bulk_concurrency, 5);
        assert_eq!(s.retry_delay, Duration::from_secs(1));
        assert_eq!(s.delete_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_debug_hides_password() {
        let cfg = TimocomConfig::new("user", "s3cret", "42", "http://localhost");
        let dbg = format!("{:?}", cfg);
        assert!(!dbg.contains("s3cret"));
        assert!(dbg.contains("user"));
    }
}
