//! Error types for freightload.
//!
//! One error type per layer:
//!
//! - [`CsvError`] - CSV reading and parsing errors
//! - [`ConfigError`] - Missing or invalid environment configuration
//! - [`ApiError`] - Freight exchange client errors
//! - [`StorageError`] - CSV store (upload, backup, restore) errors
//! - [`GenerateError`] - Offer generation errors
//!
//! Conversion is automatic via `From` implementations, so `?` works across
//! layers. The HTTP-facing error lives in [`crate::api::types::ServerError`].

use serde_json::Value;
use thiserror::Error;

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors while reading or parsing a CSV file.
#[derive(Debug, Error)]
pub enum CsvError {
    /// CSV file does not exist.
    #[error("CSV file not found: {0}")]
    NotFound(String),

    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid CSV format.
    #[error("Invalid CSV format at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// Header row lacks mandatory columns.
    #[error("Missing mandatory columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// Every data row was discarded.
    #[error("CSV contains no usable rows ({0} rows discarded)")]
    NoUsableRows(usize),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading configuration from the environment.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Required variable is not set or blank.
    #[error("Missing environment variable {0}")]
    MissingVar(&'static str),

    /// Variable is set but cannot be used.
    #[error("Invalid value for {var}: {message}")]
    InvalidVar { var: &'static str, message: String },

    /// The HTTP client itself could not be built (TLS backend, proxy).
    #[error("Cannot build HTTP client: {0}")]
    HttpClient(String),
}

impl ConfigError {
    /// Remediation hint shown to HTTP callers.
    pub fn hint(&self) -> String {
        match self {
            ConfigError::MissingVar(var) => format!(
                "Set {} in the environment or in a .env file, then restart the server \
                 (credentials need TIMOCOM_USERNAME, TIMOCOM_PASSWORD and TIMOCOM_ID)",
                var
            ),
            ConfigError::InvalidVar { var, .. } => format!(
                "Fix or unset {} in the environment or in the .env file, then restart the server",
                var
            ),
            ConfigError::HttpClient(_) => {
                "Check the TLS and proxy settings of this host, then restart the server".to_string()
            }
        }
    }
}

// =============================================================================
// API Client Errors
// =============================================================================

/// Errors from the freight exchange client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request never produced a response (connect, timeout, TLS).
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// Upstream answered with a non-2xx status.
    #[error("Upstream returned {status}: {body}")]
    Upstream { status: u16, body: Value },
}

impl ApiError {
    /// Upstream status, when the error came from a response.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            ApiError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Transport(format!("request timed out: {}", e))
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors from the on-disk CSV store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO error.
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Uploaded or restored CSV is not usable.
    #[error("Invalid CSV: {0}")]
    Csv(#[from] CsvError),

    /// File name does not look like one of our backups.
    #[error("Invalid backup file name: {0}")]
    InvalidBackupName(String),

    /// Backup file does not exist.
    #[error("Backup not found: {0}")]
    BackupNotFound(String),

    /// JSON export failed.
    #[error("Export error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Generation Errors
// =============================================================================

/// Errors while generating offer records.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// CSV could not be read or had no usable rows.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Requested count is outside the accepted range.
    #[error("Count must be between 1 and {max}, got {count}")]
    InvalidCount { count: i64, max: usize },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for client operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
