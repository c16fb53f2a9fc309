//! # Freightload - test offers for a freight exchange
//!
//! Freightload turns small CSV files into realistic freight and vehicle
//! space offers and pushes them to the exchange's "my offers" API.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│  Generator  │────▶│ Bulk submit │────▶ exchange
//! │  (ISO/UTF8) │     │  (auto-enc) │     │ (rows+vary) │     │ (chunked)   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use freightload::{generate_offers, submit_offers, BulkOptions, OfferKind, TimocomClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let report = generate_offers(OfferKind::Freight, "data/freight.csv", 50).unwrap();
//!     let client = TimocomClient::from_env().unwrap();
//!     let payloads: Vec<_> = report.offers.iter().map(|o| serde_json::to_value(o).unwrap()).collect();
//!     let result = submit_offers(&client, OfferKind::Freight, &payloads, BulkOptions::default()).await;
//!     println!("{} created, {} failed", result.created, result.failed);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Credentials and server settings from the environment
//! - [`models`] - Offer records
//! - [`parser`] - CSV parsing with auto-detection
//! - [`generator`] - CSV rows to offers, with deterministic variations
//! - [`client`] - Exchange API client
//! - [`bulk`] - Paced bulk submission and delete-all
//! - [`storage`] - Canonical CSVs, backups and JSON exports
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing and generation
pub mod generator;
pub mod parser;

// Exchange access
pub mod bulk;
pub mod client;

// Files
pub mod storage;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ApiError, ConfigError, CsvError, GenerateError, StorageError};

// =============================================================================
// Re-exports - Configuration and models
// =============================================================================

pub use config::{Environment, Settings, TimocomConfig};
pub use models::{Offer, OfferKind};

// =============================================================================
// Re-exports - CSV parsing and generation
// =============================================================================

pub use generator::{generate_from_rows, generate_offers, validate_count, GenerationReport};
pub use parser::{parse_bytes_auto, parse_csv_file_auto, CsvRow, ParseResult};

// =============================================================================
// Re-exports - Client and bulk procedures
// =============================================================================

pub use bulk::{delete_all, submit_offers, BulkOptions, BulkResult, DeleteAllResult};
pub use client::{ApiResponse, OfferApi, TimocomClient};

// =============================================================================
// Re-exports - Storage and server
// =============================================================================

pub use api::{router, start_server, AppState, ServerError};
pub use storage::CsvStore;
