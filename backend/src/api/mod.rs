//! HTTP API module.
//!
//! This module provides the HTTP server, its route groups and the log stream.

pub mod csv;
pub mod generate;
pub mod logs;
pub mod offers;
pub mod server;
pub mod types;

pub use logs::*;
pub use server::{router, start_server, AppState};
pub use types::*;
