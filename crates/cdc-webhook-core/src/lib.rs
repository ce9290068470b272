//! CDC Webhook Core Library
//!
//! Core types, validation and configuration for the CDC webhook trigger engine.

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use config::CdcConfig;
pub use error::{Error, Result, ValidationError};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Schema used when a registration does not name one
pub const DEFAULT_SCHEMA: &str = "public";

/// Maximum identifier length (bytes), matching the host's NAMEDATALEN - 1
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Default per-attempt delivery timeout (5s)
pub const DEFAULT_TIMEOUT_MS: i64 = 5_000;

/// Default number of retries after the first attempt
pub const DEFAULT_RETRY_NUMBER: i64 = 3;

/// Default base wait between attempts (1s)
pub const DEFAULT_RETRY_INTERVAL_MS: i64 = 1_000;

/// Function name rendered into inspectable trigger definitions
pub const DISPATCH_FUNCTION: &str = "cdc_webhook.dispatch";
