//! Error types for the CDC webhook engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Registration input rejected before anything is persisted.
///
/// Messages name the offending field but never echo webhook URLs or
/// header values, since those may be credentials.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("operations must contain at least one of INSERT, UPDATE, DELETE")]
    EmptyOperations,

    #[error("invalid operation: {0} (expected INSERT, UPDATE or DELETE)")]
    InvalidOperation(String),

    #[error("invalid trigger_timing: {0} (expected BEFORE or AFTER)")]
    InvalidTiming(String),

    #[error("invalid retry_backoff: {0} (expected LINEAR or EXPONENTIAL)")]
    InvalidBackoff(String),

    #[error("invalid security: {0} (expected NONE or PRIVATE)")]
    InvalidSecurity(String),

    #[error("retry_number must be zero or greater, got {0}")]
    NegativeRetryNumber(i64),

    #[error("retry_number {0} exceeds the supported maximum")]
    RetryNumberTooLarge(i64),

    #[error("retry_interval must be positive, got {0}ms")]
    NonPositiveRetryInterval(i64),

    #[error("timeout must be positive, got {0}ms")]
    NonPositiveTimeout(i64),

    #[error("invalid webhook_url: {0}")]
    InvalidWebhookUrl(String),

    #[error("invalid header name: {0}")]
    InvalidHeaderName(String),

    #[error("invalid value for header {0}")]
    InvalidHeaderValue(String),

    #[error("header {0} is set by the engine and cannot be configured")]
    ReservedHeader(String),

    #[error("header {0} is configured more than once")]
    DuplicateHeader(String),

    #[error("invalid {field}: {reason}")]
    InvalidIdentifier { field: &'static str, reason: String },

    #[error("invalid update_columns: {0}")]
    InvalidUpdateColumns(String),
}

impl ValidationError {
    /// Registration field the error refers to
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Missing(field) => field,
            ValidationError::EmptyOperations | ValidationError::InvalidOperation(_) => "operations",
            ValidationError::InvalidTiming(_) => "trigger_timing",
            ValidationError::InvalidBackoff(_) => "retry_backoff",
            ValidationError::InvalidSecurity(_) => "security",
            ValidationError::NegativeRetryNumber(_) | ValidationError::RetryNumberTooLarge(_) => {
                "retry_number"
            }
            ValidationError::NonPositiveRetryInterval(_) => "retry_interval",
            ValidationError::NonPositiveTimeout(_) => "timeout",
            ValidationError::InvalidWebhookUrl(_) => "webhook_url",
            ValidationError::InvalidHeaderName(_)
            | ValidationError::InvalidHeaderValue(_)
            | ValidationError::ReservedHeader(_)
            | ValidationError::DuplicateHeader(_) => "headers",
            ValidationError::InvalidIdentifier { field, .. } => field,
            ValidationError::InvalidUpdateColumns(_) => "update_columns",
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid trigger definition: {0}")]
    Validation(#[from] ValidationError),

    #[error("Trigger not found: {0}")]
    NoSuchTrigger(String),

    #[error("Trigger {0} does not use PRIVATE security")]
    NotPrivate(String),

    #[error("Credential record missing for PRIVATE trigger {0}")]
    MissingCredential(String),

    /// Delivery exhausted its retries and the trigger cancels on failure.
    /// The host must abort the transaction that caused the firing.
    #[error("Webhook delivery failed for trigger {trigger} after {attempts} attempt(s): {cause}")]
    TransactionAborted {
        trigger: String,
        attempts: u32,
        cause: String,
    },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// SQLSTATE-style code reported to the host
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "22023",
            Error::NoSuchTrigger(_) => "42704",
            Error::NotPrivate(_) => "55000",
            Error::TransactionAborted { .. } => "08006",
            Error::ConfigError(_) => "F0000",
            Error::MissingCredential(_)
            | Error::DatabaseError(_)
            | Error::InternalError(_)
            | Error::Serialization(_) => "XX000",
        }
    }

    /// Whether the host must roll back the current transaction
    pub fn aborts_transaction(&self) -> bool {
        matches!(self, Error::TransactionAborted { .. })
    }
}
