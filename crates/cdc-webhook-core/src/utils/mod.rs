//! Utility functions

use uuid::Uuid;

/// Generate a unique ID for one trigger firing (log correlation only)
pub fn generate_firing_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Quote an SQL identifier, doubling embedded quotes
pub fn quote_ident(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Quote an SQL string literal, doubling embedded single quotes
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Format datetime for persisted records
pub fn format_datetime(dt: &chrono::DateTime<chrono::Utc>) -> String {
    dt.to_rfc3339()
}
