//! Utility functions for the CLI

use anyhow::{bail, Context, Result};
use cdc_webhook_core::types::{Row, TriggerId};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Format a datetime for display
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Parse `[schema.]table.name`
pub fn parse_trigger_ref(value: &str, default_schema: &str) -> Result<TriggerId> {
    let parts: Vec<&str> = value.split('.').collect();
    match parts.as_slice() {
        [table, name] if !table.is_empty() && !name.is_empty() => {
            Ok(TriggerId::new(default_schema, *table, *name))
        }
        [schema, table, name] if !schema.is_empty() && !table.is_empty() && !name.is_empty() => {
            Ok(TriggerId::new(*schema, *table, *name))
        }
        _ => bail!("Invalid trigger reference '{}', expected [schema.]table.name", value),
    }
}

/// Parse `[schema.]table` into `(schema, table)`
pub fn parse_table_ref(value: &str, default_schema: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = value.split('.').collect();
    match parts.as_slice() {
        [table] if !table.is_empty() => Ok((default_schema.to_string(), table.to_string())),
        [schema, table] if !schema.is_empty() && !table.is_empty() => {
            Ok((schema.to_string(), table.to_string()))
        }
        _ => bail!("Invalid table reference '{}', expected [schema.]table", value),
    }
}

/// Parse repeated `Name: value` header arguments
pub fn parse_headers(values: &[String]) -> Result<BTreeMap<String, String>> {
    let mut headers = BTreeMap::new();
    for value in values {
        let (name, val) = value
            .split_once(':')
            .with_context(|| format!("Invalid header '{}', expected \"Name: value\"", mask(value)))?;
        headers.insert(name.trim().to_string(), val.trim().to_string());
    }
    Ok(headers)
}

/// Parse a JSON object into a row image
pub fn parse_row(value: &str) -> Result<Row> {
    match serde_json::from_str(value).context("Row must be valid JSON")? {
        serde_json::Value::Object(row) => Ok(row),
        _ => bail!("Row must be a JSON object"),
    }
}

fn mask(value: &str) -> String {
    match value.split_once(':') {
        Some((name, _)) => format!("{}: ****", name),
        None => "****".to_string(),
    }
}
