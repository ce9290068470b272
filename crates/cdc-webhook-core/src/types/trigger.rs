//! Trigger definition types
//!
//! A trigger definition binds a table and a set of row operations to a
//! webhook target and a delivery policy. Definitions are immutable once
//! registered; redefining a trigger replaces the whole record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::credential::WebhookEndpoint;
use crate::error::ValidationError;
use crate::utils::{quote_ident, quote_literal};

// ============================================================================
// Identity
// ============================================================================

/// Unique trigger identity: `(schema, table, name)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TriggerId {
    pub schema: String,
    pub table: String,
    pub name: String,
}

impl TriggerId {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            name: name.into(),
        }
    }

    /// Whether this trigger is attached to the given table
    pub fn is_on(&self, schema: &str, table: &str) -> bool {
        self.schema == schema && self.table == table
    }
}

impl fmt::Display for TriggerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.schema, self.table, self.name)
    }
}

// ============================================================================
// Enumerations
// ============================================================================

/// Row-level operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 3] = [Operation::Insert, Operation::Update, Operation::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "INSERT",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INSERT" => Ok(Operation::Insert),
            "UPDATE" => Ok(Operation::Update),
            "DELETE" => Ok(Operation::Delete),
            _ => Err(ValidationError::InvalidOperation(s.to_string())),
        }
    }
}

/// When the trigger fires relative to the row write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Timing {
    Before,
    #[default]
    After,
}

impl Timing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timing::Before => "BEFORE",
            Timing::After => "AFTER",
        }
    }
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timing {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BEFORE" => Ok(Timing::Before),
            "AFTER" => Ok(Timing::After),
            _ => Err(ValidationError::InvalidTiming(s.to_string())),
        }
    }
}

/// Wait growth between delivery retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RetryBackoff {
    #[default]
    Linear,
    Exponential,
}

impl RetryBackoff {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetryBackoff::Linear => "LINEAR",
            RetryBackoff::Exponential => "EXPONENTIAL",
        }
    }

    /// Wait before the `retry`-th retry (1-based).
    ///
    /// LINEAR waits `interval` every time; EXPONENTIAL waits
    /// `interval * 2^(retry - 1)`, saturating instead of overflowing.
    pub fn delay(&self, interval: Duration, retry: u32) -> Duration {
        match self {
            RetryBackoff::Linear => interval,
            RetryBackoff::Exponential => {
                let factor = 2u32
                    .checked_pow(retry.saturating_sub(1))
                    .unwrap_or(u32::MAX);
                interval.saturating_mul(factor)
            }
        }
    }
}

impl fmt::Display for RetryBackoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetryBackoff {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LINEAR" => Ok(RetryBackoff::Linear),
            "EXPONENTIAL" => Ok(RetryBackoff::Exponential),
            _ => Err(ValidationError::InvalidBackoff(s.to_string())),
        }
    }
}

/// Where the webhook URL and headers live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SecurityMode {
    /// Inline in the inspectable definition
    #[default]
    None,
    /// In the credential store only
    Private,
}

impl SecurityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityMode::None => "NONE",
            SecurityMode::Private => "PRIVATE",
        }
    }
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecurityMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Ok(SecurityMode::None),
            "PRIVATE" => Ok(SecurityMode::Private),
            _ => Err(ValidationError::InvalidSecurity(s.to_string())),
        }
    }
}

// ============================================================================
// Definition
// ============================================================================

/// Webhook target as recorded in the definition.
///
/// `Private` carries nothing: the URL and headers are in the credential
/// store, keyed by the trigger identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "security")]
pub enum WebhookTarget {
    #[serde(rename = "NONE")]
    Inline(WebhookEndpoint),
    #[serde(rename = "PRIVATE")]
    Private,
}

impl WebhookTarget {
    pub fn security(&self) -> SecurityMode {
        match self {
            WebhookTarget::Inline(_) => SecurityMode::None,
            WebhookTarget::Private => SecurityMode::Private,
        }
    }
}

/// Delivery policy derived from a definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub retry_number: u32,
    pub retry_interval: Duration,
    pub backoff: RetryBackoff,
}

impl RetryPolicy {
    /// Upper bound on delivery attempts: the first one plus every retry
    pub fn max_attempts(&self) -> u32 {
        self.retry_number.saturating_add(1)
    }

    /// Wait before the `retry`-th retry (1-based)
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        self.backoff.delay(self.retry_interval, retry)
    }
}

/// A validated, persisted trigger definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerDefinition {
    pub id: TriggerId,
    pub operations: BTreeSet<Operation>,
    pub timing: Timing,
    pub target: WebhookTarget,
    /// Empty means any UPDATE fires
    pub update_columns: Vec<String>,
    pub timeout_ms: u64,
    pub retry_number: u32,
    pub retry_interval_ms: u64,
    pub retry_backoff: RetryBackoff,
    pub cancel_on_failure: bool,
    pub created_at: DateTime<Utc>,
}

impl TriggerDefinition {
    pub fn security(&self) -> SecurityMode {
        self.target.security()
    }

    pub fn fires_on(&self, operation: Operation) -> bool {
        self.operations.contains(&operation)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_millis(self.timeout_ms),
            retry_number: self.retry_number,
            retry_interval: Duration::from_millis(self.retry_interval_ms),
            backoff: self.retry_backoff,
        }
    }

    /// Render the inspectable form of this trigger.
    ///
    /// Under PRIVATE security the rendered options omit the webhook URL and
    /// headers entirely.
    pub fn to_ddl(&self) -> String {
        let mut options = serde_json::Map::new();
        options.insert("cancel_on_failure".into(), self.cancel_on_failure.into());
        options.insert("retry_backoff".into(), self.retry_backoff.as_str().into());
        options.insert("retry_interval_ms".into(), self.retry_interval_ms.into());
        options.insert("retry_number".into(), self.retry_number.into());
        options.insert("security".into(), self.security().as_str().into());
        options.insert("timeout_ms".into(), self.timeout_ms.into());
        options.insert(
            "update_columns".into(),
            serde_json::Value::from(self.update_columns.clone()),
        );
        if let WebhookTarget::Inline(endpoint) = &self.target {
            options.insert("webhook_url".into(), endpoint.url.clone().into());
            options.insert(
                "headers".into(),
                serde_json::Value::Object(
                    endpoint
                        .headers
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone().into()))
                        .collect(),
                ),
            );
        }

        let events = self
            .operations
            .iter()
            .map(Operation::as_str)
            .collect::<Vec<_>>()
            .join(" OR ");

        format!(
            "CREATE TRIGGER {} {} {} ON {}.{} FOR EACH ROW EXECUTE FUNCTION {}({})",
            quote_ident(&self.id.name),
            self.timing,
            events,
            quote_ident(&self.id.schema),
            quote_ident(&self.id.table),
            crate::DISPATCH_FUNCTION,
            quote_literal(&serde_json::Value::Object(options).to_string()),
        )
    }
}

/// Fully materialized configuration for a single firing.
///
/// Built by the registry on every firing and dropped afterwards; the
/// endpoint of a PRIVATE trigger is fetched live from the credential store.
#[derive(Clone)]
pub struct EffectiveConfig {
    pub definition: TriggerDefinition,
    pub endpoint: WebhookEndpoint,
}

impl EffectiveConfig {
    pub fn id(&self) -> &TriggerId {
        &self.definition.id
    }

    pub fn policy(&self) -> RetryPolicy {
        self.definition.retry_policy()
    }
}

impl fmt::Debug for EffectiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectiveConfig")
            .field("id", &self.definition.id)
            .field("security", &self.definition.security())
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn definition(target: WebhookTarget) -> TriggerDefinition {
        TriggerDefinition {
            id: TriggerId::new("public", "employees", "t1"),
            operations: [Operation::Insert, Operation::Update].into_iter().collect(),
            timing: Timing::After,
            target,
            update_columns: vec!["salary".into()],
            timeout_ms: 5_000,
            retry_number: 3,
            retry_interval_ms: 1_000,
            retry_backoff: RetryBackoff::Linear,
            cancel_on_failure: false,
            created_at: Utc::now(),
        }
    }

    fn endpoint() -> WebhookEndpoint {
        let mut headers = BTreeMap::new();
        headers.insert("X-API-Key".to_string(), "test-key".to_string());
        WebhookEndpoint {
            url: "http://hooks.internal:8000/webhook".into(),
            headers,
        }
    }

    #[test]
    fn test_enum_parsing_is_case_insensitive() {
        assert_eq!("insert".parse::<Operation>().unwrap(), Operation::Insert);
        assert_eq!(" Before ".parse::<Timing>().unwrap(), Timing::Before);
        assert_eq!(
            "exponential".parse::<RetryBackoff>().unwrap(),
            RetryBackoff::Exponential
        );
        assert_eq!("private".parse::<SecurityMode>().unwrap(), SecurityMode::Private);
        assert!("DURING".parse::<Timing>().is_err());
        assert!("TRUNCATE".parse::<Operation>().is_err());
    }

    #[test]
    fn test_backoff_delays() {
        let interval = Duration::from_secs(1);
        let linear: Vec<_> = (1..=4).map(|k| RetryBackoff::Linear.delay(interval, k)).collect();
        assert_eq!(linear, vec![interval; 4]);

        let exponential: Vec<_> = (1..=4)
            .map(|k| RetryBackoff::Exponential.delay(interval, k).as_secs())
            .collect();
        assert_eq!(exponential, vec![1, 2, 4, 8]);
    }

    #[test]
    fn test_exponential_backoff_saturates() {
        let delay = RetryBackoff::Exponential.delay(Duration::from_secs(1), 200);
        assert!(delay >= Duration::from_secs(u32::MAX as u64));
    }

    #[test]
    fn test_retry_policy_from_definition() {
        let policy = definition(WebhookTarget::Private).retry_policy();
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.timeout, Duration::from_secs(5));
        assert_eq!(policy.delay_before_retry(2), Duration::from_secs(1));
    }

    #[test]
    fn test_ddl_embeds_inline_target() {
        let ddl = definition(WebhookTarget::Inline(endpoint())).to_ddl();
        assert!(ddl.starts_with(
            "CREATE TRIGGER \"t1\" AFTER INSERT OR UPDATE ON \"public\".\"employees\""
        ));
        assert!(ddl.contains("http://hooks.internal:8000/webhook"));
        assert!(ddl.contains("X-API-Key"));
        assert!(ddl.contains("test-key"));
        assert!(ddl.contains("\"security\":\"NONE\""));
    }

    #[test]
    fn test_ddl_omits_private_target() {
        let ddl = definition(WebhookTarget::Private).to_ddl();
        assert!(!ddl.contains("hooks.internal"));
        assert!(!ddl.contains("test-key"));
        assert!(!ddl.contains("webhook_url"));
        assert!(ddl.contains("\"security\":\"PRIVATE\""));
    }

    #[test]
    fn test_private_definition_serializes_without_endpoint() {
        let json = serde_json::to_string(&definition(WebhookTarget::Private)).unwrap();
        assert!(!json.contains("url"));
        let back: TriggerDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(back.security(), SecurityMode::Private);

        let json = serde_json::to_string(&definition(WebhookTarget::Inline(endpoint()))).unwrap();
        let back: TriggerDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(back.target, WebhookTarget::Inline(endpoint()));
    }

    #[test]
    fn test_effective_config_debug_hides_endpoint() {
        let config = EffectiveConfig {
            definition: definition(WebhookTarget::Private),
            endpoint: endpoint(),
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hooks.internal"));
        assert!(!debug.contains("test-key"));
    }
}
