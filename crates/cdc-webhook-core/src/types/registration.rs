//! Trigger registration requests
//!
//! `CreateTrigger` carries operator input exactly as given (enumerations as
//! text, durations as signed milliseconds) so that every invalid value can be
//! reported as a validation error instead of being unrepresentable.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use super::credential::{Credential, WebhookEndpoint};
use super::trigger::{
    Operation, RetryBackoff, SecurityMode, Timing, TriggerDefinition, TriggerId, WebhookTarget,
};
use crate::error::ValidationError;

/// Registration input with the documented defaults applied on validation
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateTrigger {
    pub name: String,
    pub table_name: String,
    /// Defaults to the host's current schema
    pub schema_name: Option<String>,
    pub operations: Vec<String>,
    pub webhook_url: String,
    pub headers: BTreeMap<String, String>,
    pub update_columns: Vec<String>,
    /// Per-attempt timeout, defaults to 5s
    pub timeout_ms: Option<i64>,
    pub cancel_on_failure: Option<bool>,
    /// BEFORE or AFTER, defaults to AFTER
    pub trigger_timing: Option<String>,
    /// Defaults to 3
    pub retry_number: Option<i64>,
    /// Defaults to 1s
    pub retry_interval_ms: Option<i64>,
    /// LINEAR or EXPONENTIAL, defaults to LINEAR
    pub retry_backoff: Option<String>,
    /// NONE or PRIVATE, defaults to NONE
    pub security: Option<String>,
}

/// Outcome of a successful validation: what the registry persists
#[derive(Debug, Clone)]
pub struct Registration {
    pub definition: TriggerDefinition,
    /// Present iff the definition uses PRIVATE security
    pub credential: Option<Credential>,
}

impl CreateTrigger {
    pub fn new<I, S>(
        name: impl Into<String>,
        table_name: impl Into<String>,
        operations: I,
        webhook_url: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            table_name: table_name.into(),
            operations: operations.into_iter().map(Into::into).collect(),
            webhook_url: webhook_url.into(),
            ..Default::default()
        }
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema_name = Some(schema.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn update_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.update_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn timeout_ms(mut self, ms: i64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }

    pub fn cancel_on_failure(mut self, cancel: bool) -> Self {
        self.cancel_on_failure = Some(cancel);
        self
    }

    pub fn timing(mut self, timing: impl Into<String>) -> Self {
        self.trigger_timing = Some(timing.into());
        self
    }

    pub fn retry_number(mut self, n: i64) -> Self {
        self.retry_number = Some(n);
        self
    }

    pub fn retry_interval_ms(mut self, ms: i64) -> Self {
        self.retry_interval_ms = Some(ms);
        self
    }

    pub fn retry_backoff(mut self, backoff: impl Into<String>) -> Self {
        self.retry_backoff = Some(backoff.into());
        self
    }

    pub fn security(mut self, security: impl Into<String>) -> Self {
        self.security = Some(security.into());
        self
    }

    /// Validate every field and build the definition (and credential record
    /// for PRIVATE triggers). Nothing is persisted here.
    pub fn validate(self, default_schema: &str) -> Result<Registration, ValidationError> {
        let schema = self
            .schema_name
            .clone()
            .unwrap_or_else(|| default_schema.to_string());
        validate_identifier("schema_name", &schema)?;
        validate_identifier("table_name", &self.table_name)?;
        validate_identifier("name", &self.name)?;

        if self.operations.is_empty() {
            return Err(ValidationError::EmptyOperations);
        }
        let operations = self
            .operations
            .iter()
            .map(|op| op.parse::<Operation>())
            .collect::<Result<BTreeSet<_>, _>>()?;

        let timing = match &self.trigger_timing {
            Some(t) => t.parse::<Timing>()?,
            None => Timing::default(),
        };

        let endpoint = WebhookEndpoint {
            url: self.webhook_url.clone(),
            headers: self.headers.clone(),
        };
        endpoint.validate()?;

        let update_columns = validate_update_columns(&self.update_columns)?;

        let timeout_ms = self.timeout_ms.unwrap_or(crate::DEFAULT_TIMEOUT_MS);
        if timeout_ms <= 0 {
            return Err(ValidationError::NonPositiveTimeout(timeout_ms));
        }

        let retry_number = self.retry_number.unwrap_or(crate::DEFAULT_RETRY_NUMBER);
        if retry_number < 0 {
            return Err(ValidationError::NegativeRetryNumber(retry_number));
        }
        let retry_number = u32::try_from(retry_number)
            .map_err(|_| ValidationError::RetryNumberTooLarge(retry_number))?;

        let retry_interval_ms = self
            .retry_interval_ms
            .unwrap_or(crate::DEFAULT_RETRY_INTERVAL_MS);
        if retry_interval_ms <= 0 {
            return Err(ValidationError::NonPositiveRetryInterval(retry_interval_ms));
        }

        let retry_backoff = match &self.retry_backoff {
            Some(b) => b.parse::<RetryBackoff>()?,
            None => RetryBackoff::default(),
        };

        let security = match &self.security {
            Some(s) => s.parse::<SecurityMode>()?,
            None => SecurityMode::default(),
        };

        let id = TriggerId::new(schema, self.table_name, self.name);
        let (target, credential) = match security {
            SecurityMode::None => (WebhookTarget::Inline(endpoint), None),
            SecurityMode::Private => (
                WebhookTarget::Private,
                Some(Credential::new(id.clone(), endpoint)),
            ),
        };

        let definition = TriggerDefinition {
            id,
            operations,
            timing,
            target,
            update_columns,
            timeout_ms: timeout_ms as u64,
            retry_number,
            retry_interval_ms: retry_interval_ms as u64,
            retry_backoff,
            cancel_on_failure: self.cancel_on_failure.unwrap_or(false),
            created_at: Utc::now(),
        };

        Ok(Registration {
            definition,
            credential,
        })
    }
}

impl fmt::Debug for CreateTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateTrigger")
            .field("name", &self.name)
            .field("table_name", &self.table_name)
            .field("schema_name", &self.schema_name)
            .field("operations", &self.operations)
            .field("webhook_url", &"***")
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("update_columns", &self.update_columns)
            .field("timeout_ms", &self.timeout_ms)
            .field("cancel_on_failure", &self.cancel_on_failure)
            .field("trigger_timing", &self.trigger_timing)
            .field("retry_number", &self.retry_number)
            .field("retry_interval_ms", &self.retry_interval_ms)
            .field("retry_backoff", &self.retry_backoff)
            .field("security", &self.security)
            .finish()
    }
}

/// Schema, table, trigger and column names
pub fn validate_identifier(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Missing(field));
    }
    if value.len() > crate::MAX_IDENTIFIER_LENGTH {
        return Err(ValidationError::InvalidIdentifier {
            field,
            reason: format!(
                "longer than {} bytes",
                crate::MAX_IDENTIFIER_LENGTH
            ),
        });
    }
    if value.contains('\0') {
        return Err(ValidationError::InvalidIdentifier {
            field,
            reason: "contains a NUL byte".into(),
        });
    }
    Ok(())
}

fn validate_update_columns(columns: &[String]) -> Result<Vec<String>, ValidationError> {
    let mut seen = HashSet::new();
    for column in columns {
        validate_identifier("update_columns", column)
            .map_err(|e| ValidationError::InvalidUpdateColumns(e.to_string()))?;
        if !seen.insert(column.as_str()) {
            return Err(ValidationError::InvalidUpdateColumns(format!(
                "column {} listed twice",
                column
            )));
        }
    }
    Ok(columns.to_vec())
}
