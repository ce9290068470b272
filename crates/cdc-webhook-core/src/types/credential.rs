//! Webhook endpoints and credential records
//!
//! A credential record holds the URL and headers of a PRIVATE trigger. Its
//! `Debug` output never includes either, so it is safe to log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use super::trigger::TriggerId;
use crate::error::ValidationError;

/// Delivery destination: URL plus extra request headers
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEndpoint {
    #[serde(rename = "webhook_url")]
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl WebhookEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Check the URL is an absolute http(s) URL and every header is a valid
    /// HTTP header. Header names are case-insensitive, so two names that
    /// differ only by case are rejected, as is `Content-Type`, which is
    /// always `application/json`. Errors never include the URL or header
    /// values.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.trim().is_empty() {
            return Err(ValidationError::Missing("webhook_url"));
        }

        let parsed = url::Url::parse(&self.url)
            .map_err(|e| ValidationError::InvalidWebhookUrl(e.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ValidationError::InvalidWebhookUrl(format!(
                    "unsupported scheme '{}'",
                    other
                )))
            }
        }
        if parsed.host_str().is_none() {
            return Err(ValidationError::InvalidWebhookUrl("missing host".into()));
        }

        let mut seen = HashSet::new();
        for (name, value) in &self.headers {
            let header = http::HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ValidationError::InvalidHeaderName(name.clone()))?;
            if header == http::header::CONTENT_TYPE {
                return Err(ValidationError::ReservedHeader(name.clone()));
            }
            if !seen.insert(header) {
                return Err(ValidationError::DuplicateHeader(name.clone()));
            }
            http::HeaderValue::from_str(value)
                .map_err(|_| ValidationError::InvalidHeaderValue(name.clone()))?;
        }

        Ok(())
    }

    /// `scheme://host` with path and query hidden, for operator display
    pub fn masked_url(&self) -> String {
        match url::Url::parse(&self.url) {
            Ok(parsed) => format!(
                "{}://{}/****",
                parsed.scheme(),
                parsed.host_str().unwrap_or("****")
            ),
            Err(_) => "****".to_string(),
        }
    }
}

impl fmt::Debug for WebhookEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookEndpoint")
            .field("url", &"***")
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Credential record of a PRIVATE trigger
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub trigger: TriggerId,
    pub endpoint: WebhookEndpoint,
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(trigger: TriggerId, endpoint: WebhookEndpoint) -> Self {
        Self {
            trigger,
            endpoint,
            updated_at: Utc::now(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("trigger", &self.trigger)
            .field("endpoint", &self.endpoint)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}
