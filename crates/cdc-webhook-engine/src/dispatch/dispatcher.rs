//! Webhook Dispatcher
//!
//! Delivers one payload to one endpoint, retrying on failure according to a
//! trigger's retry policy. Every attempt and every wait runs inline on the
//! caller's task, so the caller's write path is blocked until the outcome is
//! known.

use cdc_webhook_core::config::DispatchConfig;
use cdc_webhook_core::types::{RetryPolicy, WebhookEndpoint};
use cdc_webhook_core::Result;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::transport::{HttpTransport, WebhookTransport};
use crate::error::DeliveryError;
use crate::metrics::names;

/// Final result of a delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// A 2xx response was received on attempt `attempts`
    Delivered { attempts: u32 },
    /// Every allowed attempt failed; `failures[i]` is the cause of attempt `i + 1`
    Exhausted {
        attempts: u32,
        failures: Vec<DeliveryError>,
    },
}

impl DeliveryOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            DeliveryOutcome::Delivered { attempts } => *attempts,
            DeliveryOutcome::Exhausted { attempts, .. } => *attempts,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }

    pub fn last_error(&self) -> Option<&DeliveryError> {
        match self {
            DeliveryOutcome::Delivered { .. } => None,
            DeliveryOutcome::Exhausted { failures, .. } => failures.last(),
        }
    }

    /// One clause per failed attempt, e.g. `attempt 1/3: HTTP 500; ...`
    pub fn failure_summary(&self) -> String {
        match self {
            DeliveryOutcome::Delivered { .. } => String::new(),
            DeliveryOutcome::Exhausted { attempts, failures } => failures
                .iter()
                .enumerate()
                .map(|(i, e)| format!("attempt {}/{}: {}", i + 1, attempts, e))
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

/// Stateless between calls; cheap to clone
#[derive(Clone)]
pub struct WebhookDispatcher {
    transport: Arc<dyn WebhookTransport>,
}

impl WebhookDispatcher {
    pub fn new(transport: Arc<dyn WebhookTransport>) -> Self {
        Self { transport }
    }

    /// Dispatcher over a reqwest client built from `config`
    pub fn http(config: &DispatchConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(config)?)))
    }

    /// Deliver `body` to `endpoint`.
    ///
    /// Attempt 1 is always made. After a failed attempt another one follows
    /// while fewer than `retry_number` retries have been made, preceded by
    /// the backoff wait. Each attempt is bounded by `policy.timeout`.
    pub async fn deliver(
        &self,
        endpoint: &WebhookEndpoint,
        body: &[u8],
        policy: &RetryPolicy,
    ) -> DeliveryOutcome {
        let max_attempts = policy.max_attempts();
        let mut failures = Vec::new();

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                let delay = policy.delay_before_retry(attempt - 1);
                info!(
                    "Retrying webhook delivery in {}ms (attempt {}/{})",
                    delay.as_millis(),
                    attempt,
                    max_attempts
                );
                tokio::time::sleep(delay).await;
            }

            counter!(names::DELIVERY_ATTEMPTS_TOTAL).increment(1);

            match self.attempt(endpoint, body, policy.timeout).await {
                Ok(()) => {
                    debug!("Webhook delivered (attempt {}/{})", attempt, max_attempts);
                    counter!(names::DELIVERIES_TOTAL, "outcome" => "delivered").increment(1);
                    return DeliveryOutcome::Delivered { attempts: attempt };
                }
                Err(e) => {
                    debug!(
                        "Webhook attempt {}/{} failed: {}",
                        attempt, max_attempts, e
                    );
                    failures.push(e);
                }
            }
        }

        counter!(names::DELIVERIES_TOTAL, "outcome" => "exhausted").increment(1);
        DeliveryOutcome::Exhausted {
            attempts: max_attempts,
            failures,
        }
    }

    async fn attempt(
        &self,
        endpoint: &WebhookEndpoint,
        body: &[u8],
        timeout: Duration,
    ) -> std::result::Result<(), DeliveryError> {
        match tokio::time::timeout(timeout, self.transport.post(endpoint, body)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout(timeout.as_millis() as u64)),
        }
    }
}
