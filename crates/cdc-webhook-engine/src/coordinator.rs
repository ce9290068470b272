//! Trigger Execution Coordinator
//!
//! Runs one trigger firing inline on the caller's task:
//! resolve the definition, decide whether the change fires, deliver the
//! envelope, then apply the cancel-on-failure decision. An abort is reported
//! as `Error::TransactionAborted`, which the host turns into a rollback of
//! the transaction that made the change. Nothing is retained between
//! firings.

use cdc_webhook_core::types::{ChangeEvent, RowChange, Timing, TriggerId, WebhookTarget};
use cdc_webhook_core::utils::generate_firing_id;
use cdc_webhook_core::{Error, Result};
use metrics::counter;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::dispatch::{DeliveryOutcome, WebhookDispatcher};
use crate::metrics::names;
use crate::registry::TriggerRegistry;

/// How a firing ended when the host's change may proceed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FiringOutcome {
    /// The trigger no longer exists
    Missing,
    /// The change did not match the trigger; no delivery was attempted
    Skipped,
    Delivered { attempts: u32 },
    /// Delivery failed and the trigger does not cancel on failure
    Failed { attempts: u32, cause: String },
}

#[derive(Clone)]
pub struct TriggerExecutor {
    registry: TriggerRegistry,
    dispatcher: WebhookDispatcher,
}

impl TriggerExecutor {
    pub fn new(registry: TriggerRegistry, dispatcher: WebhookDispatcher) -> Self {
        Self {
            registry,
            dispatcher,
        }
    }

    pub fn registry(&self) -> &TriggerRegistry {
        &self.registry
    }

    /// Fire one trigger for one row change
    pub async fn fire(&self, id: &TriggerId, change: &RowChange) -> Result<FiringOutcome> {
        let span = info_span!(
            "trigger_firing",
            trigger = %id,
            op = %change.operation,
            firing_id = %generate_firing_id()
        );

        async {
            let outcome = self.run(id, change).await;
            let result = match &outcome {
                Ok(FiringOutcome::Missing) => "missing",
                Ok(FiringOutcome::Skipped) => "skipped",
                Ok(FiringOutcome::Delivered { .. }) => "delivered",
                Ok(FiringOutcome::Failed { .. }) => "failed",
                Err(e) if e.aborts_transaction() => "aborted",
                Err(_) => "error",
            };
            counter!(names::FIRINGS_TOTAL, "result" => result).increment(1);
            outcome
        }
        .instrument(span)
        .await
    }

    /// Fire every trigger on `schema.table` with the given timing, in name
    /// order. Stops at the first firing that aborts the transaction.
    pub async fn on_row_change(
        &self,
        schema: &str,
        table: &str,
        timing: Timing,
        change: &RowChange,
    ) -> Result<Vec<(TriggerId, FiringOutcome)>> {
        let triggers = self.registry.list(schema, table).await?;

        let mut outcomes = Vec::new();
        for definition in triggers.into_iter().filter(|d| d.timing == timing) {
            let outcome = self.fire(&definition.id, change).await?;
            outcomes.push((definition.id, outcome));
        }
        Ok(outcomes)
    }

    async fn run(&self, id: &TriggerId, change: &RowChange) -> Result<FiringOutcome> {
        let Some(definition) = self.registry.get(id).await? else {
            debug!("Trigger no longer exists");
            return Ok(FiringOutcome::Missing);
        };

        let Some(event) = ChangeEvent::build(&definition, change) else {
            debug!("Change does not match trigger, skipping");
            return Ok(FiringOutcome::Skipped);
        };

        let cancel_on_failure = definition.cancel_on_failure;
        let config = match self.registry.materialize(definition).await {
            Ok(config) => config,
            Err(Error::MissingCredential(_)) => {
                // a drop or redefinition may have landed between the two reads
                let still_private = matches!(
                    self.registry.get(id).await?,
                    Some(current) if matches!(current.target, WebhookTarget::Private)
                );
                if !still_private {
                    debug!("Trigger dropped or redefined while firing");
                    return Ok(FiringOutcome::Missing);
                }
                return self.decide(
                    id,
                    cancel_on_failure,
                    0,
                    "credential record missing".to_string(),
                );
            }
            Err(e) => return Err(e),
        };

        let body = serde_json::to_vec(&event.into_envelope(id.name.clone()))?;
        let outcome = self
            .dispatcher
            .deliver(&config.endpoint, &body, &config.policy())
            .await;

        match outcome {
            DeliveryOutcome::Delivered { attempts } => {
                info!("Webhook delivered after {} attempt(s)", attempts);
                Ok(FiringOutcome::Delivered { attempts })
            }
            DeliveryOutcome::Exhausted { attempts, .. } => {
                let cause = outcome.failure_summary();
                self.decide(id, cancel_on_failure, attempts, cause)
            }
        }
    }

    fn decide(
        &self,
        id: &TriggerId,
        cancel_on_failure: bool,
        attempts: u32,
        cause: String,
    ) -> Result<FiringOutcome> {
        if cancel_on_failure {
            error!(
                "Webhook delivery failed after {} attempt(s), aborting transaction: {}",
                attempts, cause
            );
            return Err(Error::TransactionAborted {
                trigger: id.to_string(),
                attempts,
                cause,
            });
        }

        warn!(
            "Webhook delivery failed after {} attempt(s): {}",
            attempts, cause
        );
        Ok(FiringOutcome::Failed { attempts, cause })
    }
}
