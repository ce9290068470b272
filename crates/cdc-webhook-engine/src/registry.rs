//! Trigger Registry
//!
//! Validates and persists trigger definitions and materializes the effective
//! configuration of a trigger for one firing. The registry never caches a
//! credential: a PRIVATE trigger's endpoint is read from the credential
//! table every time it is resolved.

use cdc_webhook_core::config::RegistryConfig;
use cdc_webhook_core::types::{
    CreateTrigger, Credential, EffectiveConfig, TriggerDefinition, TriggerId, WebhookEndpoint,
    WebhookTarget,
};
use cdc_webhook_core::{Error, Result};
use cdc_webhook_metadata::MetadataRepository;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct TriggerRegistry {
    repo: Arc<dyn MetadataRepository>,
    default_schema: String,
}

impl TriggerRegistry {
    pub fn new(repo: Arc<dyn MetadataRepository>, default_schema: impl Into<String>) -> Self {
        Self {
            repo,
            default_schema: default_schema.into(),
        }
    }

    pub fn from_config(repo: Arc<dyn MetadataRepository>, config: &RegistryConfig) -> Self {
        Self::new(repo, config.default_schema.clone())
    }

    pub fn default_schema(&self) -> &str {
        &self.default_schema
    }

    // ============= Registration =============

    /// Validate and store a trigger, replacing any trigger with the same
    /// identity. Nothing is written if validation fails.
    pub async fn register(&self, request: CreateTrigger) -> Result<TriggerDefinition> {
        let registration = request.validate(&self.default_schema)?;
        let definition = registration.definition;

        self.repo
            .put_trigger(&definition, registration.credential.as_ref())
            .await?;

        info!(
            "Registered trigger {} ({} {}, security {})",
            definition.id,
            definition.timing,
            definition
                .operations
                .iter()
                .map(|op| op.as_str())
                .collect::<Vec<_>>()
                .join("|"),
            definition.security()
        );
        Ok(definition)
    }

    /// Remove a trigger and its credential record. Returns false if there
    /// was no such trigger.
    pub async fn drop_trigger(&self, id: &TriggerId) -> Result<bool> {
        let removed = self.repo.delete_trigger(id).await?;
        if removed {
            info!("Dropped trigger {}", id);
        }
        Ok(removed)
    }

    // ============= Lookup =============

    pub async fn get(&self, id: &TriggerId) -> Result<Option<TriggerDefinition>> {
        Ok(self.repo.get_trigger(id).await?.map(|stored| stored.definition))
    }

    /// Definition plus its live endpoint, or `None` if the trigger is gone
    pub async fn resolve(&self, id: &TriggerId) -> Result<Option<EffectiveConfig>> {
        match self.get(id).await? {
            Some(definition) => Ok(Some(self.materialize(definition).await?)),
            None => Ok(None),
        }
    }

    /// Attach the endpoint to an already loaded definition. The credential
    /// table is consulted only for PRIVATE triggers.
    pub async fn materialize(&self, definition: TriggerDefinition) -> Result<EffectiveConfig> {
        let endpoint = match &definition.target {
            WebhookTarget::Inline(endpoint) => endpoint.clone(),
            WebhookTarget::Private => self
                .repo
                .get_credential(&definition.id)
                .await?
                .ok_or_else(|| Error::MissingCredential(definition.id.to_string()))?
                .endpoint,
        };

        Ok(EffectiveConfig {
            definition,
            endpoint,
        })
    }

    /// The inspectable form of a trigger
    pub async fn inspect(&self, id: &TriggerId) -> Result<Option<String>> {
        Ok(self.repo.get_trigger(id).await?.map(|stored| stored.ddl))
    }

    /// Triggers on one table in firing order
    pub async fn list(&self, schema: &str, table: &str) -> Result<Vec<TriggerDefinition>> {
        self.repo.list_triggers(schema, table).await
    }

    pub async fn list_all(&self) -> Result<Vec<TriggerDefinition>> {
        self.repo.list_all_triggers().await
    }

    // ============= Credentials =============

    /// Credential record of a PRIVATE trigger
    pub async fn credentials(&self, id: &TriggerId) -> Result<Credential> {
        self.require_private(id).await?;
        self.repo
            .get_credential(id)
            .await?
            .ok_or_else(|| Error::MissingCredential(id.to_string()))
    }

    /// Replace the endpoint of a PRIVATE trigger. The next firing uses it.
    pub async fn rotate_credentials(&self, id: &TriggerId, endpoint: WebhookEndpoint) -> Result<()> {
        endpoint.validate()?;
        self.require_private(id).await?;

        let credential = Credential::new(id.clone(), endpoint);
        if !self.repo.update_credential(&credential).await? {
            return Err(Error::MissingCredential(id.to_string()));
        }

        info!("Rotated credentials for trigger {}", id);
        Ok(())
    }

    async fn require_private(&self, id: &TriggerId) -> Result<()> {
        match self.get(id).await? {
            None => Err(Error::NoSuchTrigger(id.to_string())),
            Some(definition) => match definition.target {
                WebhookTarget::Private => Ok(()),
                WebhookTarget::Inline(_) => Err(Error::NotPrivate(id.to_string())),
            },
        }
    }
}
