//! Metadata repository trait
//!
//! Defines the interface for trigger definition and credential storage.
//! Implementations exist for SQLite and in-memory backends.

use async_trait::async_trait;
use cdc_webhook_core::types::{Credential, TriggerDefinition, TriggerId};
use cdc_webhook_core::Result;

/// A definition together with its rendered inspectable form
#[derive(Debug, Clone)]
pub struct StoredTrigger {
    pub definition: TriggerDefinition,
    pub ddl: String,
}

/// Metadata repository trait
///
/// Definitions and credential records are keyed by the same trigger
/// identity. A credential record exists iff the stored definition uses
/// PRIVATE security; `put_trigger` and `delete_trigger` keep the pair
/// consistent by writing both tables in one transaction.
#[async_trait]
pub trait MetadataRepository: Send + Sync {
    // ============= Trigger Operations =============

    /// Insert or replace a definition. `credential` must be `Some` exactly
    /// when the definition is PRIVATE; a stale credential is removed
    /// otherwise.
    async fn put_trigger(
        &self,
        definition: &TriggerDefinition,
        credential: Option<&Credential>,
    ) -> Result<()>;

    async fn get_trigger(&self, id: &TriggerId) -> Result<Option<StoredTrigger>>;

    /// Triggers attached to one table, ordered by name
    async fn list_triggers(&self, schema: &str, table: &str) -> Result<Vec<TriggerDefinition>>;

    /// Every trigger, ordered by schema, table and name
    async fn list_all_triggers(&self) -> Result<Vec<TriggerDefinition>>;

    /// Remove a definition and its credential. Returns false if absent.
    async fn delete_trigger(&self, id: &TriggerId) -> Result<bool>;

    // ============= Credential Operations =============

    async fn get_credential(&self, id: &TriggerId) -> Result<Option<Credential>>;

    /// Replace an existing credential record. Returns false if there is no
    /// record for the identity.
    async fn update_credential(&self, credential: &Credential) -> Result<bool>;
}
