//! In-memory metadata store
//!
//! Both tables sit behind a single lock so that definition and credential
//! writes are observed together.

use async_trait::async_trait;
use cdc_webhook_core::types::{Credential, TriggerDefinition, TriggerId};
use cdc_webhook_core::Result;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::traits::{MetadataRepository, StoredTrigger};

#[derive(Default)]
struct Tables {
    // BTreeMap keeps (schema, table, name) order for listing
    triggers: BTreeMap<TriggerId, StoredTrigger>,
    credentials: HashMap<TriggerId, Credential>,
}

#[derive(Default)]
pub struct MemoryMetadataStore {
    tables: RwLock<Tables>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataRepository for MemoryMetadataStore {
    async fn put_trigger(
        &self,
        definition: &TriggerDefinition,
        credential: Option<&Credential>,
    ) -> Result<()> {
        let id = definition.id.clone();
        let stored = StoredTrigger {
            definition: definition.clone(),
            ddl: definition.to_ddl(),
        };

        let mut tables = self.tables.write().await;
        match credential {
            Some(credential) => {
                tables.credentials.insert(id.clone(), credential.clone());
            }
            None => {
                tables.credentials.remove(&id);
            }
        }
        tables.triggers.insert(id, stored);
        Ok(())
    }

    async fn get_trigger(&self, id: &TriggerId) -> Result<Option<StoredTrigger>> {
        Ok(self.tables.read().await.triggers.get(id).cloned())
    }

    async fn list_triggers(&self, schema: &str, table: &str) -> Result<Vec<TriggerDefinition>> {
        Ok(self
            .tables
            .read()
            .await
            .triggers
            .values()
            .filter(|stored| stored.definition.id.is_on(schema, table))
            .map(|stored| stored.definition.clone())
            .collect())
    }

    async fn list_all_triggers(&self) -> Result<Vec<TriggerDefinition>> {
        Ok(self
            .tables
            .read()
            .await
            .triggers
            .values()
            .map(|stored| stored.definition.clone())
            .collect())
    }

    async fn delete_trigger(&self, id: &TriggerId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        tables.credentials.remove(id);
        Ok(tables.triggers.remove(id).is_some())
    }

    async fn get_credential(&self, id: &TriggerId) -> Result<Option<Credential>> {
        Ok(self.tables.read().await.credentials.get(id).cloned())
    }

    async fn update_credential(&self, credential: &Credential) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.credentials.get_mut(&credential.trigger) {
            Some(existing) => {
                *existing = credential.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
