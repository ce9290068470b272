//! SQLite metadata repository

use async_trait::async_trait;
use cdc_webhook_core::config::DatabaseConfig;
use cdc_webhook_core::types::{Credential, TriggerDefinition, TriggerId, WebhookEndpoint};
use cdc_webhook_core::utils::format_datetime;
use cdc_webhook_core::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::traits::{MetadataRepository, StoredTrigger};

pub struct MetadataStore {
    pool: SqlitePool,
}

fn db_err(e: sqlx::Error) -> Error {
    Error::DatabaseError(e.to_string())
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::DatabaseError(format!("invalid timestamp '{}': {}", value, e)))
}

impl MetadataStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::connect(&DatabaseConfig {
            url: database_url.to_string(),
            ..Default::default()
        })
        .await
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        // every connection to an in-memory database is a separate database
        let max_connections = if config.url.contains(":memory:") {
            1
        } else {
            config.max_connections
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&config.url)
            .await
            .map_err(db_err)?;

        let store = Self { pool };
        store.init().await?;

        info!("Metadata store ready ({} connection(s))", max_connections);
        Ok(store)
    }

    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cdc_triggers (
                schema_name TEXT NOT NULL,
                table_name TEXT NOT NULL,
                trigger_name TEXT NOT NULL,
                definition TEXT NOT NULL,
                ddl TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (schema_name, table_name, trigger_name)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        // Only PRIVATE triggers have a row here
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cdc_credentials (
                schema_name TEXT NOT NULL,
                table_name TEXT NOT NULL,
                trigger_name TEXT NOT NULL,
                webhook_url TEXT NOT NULL,
                headers TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (schema_name, table_name, trigger_name)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    // Trigger operations
    pub async fn put_trigger(
        &self,
        definition: &TriggerDefinition,
        credential: Option<&Credential>,
    ) -> Result<()> {
        let id = &definition.id;
        let body = serde_json::to_string(definition)?;
        let ddl = definition.to_ddl();

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO cdc_triggers
                (schema_name, table_name, trigger_name, definition, ddl, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id.schema)
        .bind(&id.table)
        .bind(&id.name)
        .bind(&body)
        .bind(&ddl)
        .bind(format_datetime(&definition.created_at))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        match credential {
            Some(credential) => {
                let headers = serde_json::to_string(&credential.endpoint.headers)?;
                sqlx::query(
                    r#"
                    INSERT OR REPLACE INTO cdc_credentials
                        (schema_name, table_name, trigger_name, webhook_url, headers, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&id.schema)
                .bind(&id.table)
                .bind(&id.name)
                .bind(&credential.endpoint.url)
                .bind(&headers)
                .bind(format_datetime(&credential.updated_at))
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            }
            None => {
                sqlx::query(
                    r#"
                    DELETE FROM cdc_credentials
                    WHERE schema_name = ? AND table_name = ? AND trigger_name = ?
                    "#,
                )
                .bind(&id.schema)
                .bind(&id.table)
                .bind(&id.name)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            }
        }

        tx.commit().await.map_err(db_err)?;

        debug!("Stored trigger: {}", id);
        Ok(())
    }

    pub async fn get_trigger(&self, id: &TriggerId) -> Result<Option<StoredTrigger>> {
        let row: Option<(String, String)> = sqlx::query_as(
            r#"
            SELECT definition, ddl FROM cdc_triggers
            WHERE schema_name = ? AND table_name = ? AND trigger_name = ?
            "#,
        )
        .bind(&id.schema)
        .bind(&id.table)
        .bind(&id.name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(|(definition, ddl)| -> Result<StoredTrigger> {
            Ok(StoredTrigger {
                definition: serde_json::from_str(&definition)?,
                ddl,
            })
        })
        .transpose()
    }

    pub async fn list_triggers(&self, schema: &str, table: &str) -> Result<Vec<TriggerDefinition>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT definition FROM cdc_triggers
            WHERE schema_name = ? AND table_name = ?
            ORDER BY trigger_name
            "#,
        )
        .bind(schema)
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter()
            .map(|(definition,)| serde_json::from_str(&definition).map_err(Error::from))
            .collect()
    }

    pub async fn list_all_triggers(&self) -> Result<Vec<TriggerDefinition>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT definition FROM cdc_triggers
            ORDER BY schema_name, table_name, trigger_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter()
            .map(|(definition,)| serde_json::from_str(&definition).map_err(Error::from))
            .collect()
    }

    pub async fn delete_trigger(&self, id: &TriggerId) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let deleted = sqlx::query(
            r#"
            DELETE FROM cdc_triggers
            WHERE schema_name = ? AND table_name = ? AND trigger_name = ?
            "#,
        )
        .bind(&id.schema)
        .bind(&id.table)
        .bind(&id.name)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?
        .rows_affected();

        sqlx::query(
            r#"
            DELETE FROM cdc_credentials
            WHERE schema_name = ? AND table_name = ? AND trigger_name = ?
            "#,
        )
        .bind(&id.schema)
        .bind(&id.table)
        .bind(&id.name)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        if deleted > 0 {
            debug!("Deleted trigger: {}", id);
        }
        Ok(deleted > 0)
    }

    // Credential operations
    pub async fn get_credential(&self, id: &TriggerId) -> Result<Option<Credential>> {
        let row: Option<(String, String, String)> = sqlx::query_as(
            r#"
            SELECT webhook_url, headers, updated_at FROM cdc_credentials
            WHERE schema_name = ? AND table_name = ? AND trigger_name = ?
            "#,
        )
        .bind(&id.schema)
        .bind(&id.table)
        .bind(&id.name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(|(url, headers, updated_at)| -> Result<Credential> {
            let headers: BTreeMap<String, String> = serde_json::from_str(&headers)?;
            Ok(Credential {
                trigger: id.clone(),
                endpoint: WebhookEndpoint { url, headers },
                updated_at: parse_timestamp(&updated_at)?,
            })
        })
        .transpose()
    }

    pub async fn update_credential(&self, credential: &Credential) -> Result<bool> {
        let id = &credential.trigger;
        let headers = serde_json::to_string(&credential.endpoint.headers)?;

        let updated = sqlx::query(
            r#"
            UPDATE cdc_credentials
            SET webhook_url = ?, headers = ?, updated_at = ?
            WHERE schema_name = ? AND table_name = ? AND trigger_name = ?
            "#,
        )
        .bind(&credential.endpoint.url)
        .bind(&headers)
        .bind(format_datetime(&credential.updated_at))
        .bind(&id.schema)
        .bind(&id.table)
        .bind(&id.name)
        .execute(&self.pool)
        .await
        .map_err(db_err)?
        .rows_affected();

        if updated > 0 {
            debug!("Updated credential for: {}", id);
        }
        Ok(updated > 0)
    }
}

// ============= MetadataRepository Trait Implementation =============

#[async_trait]
impl MetadataRepository for MetadataStore {
    async fn put_trigger(
        &self,
        definition: &TriggerDefinition,
        credential: Option<&Credential>,
    ) -> Result<()> {
        MetadataStore::put_trigger(self, definition, credential).await
    }

    async fn get_trigger(&self, id: &TriggerId) -> Result<Option<StoredTrigger>> {
        MetadataStore::get_trigger(self, id).await
    }

    async fn list_triggers(&self, schema: &str, table: &str) -> Result<Vec<TriggerDefinition>> {
        MetadataStore::list_triggers(self, schema, table).await
    }

    async fn list_all_triggers(&self) -> Result<Vec<TriggerDefinition>> {
        MetadataStore::list_all_triggers(self).await
    }

    async fn delete_trigger(&self, id: &TriggerId) -> Result<bool> {
        MetadataStore::delete_trigger(self, id).await
    }

    async fn get_credential(&self, id: &TriggerId) -> Result<Option<Credential>> {
        MetadataStore::get_credential(self, id).await
    }

    async fn update_credential(&self, credential: &Credential) -> Result<bool> {
        MetadataStore::update_credential(self, credential).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdc_webhook_core::types::{CreateTrigger, Registration};
    use tempfile::TempDir;

    async fn store() -> (TempDir, MetadataStore) {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("meta.db").display());
        let store = MetadataStore::new(&url).await.unwrap();
        (dir, store)
    }

    fn registration(name: &str, security: &str) -> Registration {
        CreateTrigger::new(name, "employees", ["INSERT"], "https://hooks.example.com/secret")
            .header("X-API-Key", "test-key")
            .security(security)
            .validate("public")
            .unwrap()
    }

    #[tokio::test]
    async fn test_private_trigger_round_trip() {
        let (_dir, store) = store().await;
        let reg = registration("t1", "PRIVATE");
        store
            .put_trigger(&reg.definition, reg.credential.as_ref())
            .await
            .unwrap();

        let stored = store.get_trigger(&reg.definition.id).await.unwrap().unwrap();
        assert_eq!(stored.definition, reg.definition);
        assert!(!stored.ddl.contains("hooks.example.com"));
        assert!(!stored.ddl.contains("test-key"));

        let credential = store.get_credential(&reg.definition.id).await.unwrap().unwrap();
        assert_eq!(credential.endpoint.url, "https://hooks.example.com/secret");
        assert_eq!(
            credential.endpoint.headers.get("X-API-Key").map(String::as_str),
            Some("test-key")
        );
    }

    #[tokio::test]
    async fn test_redefine_as_none_removes_credential() {
        let (_dir, store) = store().await;
        let private = registration("t1", "PRIVATE");
        store
            .put_trigger(&private.definition, private.credential.as_ref())
            .await
            .unwrap();

        let inline = registration("t1", "NONE");
        store.put_trigger(&inline.definition, None).await.unwrap();

        let id = &inline.definition.id;
        assert!(store.get_credential(id).await.unwrap().is_none());
        let stored = store.get_trigger(id).await.unwrap().unwrap();
        assert!(stored.ddl.contains("https://hooks.example.com/secret"));
        assert!(stored.ddl.contains("test-key"));
    }

    #[tokio::test]
    async fn test_delete_removes_both_records() {
        let (_dir, store) = store().await;
        let reg = registration("t1", "PRIVATE");
        let id = reg.definition.id.clone();
        store
            .put_trigger(&reg.definition, reg.credential.as_ref())
            .await
            .unwrap();

        assert!(store.delete_trigger(&id).await.unwrap());
        assert!(store.get_trigger(&id).await.unwrap().is_none());
        assert!(store.get_credential(&id).await.unwrap().is_none());
        assert!(!store.delete_trigger(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_orders_by_name() {
        let (_dir, store) = store().await;
        for name in ["zeta", "alpha", "mid"] {
            let reg = registration(name, "NONE");
            store.put_trigger(&reg.definition, None).await.unwrap();
        }
        let other = CreateTrigger::new("beta", "orders", ["DELETE"], "http://127.0.0.1:9/x")
            .validate("public")
            .unwrap();
        store.put_trigger(&other.definition, None).await.unwrap();

        let names: Vec<_> = store
            .list_triggers("public", "employees")
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id.name)
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
        assert_eq!(store.list_all_triggers().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_update_credential_requires_existing_record() {
        let (_dir, store) = store().await;
        let reg = registration("t1", "PRIVATE");
        let id = reg.definition.id.clone();

        let rotated = Credential::new(id.clone(), WebhookEndpoint::new("https://new.example.com/hook"));
        assert!(!store.update_credential(&rotated).await.unwrap());

        store
            .put_trigger(&reg.definition, reg.credential.as_ref())
            .await
            .unwrap();
        assert!(store.update_credential(&rotated).await.unwrap());

        let credential = store.get_credential(&id).await.unwrap().unwrap();
        assert_eq!(credential.endpoint.url, "https://new.example.com/hook");
        assert!(credential.endpoint.headers.is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_url() {
        let store = MetadataStore::new("sqlite::memory:").await.unwrap();
        let reg = registration("t1", "NONE");
        store.put_trigger(&reg.definition, None).await.unwrap();
        assert_eq!(store.list_all_triggers().await.unwrap().len(), 1);
    }
}
