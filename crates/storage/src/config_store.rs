use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{instrument, warn};

use ticketops_common::config::{ConfigStore, ConfigValue};
use ticketops_common::error::{Result, TicketOpsError};

use crate::audit::{AuditRepository, NewAuditEntry};

/// Postgres-backed `ConfigStore` (spec §4.A). Caches previously read
/// values behind a single `RwLock`; any write invalidates the whole
/// cache rather than tracking per-key staleness (spec §5, "read-mostly,
/// single lock around writes").
pub struct PostgresConfigStore {
    pool: PgPool,
    cache: RwLock<HashMap<String, ConfigValue>>,
    audit: AuditRepository,
}

impl PostgresConfigStore {
    pub fn new(pool: PgPool) -> Self {
        let audit = AuditRepository::new(pool.clone());
        Self {
            pool,
            cache: RwLock::new(HashMap::new()),
            audit,
        }
    }
}

#[async_trait]
impl ConfigStore for PostgresConfigStore {
    #[instrument(skip(self))]
    async fn get_raw(&self, key: &str) -> Result<Option<ConfigValue>> {
        if let Some(cached) = self.cache.read().await.get(key) {
            return Ok(Some(cached.clone()));
        }

        let row = sqlx::query_as::<_, ConfigRow>(
            "SELECT value, value_type FROM config_entries WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TicketOpsError::Database(e.to_string()))?;

        let Some(row) = row else { return Ok(None) };
        let value = row.into_value()?;
        self.cache.write().await.insert(key.to_string(), value.clone());
        Ok(Some(value))
    }

    #[instrument(skip(self, value))]
    async fn set(
        &self,
        key: &str,
        value: ConfigValue,
        category: &str,
        updated_by: &str,
    ) -> Result<()> {
        let previous = self.get_raw(key).await.ok().flatten();
        let (value_str, value_type) = value_to_row(&value);

        sqlx::query(
            r#"
            INSERT INTO config_entries (key, value, value_type, category, updated_at, updated_by)
            VALUES ($1, $2, $3, $4, now(), $5)
            ON CONFLICT (key) DO UPDATE SET
                value = $2, value_type = $3, category = $4, updated_at = now(), updated_by = $5
            "#,
        )
        .bind(key)
        .bind(&value_str)
        .bind(value_type)
        .bind(category)
        .bind(updated_by)
        .execute(&self.pool)
        .await
        .map_err(|e| TicketOpsError::Database(e.to_string()))?;

        self.clear_cache().await;

        // Supplemented feature (SPEC_FULL §2): every config mutation is
        // recorded for the admin audit surface.
        if let Err(e) = self
            .audit
            .append(NewAuditEntry {
                action: "config_update",
                entity_type: "ConfigEntry",
                entity_id: key,
                old_value: previous.and_then(|v| v.as_str()).map(serde_json::Value::String),
                new_value: Some(serde_json::Value::String(value_str)),
                performed_by: updated_by,
                ip: None,
                notes: None,
            })
            .await
        {
            warn!(key, error = %e, "failed to record config mutation audit entry");
        }

        Ok(())
    }

    async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }
}

fn value_to_row(value: &ConfigValue) -> (String, &'static str) {
    match value {
        ConfigValue::Int(v) => (v.to_string(), "int"),
        ConfigValue::Bool(v) => (v.to_string(), "bool"),
        ConfigValue::Str(v) => (v.clone(), "string"),
        ConfigValue::Json(v) => (v.to_string(), "json"),
    }
}

#[derive(sqlx::FromRow)]
struct ConfigRow {
    value: String,
    value_type: String,
}

impl ConfigRow {
    fn into_value(self) -> Result<ConfigValue> {
        Ok(match self.value_type.as_str() {
            "int" => ConfigValue::Int(
                self.value
                    .parse()
                    .map_err(|_| TicketOpsError::Config(format!("malformed int config value: {}", self.value)))?,
            ),
            "bool" => ConfigValue::Bool(
                self.value
                    .parse()
                    .map_err(|_| TicketOpsError::Config(format!("malformed bool config value: {}", self.value)))?,
            ),
            "json" => ConfigValue::Json(serde_json::from_str(&self.value)?),
            _ => ConfigValue::Str(self.value),
        })
    }
}
