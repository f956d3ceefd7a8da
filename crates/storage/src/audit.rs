use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use ticketops_common::error::{Result, TicketOpsError};
use ticketops_common::types::AuditEntry;
use tracing::instrument;

pub struct NewAuditEntry<'a> {
    pub action: &'a str,
    pub entity_type: &'a str,
    pub entity_id: &'a str,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub performed_by: &'a str,
    pub ip: Option<&'a str>,
    pub notes: Option<&'a str>,
}

pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self, new))]
    pub async fn append(&self, new: NewAuditEntry<'_>) -> Result<AuditEntry> {
        let row = sqlx::query_as::<_, AuditRow>(
            r#"
            INSERT INTO audit_entries
                (action, entity_type, entity_id, old_value, new_value, performed_by, ip, performed_at, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, now(), $8)
            RETURNING *
            "#,
        )
        .bind(new.action)
        .bind(new.entity_type)
        .bind(new.entity_id)
        .bind(new.old_value)
        .bind(new.new_value)
        .bind(new.performed_by)
        .bind(new.ip)
        .bind(new.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TicketOpsError::Database(e.to_string()))?;
        Ok(row.into())
    }

    pub async fn list_recent(&self, limit: i64, offset: i64) -> Result<Vec<AuditEntry>> {
        let rows = sqlx::query_as::<_, AuditRow>(
            "SELECT * FROM audit_entries ORDER BY performed_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TicketOpsError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: i64,
    action: String,
    entity_type: String,
    entity_id: String,
    old_value: Option<Value>,
    new_value: Option<Value>,
    performed_by: String,
    ip: Option<String>,
    performed_at: DateTime<Utc>,
    notes: Option<String>,
}

impl From<AuditRow> for AuditEntry {
    fn from(row: AuditRow) -> Self {
        AuditEntry {
            id: row.id,
            action: row.action,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            old_value: row.old_value,
            new_value: row.new_value,
            performed_by: row.performed_by,
            ip: row.ip,
            performed_at: row.performed_at,
            notes: row.notes,
        }
    }
}
