use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use ticketops_common::error::{Result, TicketOpsError};
use ticketops_common::types::{WebhookKind, WebhookRecord};
use tracing::instrument;

pub struct NewWebhookRecord {
    pub kind: WebhookKind,
    pub numero_ticket: i64,
    pub company: Option<String>,
    pub channel: Option<String>,
    pub contact_reason: Option<String>,
    pub customer_ref: Option<String>,
    pub phone: Option<String>,
    pub user_name: Option<String>,
    pub created_at_raw: Option<String>,
    pub closed_at_raw: Option<String>,
    pub raw_payload: Option<Value>,
}

pub struct WebhookRepository {
    pool: PgPool,
}

impl WebhookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self, new))]
    pub async fn record(&self, new: NewWebhookRecord) -> Result<WebhookRecord> {
        let row = sqlx::query_as::<_, WebhookRow>(
            r#"
            INSERT INTO webhook_records
                (kind, numero_ticket, company, channel, contact_reason, customer_ref,
                 phone, user_name, created_at_raw, closed_at_raw, raw_payload, received_at, processed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, now(), FALSE)
            RETURNING *
            "#,
        )
        .bind(kind_to_str(new.kind))
        .bind(new.numero_ticket)
        .bind(new.company)
        .bind(new.channel)
        .bind(new.contact_reason)
        .bind(new.customer_ref)
        .bind(new.phone)
        .bind(new.user_name)
        .bind(new.created_at_raw)
        .bind(new.closed_at_raw)
        .bind(new.raw_payload)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TicketOpsError::Database(e.to_string()))?;
        Ok(row.into())
    }

    /// Unprocessed records of a given kind, FIFO by `received_at` (spec §5).
    pub async fn list_unprocessed(&self, kind: WebhookKind) -> Result<Vec<WebhookRecord>> {
        let rows = sqlx::query_as::<_, WebhookRow>(
            "SELECT * FROM webhook_records WHERE kind = $1 AND processed = FALSE ORDER BY received_at ASC",
        )
        .bind(kind_to_str(kind))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TicketOpsError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Looks up a closure record matching an ingestion ticket number, used
    /// by the SyncWorker to decide whether a remote closure is final
    /// (spec §4.H, step 4).
    pub async fn find_close_by_ticket_number(&self, numero_ticket: i64) -> Result<Option<WebhookRecord>> {
        let row = sqlx::query_as::<_, WebhookRow>(
            "SELECT * FROM webhook_records WHERE kind = 'close' AND numero_ticket = $1 ORDER BY received_at DESC LIMIT 1",
        )
        .bind(numero_ticket)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TicketOpsError::Database(e.to_string()))?;
        Ok(row.map(Into::into))
    }

    pub async fn mark_processed(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE webhook_records SET processed = TRUE, processed_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| TicketOpsError::Database(e.to_string()))?;
        Ok(())
    }
}

fn kind_to_str(kind: WebhookKind) -> &'static str {
    match kind {
        WebhookKind::New => "new",
        WebhookKind::Close => "close",
        WebhookKind::Splynx => "splynx",
    }
}

fn kind_from_str(s: &str) -> WebhookKind {
    match s {
        "close" => WebhookKind::Close,
        "splynx" => WebhookKind::Splynx,
        _ => WebhookKind::New,
    }
}

#[derive(sqlx::FromRow)]
struct WebhookRow {
    id: i64,
    kind: String,
    numero_ticket: i64,
    company: Option<String>,
    channel: Option<String>,
    contact_reason: Option<String>,
    customer_ref: Option<String>,
    phone: Option<String>,
    user_name: Option<String>,
    created_at_raw: Option<String>,
    closed_at_raw: Option<String>,
    raw_payload: Option<Value>,
    received_at: DateTime<Utc>,
    processed: bool,
    processed_at: Option<DateTime<Utc>>,
}

impl From<WebhookRow> for WebhookRecord {
    fn from(row: WebhookRow) -> Self {
        WebhookRecord {
            id: row.id,
            kind: kind_from_str(&row.kind),
            numero_ticket: row.numero_ticket,
            company: row.company,
            channel: row.channel,
            contact_reason: row.contact_reason,
            customer_ref: row.customer_ref,
            phone: row.phone,
            user_name: row.user_name,
            created_at_raw: row.created_at_raw,
            closed_at_raw: row.closed_at_raw,
            raw_payload: row.raw_payload,
            received_at: row.received_at,
            processed: row.processed,
            processed_at: row.processed_at,
        }
    }
}
