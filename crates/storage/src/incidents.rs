use chrono::{DateTime, Utc};
use sqlx::PgPool;
use ticketops_common::error::{Result, TicketOpsError};
use ticketops_common::types::{AuditStatus, Incident, IncidentId, OperatorId, Priority};
use tracing::instrument;

/// Postgres error code for a unique-constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

/// Fields needed to insert a brand-new Incident (spec §4.F, projection step).
pub struct NewIncident {
    pub customer_ref: String,
    pub display_name: String,
    pub subject: String,
    pub created_at_raw: String,
    pub created_at: Option<DateTime<Utc>>,
    pub ingestion_ticket_number: Option<i64>,
}

/// Outcome of `IncidentRepository::create`, fulfilling the I1 idempotency
/// contract: a duplicate creation timestamp is a successful no-op, never
/// a propagated error (spec §4.E, §7).
pub enum CreateOutcome {
    Created(Incident),
    Duplicate,
}

pub struct IncidentRepository {
    pool: PgPool,
}

impl IncidentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self, new))]
    pub async fn create(&self, new: NewIncident) -> Result<CreateOutcome> {
        let result = sqlx::query_as::<_, IncidentRow>(
            r#"
            INSERT INTO incidents
                (customer_ref, display_name, subject, created_at_raw, created_at,
                 status_label, priority, is_created_remote, last_update, ingestion_ticket_number)
            VALUES ($1, $2, $3, $4, $5, 'PENDING', 'medium', FALSE, now(), $6)
            RETURNING *
            "#,
        )
        .bind(&new.customer_ref)
        .bind(&new.display_name)
        .bind(&new.subject)
        .bind(&new.created_at_raw)
        .bind(new.created_at)
        .bind(new.ingestion_ticket_number)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(CreateOutcome::Created(row.into())),
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                Ok(CreateOutcome::Duplicate)
            }
            Err(e) => Err(TicketOpsError::Database(e.to_string())),
        }
    }

    pub async fn get(&self, id: IncidentId) -> Result<Option<Incident>> {
        let row = sqlx::query_as::<_, IncidentRow>("SELECT * FROM incidents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TicketOpsError::Database(e.to_string()))?;
        Ok(row.map(Into::into))
    }

    pub async fn find_by_external_ticket_id(&self, external_id: &str) -> Result<Option<Incident>> {
        let row = sqlx::query_as::<_, IncidentRow>(
            "SELECT * FROM incidents WHERE external_ticket_id = $1",
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TicketOpsError::Database(e.to_string()))?;
        Ok(row.map(Into::into))
    }

    /// Incidents awaiting mirror creation on the remote platform (spec §4.F,
    /// second materialization pass).
    pub async fn list_unmirrored(&self) -> Result<Vec<Incident>> {
        let rows = sqlx::query_as::<_, IncidentRow>(
            "SELECT * FROM incidents WHERE is_created_remote = FALSE ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TicketOpsError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Open incidents with a mirrored ticket, the SyncWorker's scan set
    /// (spec §4.H).
    pub async fn list_open_with_external_id(&self) -> Result<Vec<Incident>> {
        let rows = sqlx::query_as::<_, IncidentRow>(
            "SELECT * FROM incidents WHERE is_closed = FALSE AND external_ticket_id IS NOT NULL ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TicketOpsError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Incidents currently inside the reopen window, the reopen checker's
    /// higher-frequency scan set (spec §4.H, step 4).
    pub async fn list_reopen_window_candidates(&self) -> Result<Vec<Incident>> {
        let rows = sqlx::query_as::<_, IncidentRow>(
            "SELECT * FROM incidents WHERE remote_closed_at IS NOT NULL AND is_closed = FALSE ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TicketOpsError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn list_open_by_operator(&self, person_id: OperatorId) -> Result<Vec<Incident>> {
        let rows = sqlx::query_as::<_, IncidentRow>(
            "SELECT * FROM incidents WHERE is_closed = FALSE AND assigned_to = $1 ORDER BY id ASC",
        )
        .bind(person_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TicketOpsError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Creates a minimal metric record for a remote ticket the local
    /// mirror never observed being created (spec §4.I, step 4: "create
    /// minimal metric record if absent").
    #[instrument(skip(self))]
    pub async fn ensure_minimal_for_alert(
        &self,
        external_ticket_id: &str,
        customer_ref: &str,
        subject: &str,
        assigned_to: Option<OperatorId>,
    ) -> Result<Incident> {
        if let Some(existing) = self.find_by_external_ticket_id(external_ticket_id).await? {
            return Ok(existing);
        }
        let row = sqlx::query_as::<_, IncidentRow>(
            r#"
            INSERT INTO incidents
                (customer_ref, display_name, subject, created_at_raw, created_at,
                 external_ticket_id, status_label, priority, is_created_remote,
                 assigned_to, last_update)
            VALUES ($1, $1, $2, now()::text, now(), $3, 'PENDING', 'medium', TRUE, $4, now())
            RETURNING *
            "#,
        )
        .bind(customer_ref)
        .bind(subject)
        .bind(external_ticket_id)
        .bind(assigned_to)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TicketOpsError::Database(e.to_string()))?;
        Ok(row.into())
    }

    /// Full-row replacement of the mutable fields, used after a worker
    /// mutates an in-memory `Incident` (sync, escalation, shift-lifecycle).
    #[instrument(skip(self, incident))]
    pub async fn update(&self, incident: &Incident) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE incidents SET
                external_ticket_id = $2,
                status_label = $3,
                priority = $4,
                is_created_remote = $5,
                assigned_to = $6,
                closed_at = $7,
                is_closed = $8,
                last_update = $9,
                exceeded_threshold = $10,
                response_time_minutes = $11,
                first_alert_sent_at = $12,
                last_alert_sent_at = $13,
                pre_alert_sent_at = $14,
                resolution_time_minutes = $15,
                alert_count = $16,
                remote_closed_at = $17,
                recreado = $18,
                audit_requested = $19,
                audit_status = $20,
                audit_requested_at = $21,
                audit_requested_by = $22,
                audit_reviewed_at = $23,
                audit_reviewed_by = $24,
                audit_notified = $25
            WHERE id = $1
            "#,
        )
        .bind(incident.id)
        .bind(&incident.external_ticket_id)
        .bind(&incident.status_label)
        .bind(priority_to_str(incident.priority))
        .bind(incident.is_created_remote)
        .bind(incident.assigned_to)
        .bind(incident.closed_at)
        .bind(incident.is_closed)
        .bind(incident.last_update)
        .bind(incident.exceeded_threshold)
        .bind(incident.response_time_minutes)
        .bind(incident.first_alert_sent_at)
        .bind(incident.last_alert_sent_at)
        .bind(incident.pre_alert_sent_at)
        .bind(incident.resolution_time_minutes)
        .bind(incident.alert_count)
        .bind(incident.remote_closed_at)
        .bind(incident.recreado)
        .bind(incident.audit_requested)
        .bind(incident.audit_status.map(audit_status_to_str))
        .bind(incident.audit_requested_at)
        .bind(&incident.audit_requested_by)
        .bind(incident.audit_reviewed_at)
        .bind(&incident.audit_reviewed_by)
        .bind(incident.audit_notified)
        .execute(&self.pool)
        .await
        .map_err(|e| TicketOpsError::Database(e.to_string()))?;
        Ok(())
    }
}

fn priority_to_str(p: Priority) -> &'static str {
    match p {
        Priority::Low => "low",
        Priority::Medium => "medium",
        Priority::High => "high",
        Priority::Urgent => "urgent",
    }
}

fn audit_status_to_str(s: AuditStatus) -> &'static str {
    match s {
        AuditStatus::Pending => "pending",
        AuditStatus::Approved => "approved",
        AuditStatus::Rejected => "rejected",
    }
}

#[derive(sqlx::FromRow)]
struct IncidentRow {
    id: i64,
    customer_ref: String,
    display_name: String,
    subject: String,
    created_at_raw: String,
    created_at: Option<DateTime<Utc>>,
    external_ticket_id: Option<String>,
    status_label: String,
    priority: String,
    is_created_remote: bool,
    assigned_to: Option<i64>,
    closed_at: Option<DateTime<Utc>>,
    is_closed: bool,
    last_update: DateTime<Utc>,
    ingestion_ticket_number: Option<i64>,
    exceeded_threshold: bool,
    response_time_minutes: Option<i64>,
    first_alert_sent_at: Option<DateTime<Utc>>,
    last_alert_sent_at: Option<DateTime<Utc>>,
    pre_alert_sent_at: Option<DateTime<Utc>>,
    resolution_time_minutes: Option<i64>,
    alert_count: i32,
    remote_closed_at: Option<DateTime<Utc>>,
    recreado: i32,
    audit_requested: bool,
    audit_status: Option<String>,
    audit_requested_at: Option<DateTime<Utc>>,
    audit_requested_by: Option<String>,
    audit_reviewed_at: Option<DateTime<Utc>>,
    audit_reviewed_by: Option<String>,
    audit_notified: bool,
}

impl From<IncidentRow> for Incident {
    fn from(row: IncidentRow) -> Self {
        Incident {
            id: row.id,
            customer_ref: row.customer_ref,
            display_name: row.display_name,
            subject: row.subject,
            created_at_raw: row.created_at_raw,
            created_at: row.created_at,
            external_ticket_id: row.external_ticket_id,
            status_label: row.status_label,
            priority: match row.priority.as_str() {
                "low" => Priority::Low,
                "high" => Priority::High,
                "urgent" => Priority::Urgent,
                _ => Priority::Medium,
            },
            is_created_remote: row.is_created_remote,
            assigned_to: row.assigned_to,
            closed_at: row.closed_at,
            is_closed: row.is_closed,
            last_update: row.last_update,
            ingestion_ticket_number: row.ingestion_ticket_number,
            exceeded_threshold: row.exceeded_threshold,
            response_time_minutes: row.response_time_minutes,
            first_alert_sent_at: row.first_alert_sent_at,
            last_alert_sent_at: row.last_alert_sent_at,
            pre_alert_sent_at: row.pre_alert_sent_at,
            resolution_time_minutes: row.resolution_time_minutes,
            alert_count: row.alert_count,
            remote_closed_at: row.remote_closed_at,
            recreado: row.recreado,
            audit_requested: row.audit_requested,
            audit_status: row.audit_status.map(|s| match s.as_str() {
                "approved" => AuditStatus::Approved,
                "rejected" => AuditStatus::Rejected,
                _ => AuditStatus::Pending,
            }),
            audit_requested_at: row.audit_requested_at,
            audit_requested_by: row.audit_requested_by,
            audit_reviewed_at: row.audit_reviewed_at,
            audit_reviewed_by: row.audit_reviewed_by,
            audit_notified: row.audit_notified,
        }
    }
}
