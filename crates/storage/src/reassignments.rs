use chrono::{DateTime, Utc};
use sqlx::PgPool;
use ticketops_common::error::{Result, TicketOpsError};
use ticketops_common::types::{IncidentId, OperatorId, ReassignmentHistory, ReassignmentType};

pub struct NewReassignment {
    pub ticket_id: IncidentId,
    pub from_operator_id: Option<OperatorId>,
    pub to_operator_id: Option<OperatorId>,
    pub reason: String,
    pub reassignment_type: ReassignmentType,
    pub created_by: String,
    pub notification_sent: bool,
}

pub struct ReassignmentRepository {
    pool: PgPool,
}

impl ReassignmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, new: NewReassignment) -> Result<ReassignmentHistory> {
        let row = sqlx::query_as::<_, ReassignmentRow>(
            r#"
            INSERT INTO reassignment_history
                (ticket_id, from_operator_id, to_operator_id, reason, reassignment_type, created_at, created_by, notification_sent)
            VALUES ($1, $2, $3, $4, $5, now(), $6, $7)
            RETURNING *
            "#,
        )
        .bind(new.ticket_id)
        .bind(new.from_operator_id)
        .bind(new.to_operator_id)
        .bind(&new.reason)
        .bind(reassignment_type_to_str(new.reassignment_type))
        .bind(&new.created_by)
        .bind(new.notification_sent)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TicketOpsError::Database(e.to_string()))?;
        Ok(row.into())
    }

    pub async fn list_for_ticket(&self, ticket_id: IncidentId) -> Result<Vec<ReassignmentHistory>> {
        let rows = sqlx::query_as::<_, ReassignmentRow>(
            "SELECT * FROM reassignment_history WHERE ticket_id = $1 ORDER BY created_at ASC",
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TicketOpsError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

fn reassignment_type_to_str(t: ReassignmentType) -> &'static str {
    match t {
        ReassignmentType::AutoAssignment => "auto_assignment",
        ReassignmentType::SplynxSync => "splynx_sync",
        ReassignmentType::Manual => "manual",
        ReassignmentType::AutoUnassignAfterShift => "auto_unassign_after_shift",
        ReassignmentType::EndOfShift => "end_of_shift",
        ReassignmentType::Audit => "audit",
        ReassignmentType::ReopenReassignment => "reopen_reassignment",
    }
}

fn reassignment_type_from_str(s: &str) -> ReassignmentType {
    match s {
        "splynx_sync" => ReassignmentType::SplynxSync,
        "manual" => ReassignmentType::Manual,
        "auto_unassign_after_shift" => ReassignmentType::AutoUnassignAfterShift,
        "end_of_shift" => ReassignmentType::EndOfShift,
        "audit" => ReassignmentType::Audit,
        "reopen_reassignment" => ReassignmentType::ReopenReassignment,
        _ => ReassignmentType::AutoAssignment,
    }
}

#[derive(sqlx::FromRow)]
struct ReassignmentRow {
    id: i64,
    ticket_id: i64,
    from_operator_id: Option<i64>,
    to_operator_id: Option<i64>,
    reason: String,
    reassignment_type: String,
    created_at: DateTime<Utc>,
    created_by: String,
    notification_sent: bool,
}

impl From<ReassignmentRow> for ReassignmentHistory {
    fn from(row: ReassignmentRow) -> Self {
        ReassignmentHistory {
            id: row.id,
            ticket_id: row.ticket_id,
            from_operator_id: row.from_operator_id,
            to_operator_id: row.to_operator_id,
            reason: row.reason,
            reassignment_type: reassignment_type_from_str(&row.reassignment_type),
            created_at: row.created_at,
            created_by: row.created_by,
            notification_sent: row.notification_sent,
        }
    }
}
