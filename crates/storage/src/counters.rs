use chrono::{DateTime, Utc};
use sqlx::PgPool;
use ticketops_common::error::{Result, TicketOpsError};
use ticketops_common::types::{AssignmentCounter, OperatorId};
use tracing::instrument;

pub struct CounterRepository {
    pool: PgPool,
}

impl CounterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_all(&self) -> Result<Vec<AssignmentCounter>> {
        let rows = sqlx::query_as::<_, CounterRow>("SELECT * FROM assignment_counters ORDER BY person_id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TicketOpsError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Increments under `SELECT ... FOR UPDATE` so concurrent
    /// `assign_unassigned` runs serialize per operator (spec §5, I-3).
    /// A failed commit (the caller's remote call errored) must never
    /// reach this method — counters only move on confirmed success.
    #[instrument(skip(self))]
    pub async fn commit(&self, person_id: OperatorId) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| TicketOpsError::Database(e.to_string()))?;

        sqlx::query("SELECT person_id FROM assignment_counters WHERE person_id = $1 FOR UPDATE")
            .bind(person_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| TicketOpsError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO assignment_counters (person_id, ticket_count, last_assigned)
            VALUES ($1, 1, now())
            ON CONFLICT (person_id) DO UPDATE SET
                ticket_count = assignment_counters.ticket_count + 1,
                last_assigned = now()
            "#,
        )
        .bind(person_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| TicketOpsError::Database(e.to_string()))?;

        tx.commit().await.map_err(|e| TicketOpsError::Database(e.to_string()))?;
        Ok(())
    }

    /// Resets every counter to zero in a single transaction (spec §4.K,
    /// `reset_assignment_counters` job; S6).
    #[instrument(skip(self))]
    pub async fn reset_all(&self) -> Result<()> {
        sqlx::query("UPDATE assignment_counters SET ticket_count = 0")
            .execute(&self.pool)
            .await
            .map_err(|e| TicketOpsError::Database(e.to_string()))?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct CounterRow {
    person_id: i64,
    ticket_count: i64,
    last_assigned: Option<DateTime<Utc>>,
}

impl From<CounterRow> for AssignmentCounter {
    fn from(row: CounterRow) -> Self {
        AssignmentCounter {
            person_id: row.person_id,
            ticket_count: row.ticket_count,
            last_assigned: row.last_assigned,
        }
    }
}
