use chrono::{DateTime, Utc};
use sqlx::PgPool;
use ticketops_common::error::{Result, TicketOpsError};
use ticketops_common::types::{OperatorConfig, OperatorId, OperatorSchedule, ScheduleType};

pub struct OperatorRepository {
    pool: PgPool,
}

impl OperatorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_all(&self) -> Result<Vec<OperatorConfig>> {
        let rows = sqlx::query_as::<_, OperatorRow>("SELECT * FROM operator_configs ORDER BY person_id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TicketOpsError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get(&self, person_id: OperatorId) -> Result<Option<OperatorConfig>> {
        let row = sqlx::query_as::<_, OperatorRow>("SELECT * FROM operator_configs WHERE person_id = $1")
            .bind(person_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TicketOpsError::Database(e.to_string()))?;
        Ok(row.map(Into::into))
    }

    pub async fn set_assignment_paused(&self, person_id: OperatorId, paused: bool) -> Result<()> {
        sqlx::query("UPDATE operator_configs SET assignment_paused = $2 WHERE person_id = $1")
            .bind(person_id)
            .bind(paused)
            .execute(&self.pool)
            .await
            .map_err(|e| TicketOpsError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn set_paused(&self, person_id: OperatorId, paused: bool, reason: Option<&str>) -> Result<()> {
        sqlx::query(
            "UPDATE operator_configs SET is_paused = $2, paused_at = CASE WHEN $2 THEN now() ELSE NULL END, paused_reason = $3 WHERE person_id = $1",
        )
        .bind(person_id)
        .bind(paused)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(|e| TicketOpsError::Database(e.to_string()))?;
        Ok(())
    }

    /// Schedules of a given type covering `weekday`/`minute_of_day`, used
    /// by `Clock::schedule_contains` (spec §4.B) and the shift-lifecycle
    /// worker (spec §4.J).
    pub async fn schedules_of_type(&self, schedule_type: ScheduleType) -> Result<Vec<OperatorSchedule>> {
        let rows = sqlx::query_as::<_, ScheduleRow>(
            "SELECT * FROM operator_schedules WHERE schedule_type = $1 ORDER BY person_id ASC",
        )
        .bind(schedule_type_to_str(schedule_type))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TicketOpsError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn schedules_for_operator(
        &self,
        person_id: OperatorId,
        schedule_type: ScheduleType,
    ) -> Result<Vec<OperatorSchedule>> {
        let rows = sqlx::query_as::<_, ScheduleRow>(
            "SELECT * FROM operator_schedules WHERE person_id = $1 AND schedule_type = $2 ORDER BY day_of_week ASC",
        )
        .bind(person_id)
        .bind(schedule_type_to_str(schedule_type))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TicketOpsError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

fn schedule_type_to_str(t: ScheduleType) -> &'static str {
    match t {
        ScheduleType::Work => "work",
        ScheduleType::Assignment => "assignment",
        ScheduleType::Alert => "alert",
    }
}

fn schedule_type_from_str(s: &str) -> ScheduleType {
    match s {
        "assignment" => ScheduleType::Assignment,
        "alert" => ScheduleType::Alert,
        _ => ScheduleType::Work,
    }
}

#[derive(sqlx::FromRow)]
struct OperatorRow {
    person_id: i64,
    name: String,
    whatsapp_number: Option<String>,
    is_active: bool,
    is_paused: bool,
    assignment_paused: bool,
    notifications_enabled: bool,
    paused_at: Option<DateTime<Utc>>,
    paused_reason: Option<String>,
}

impl From<OperatorRow> for OperatorConfig {
    fn from(row: OperatorRow) -> Self {
        OperatorConfig {
            person_id: row.person_id,
            name: row.name,
            whatsapp_number: row.whatsapp_number,
            is_active: row.is_active,
            is_paused: row.is_paused,
            assignment_paused: row.assignment_paused,
            notifications_enabled: row.notifications_enabled,
            paused_at: row.paused_at,
            paused_reason: row.paused_reason,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ScheduleRow {
    #[allow(dead_code)]
    id: i64,
    person_id: i64,
    day_of_week: i16,
    start_minute: i32,
    end_minute: i32,
    schedule_type: String,
}

impl From<ScheduleRow> for OperatorSchedule {
    fn from(row: ScheduleRow) -> Self {
        OperatorSchedule {
            person_id: row.person_id,
            day_of_week: row.day_of_week as u8,
            start_minute: row.start_minute as u16,
            end_minute: row.end_minute as u16,
            schedule_type: schedule_type_from_str(&row.schedule_type),
        }
    }
}
