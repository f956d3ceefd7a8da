//! `POST /api/tickets/{job}` (spec §6): manual, out-of-cadence invocation
//! of a single worker pass. Used by operators and by the scheduler's own
//! cadence table indirectly (the scheduler calls the same worker methods
//! directly rather than looping back through HTTP).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::{error, info, instrument};

use crate::server::AppState;
use crate::types::{ErrorResponse, TriggerResponse};

#[utoipa::path(
    post, path = "/api/tickets/{job}", tag = "triggers",
    params(("job" = String, Path, description = "one of process_webhooks, assign_unassigned, alert_overdue, end_of_shift_notifications, auto_unassign_after_shift, sync_status, import_existing")),
    responses((status = 200, body = TriggerResponse), (status = 404, body = ErrorResponse))
)]
#[instrument(skip(state))]
pub async fn trigger_job(
    State(state): State<AppState>,
    Path(job): Path<String>,
) -> Result<Json<TriggerResponse>, (StatusCode, Json<ErrorResponse>)> {
    match job.as_str() {
        "process_webhooks" => {
            let ingestion = state.ingestion.clone();
            tokio::spawn(async move {
                if let Err(err) = ingestion.materialize_incidents().await {
                    error!(error = %err, job = "process_webhooks", "materialization failed");
                }
                if let Err(err) = ingestion.mirror_unmirrored().await {
                    error!(error = %err, job = "process_webhooks", "mirror failed");
                }
            });
        }
        "assign_unassigned" => {
            let ingestion = state.ingestion.clone();
            let group_id = state.support_group_id.clone();
            tokio::spawn(async move {
                match ingestion.assign_unassigned_remote(&group_id).await {
                    Ok(count) => info!(assigned = count, job = "assign_unassigned", "completed"),
                    Err(err) => error!(error = %err, job = "assign_unassigned", "failed"),
                }
            });
        }
        "alert_overdue" => {
            let escalation = state.escalation.clone();
            tokio::spawn(async move {
                if let Err(err) = escalation.run_once().await {
                    error!(error = %err, job = "alert_overdue", "failed");
                }
            });
        }
        "end_of_shift_notifications" => {
            let shift = state.shift.clone();
            tokio::spawn(async move {
                if let Err(err) = shift.send_end_of_shift_summaries().await {
                    error!(error = %err, job = "end_of_shift_notifications", "failed");
                }
            });
        }
        "auto_unassign_after_shift" => {
            let shift = state.shift.clone();
            tokio::spawn(async move {
                if let Err(err) = shift.auto_unassign_after_shift().await {
                    error!(error = %err, job = "auto_unassign_after_shift", "failed");
                }
            });
        }
        "sync_status" => {
            let sync = state.sync.clone();
            tokio::spawn(async move {
                if let Err(err) = sync.run_once().await {
                    error!(error = %err, job = "sync_status", "failed");
                }
            });
        }
        "import_existing" => {
            let ingestion = state.ingestion.clone();
            let group_id = state.support_group_id.clone();
            tokio::spawn(async move {
                match ingestion.import_existing_tickets(&group_id).await {
                    Ok(summary) => info!(?summary, job = "import_existing", "completed"),
                    Err(err) => error!(error = %err, job = "import_existing", "failed"),
                }
            });
        }
        other => {
            return Err((StatusCode::NOT_FOUND, Json(ErrorResponse::new(format!("unknown job: {other}")))));
        }
    }

    Ok(Json(TriggerResponse { success: true }))
}
