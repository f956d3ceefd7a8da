//! Admin pause surface (spec §4.A, §6). Pausing writes both the
//! `ConfigStore`'s `SYSTEM_PAUSED` row (the source of truth every worker
//! actually reads) and the on-disk `PauseState` file (a fast-path cache
//! for a process that hasn't read the config yet).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::instrument;

use ticketops_common::config::{keys, ConfigValue};
use ticketops_scheduler::PauseState;

use crate::server::AppState;
use crate::types::{ErrorResponse, PauseRequest, ResumeRequest, SystemStatusResponse, TriggerResponse};

#[utoipa::path(get, path = "/api/system/status", tag = "admin", responses((status = 200, body = SystemStatusResponse)))]
#[instrument(skip(state))]
pub async fn system_status(State(state): State<AppState>) -> Json<SystemStatusResponse> {
    if let Some(cached) = PauseState::read(&state.pause_state_path) {
        return Json(SystemStatusResponse {
            paused: cached.paused,
            paused_at: cached.paused_at,
            paused_by: cached.paused_by,
            reason: cached.reason,
            resumed_at: cached.resumed_at,
            resumed_by: cached.resumed_by,
        });
    }

    let paused = state.config.get_bool(keys::SYSTEM_PAUSED, ticketops_common::config::defaults::SYSTEM_PAUSED).await;
    Json(SystemStatusResponse { paused, paused_at: None, paused_by: None, reason: None, resumed_at: None, resumed_by: None })
}

#[utoipa::path(
    post, path = "/api/system/pause", tag = "admin",
    request_body = PauseRequest,
    responses((status = 200, body = TriggerResponse), (status = 500, body = ErrorResponse))
)]
#[instrument(skip(state, req))]
pub async fn pause(
    State(state): State<AppState>,
    Json(req): Json<PauseRequest>,
) -> Result<Json<TriggerResponse>, (StatusCode, Json<ErrorResponse>)> {
    state
        .config
        .set(keys::SYSTEM_PAUSED, ConfigValue::Bool(true), "system", &req.actor)
        .await
        .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse::new("failed to persist pause state"))))?;

    let state_file = PauseState::paused(req.actor, req.reason, chrono::Utc::now());
    if let Err(err) = state_file.write(&state.pause_state_path) {
        tracing::warn!(error = %err, "failed to write pause-state cache file");
    }

    Ok(Json(TriggerResponse { success: true }))
}

#[utoipa::path(
    post, path = "/api/system/resume", tag = "admin",
    request_body = ResumeRequest,
    responses((status = 200, body = TriggerResponse), (status = 500, body = ErrorResponse))
)]
#[instrument(skip(state, req))]
pub async fn resume(
    State(state): State<AppState>,
    Json(req): Json<ResumeRequest>,
) -> Result<Json<TriggerResponse>, (StatusCode, Json<ErrorResponse>)> {
    state
        .config
        .set(keys::SYSTEM_PAUSED, ConfigValue::Bool(false), "system", &req.actor)
        .await
        .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse::new("failed to persist pause state"))))?;

    let state_file = PauseState::resumed(req.actor, chrono::Utc::now());
    if let Err(err) = state_file.write(&state.pause_state_path) {
        tracing::warn!(error = %err, "failed to write pause-state cache file");
    }

    Ok(Json(TriggerResponse { success: true }))
}
