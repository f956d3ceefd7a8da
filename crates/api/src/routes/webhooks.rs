//! The three inbound webhook endpoints of spec §6. Each does shape
//! validation only — the materialization pass (field mapping, filtering
//! on `motivo_contacto`, idempotent insert) is `WebhookIngester`'s job,
//! run later by the scheduler's `process_webhooks` cadence.
//!
//! Bodies are read as raw bytes and parsed by hand rather than through
//! axum's `Json` extractor, so a missing or malformed body yields the
//! same `400 {error}` shape as every other validation failure instead of
//! axum's default rejection body (mirrors the originating webhook's
//! `request.get_json(silent=True)` tolerance).

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;
use tracing::{instrument, warn};

use ticketops_common::types::WebhookKind;
use ticketops_storage::webhooks::NewWebhookRecord;

use crate::server::AppState;
use crate::types::{CierreTicketRequest, ErrorResponse, NuevoTicketRequest, WebhookAck};

fn parse_numero_ticket(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn bad_request(msg: &str) -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(msg)))
}

fn internal_error(msg: &str) -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse::new(msg)))
}

/// `POST /api/hooks/nuevo-ticket` (spec §6): `numero_ticket` must be
/// integer-parseable and `numero_cliente` must be present.
#[utoipa::path(
    post, path = "/api/hooks/nuevo-ticket", tag = "webhooks",
    request_body = NuevoTicketRequest,
    responses((status = 200, body = WebhookAck), (status = 400, body = ErrorResponse), (status = 500, body = ErrorResponse))
)]
#[instrument(skip(state, raw))]
pub async fn nuevo_ticket(
    State(state): State<AppState>,
    raw: Bytes,
) -> Result<Json<WebhookAck>, (StatusCode, Json<ErrorResponse>)> {
    let body: NuevoTicketRequest =
        serde_json::from_slice(&raw).map_err(|_| bad_request("Body JSON requerido"))?;

    let Some(numero_ticket) = parse_numero_ticket(&body.numero_ticket) else {
        warn!("nuevo-ticket: numero_ticket no numérico");
        return Err(bad_request("Campo numero_ticket debe ser numérico"));
    };

    let customer_ref = match &body.numero_cliente {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    };
    let Some(customer_ref) = customer_ref else {
        return Err(bad_request("Campo numero_cliente es requerido"));
    };

    let raw_payload: Option<Value> = serde_json::from_slice(&raw).ok();
    let record = NewWebhookRecord {
        kind: WebhookKind::New,
        numero_ticket,
        company: body.nombre_empresa.clone(),
        channel: body.canal_entrada.clone(),
        contact_reason: body.motivo_contacto.clone(),
        customer_ref: Some(customer_ref),
        phone: body.numero_whatsapp.clone(),
        user_name: body.nombre_usuario.clone(),
        created_at_raw: body.fecha_creado.clone(),
        closed_at_raw: None,
        raw_payload,
    };

    match state.ingestion.record_new(record).await {
        Ok(()) => Ok(Json(WebhookAck { ok: true, id: numero_ticket })),
        Err(err) => {
            warn!(error = %err, "failed to persist nuevo-ticket webhook");
            Err(internal_error("Error al guardar el registro"))
        }
    }
}

/// `POST /api/hooks/cierre-ticket` (spec §6). `numero_ticket` is required
/// here (unlike the originating webhook) because the reopen-window state
/// machine keys closure matching on it (`find_close_by_ticket_number`).
#[utoipa::path(
    post, path = "/api/hooks/cierre-ticket", tag = "webhooks",
    request_body = CierreTicketRequest,
    responses((status = 200, body = WebhookAck), (status = 400, body = ErrorResponse), (status = 500, body = ErrorResponse))
)]
#[instrument(skip(state, raw))]
pub async fn cierre_ticket(
    State(state): State<AppState>,
    raw: Bytes,
) -> Result<Json<WebhookAck>, (StatusCode, Json<ErrorResponse>)> {
    let body: CierreTicketRequest =
        serde_json::from_slice(&raw).map_err(|_| bad_request("Body JSON requerido"))?;

    let numero_ticket = body
        .numero_ticket
        .as_ref()
        .and_then(parse_numero_ticket)
        .ok_or_else(|| bad_request("Campo numero_ticket debe ser numérico"))?;

    let raw_payload: Option<Value> = serde_json::from_slice(&raw).ok();
    let record = NewWebhookRecord {
        kind: WebhookKind::Close,
        numero_ticket,
        company: body.nombre_empresa.clone(),
        channel: body.canal_entrada.clone(),
        contact_reason: body.motivo_contacto.clone(),
        customer_ref: body.numero_cliente.clone(),
        phone: body.numero_whatsapp.clone(),
        user_name: body.nombre_usuario.clone(),
        created_at_raw: body.fecha_creado.clone(),
        closed_at_raw: body.fecha_cerrado.clone(),
        raw_payload,
    };

    match state.ingestion.record_close(record).await {
        Ok(()) => Ok(Json(WebhookAck { ok: true, id: numero_ticket })),
        Err(err) => {
            warn!(error = %err, "failed to persist cierre-ticket webhook");
            Err(internal_error("Error al guardar el registro"))
        }
    }
}

/// `POST /api/hooks/splynx/ticket-update` (spec §6): arbitrary payload,
/// persisted for async processing only, no shape validation beyond
/// "is it JSON".
#[utoipa::path(
    post, path = "/api/hooks/splynx/ticket-update", tag = "webhooks",
    responses((status = 200, body = WebhookAck), (status = 400, body = ErrorResponse), (status = 500, body = ErrorResponse))
)]
#[instrument(skip(state, raw))]
pub async fn splynx_ticket_update(
    State(state): State<AppState>,
    raw: Bytes,
) -> Result<Json<WebhookAck>, (StatusCode, Json<ErrorResponse>)> {
    let data: Value = serde_json::from_slice(&raw).map_err(|_| bad_request("Body JSON requerido"))?;

    let ticket_id = data
        .get("ticket_id")
        .or_else(|| data.get("id"))
        .and_then(parse_numero_ticket)
        .unwrap_or(0);

    let record = NewWebhookRecord {
        kind: WebhookKind::Splynx,
        numero_ticket: ticket_id,
        company: None,
        channel: None,
        contact_reason: data.get("event_type").and_then(|v| v.as_str()).map(str::to_string),
        customer_ref: None,
        phone: None,
        user_name: None,
        created_at_raw: None,
        closed_at_raw: None,
        raw_payload: Some(data),
    };

    match state.ingestion.record_splynx_update(record).await {
        Ok(()) => Ok(Json(WebhookAck { ok: true, id: ticket_id })),
        Err(err) => {
            warn!(error = %err, "failed to persist splynx ticket-update webhook");
            Err(internal_error("Error al guardar el evento"))
        }
    }
}
