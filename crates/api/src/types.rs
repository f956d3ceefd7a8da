//! Request/response DTOs for the inbound HTTP surface (spec §6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// `POST /api/hooks/nuevo-ticket` body. Field names mirror the originating
/// webhook payload verbatim (spec §6); only `numero_ticket` and
/// `numero_cliente` are required.
#[derive(Debug, Deserialize, ToSchema)]
pub struct NuevoTicketRequest {
    pub numero_ticket: Value,
    pub numero_cliente: Value,
    pub nombre_empresa: Option<String>,
    pub fecha_creado: Option<String>,
    pub departamento: Option<String>,
    pub canal_entrada: Option<String>,
    pub motivo_contacto: Option<String>,
    pub numero_whatsapp: Option<String>,
    pub nombre_usuario: Option<String>,
}

/// `POST /api/hooks/cierre-ticket` body (spec §6). No fields are required
/// beyond a parseable JSON body; `numero_ticket` absence is tolerated the
/// way the originating webhook tolerates it.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CierreTicketRequest {
    pub numero_ticket: Option<Value>,
    pub nombre_empresa: Option<String>,
    pub fecha_creado: Option<String>,
    pub fecha_cerrado: Option<String>,
    pub asignado: Option<String>,
    pub descripcion_cierre: Option<String>,
    pub motivo: Option<String>,
    pub departamento: Option<String>,
    pub canal_entrada: Option<String>,
    pub motivo_contacto: Option<String>,
    pub numero_cliente: Option<String>,
    pub numero_whatsapp: Option<String>,
    pub nombre_usuario: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub ok: bool,
    pub id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TriggerResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into(), details: None }
    }

    pub fn with_details(error: impl Into<String>, details: Value) -> Self {
        Self { error: error.into(), details: Some(details) }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// `GET /api/system/status` response, mirroring the on-disk pause-state
/// shape of spec §6 so the admin surface and the disk cache agree.
#[derive(Debug, Serialize, ToSchema)]
pub struct SystemStatusResponse {
    pub paused: bool,
    pub paused_at: Option<DateTime<Utc>>,
    pub paused_by: Option<String>,
    pub reason: Option<String>,
    pub resumed_at: Option<DateTime<Utc>>,
    pub resumed_by: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PauseRequest {
    pub actor: String,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResumeRequest {
    pub actor: String,
}
