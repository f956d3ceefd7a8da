use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use ticketops_common::config::ConfigStore;
use ticketops_ingestion::WebhookIngester;
use ticketops_workers::{EscalationWorker, ShiftLifecycleWorker, SyncWorker};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi as _;

use crate::routes;

/// Shared handles every route needs (teacher precedent: `routes::execute::AppState`
/// holding an `Arc<OrchestratorSystem>`). Cloned per request by axum's
/// `State` extractor, cheap since every field is an `Arc` or owned `String`/`PathBuf`.
#[derive(Clone)]
pub struct AppState {
    pub ingestion: Arc<WebhookIngester>,
    pub sync: Arc<SyncWorker>,
    pub escalation: Arc<EscalationWorker>,
    pub shift: Arc<ShiftLifecycleWorker>,
    pub config: Arc<dyn ConfigStore>,
    pub pause_state_path: PathBuf,
    pub support_group_id: String,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/hooks/nuevo-ticket", post(routes::webhooks::nuevo_ticket))
        .route("/api/hooks/cierre-ticket", post(routes::webhooks::cierre_ticket))
        .route("/api/hooks/splynx/ticket-update", post(routes::webhooks::splynx_ticket_update))
        .route("/api/tickets/:job", post(routes::triggers::trigger_job))
        .route("/api/system/status", get(routes::admin::system_status))
        .route("/api/system/pause", post(routes::admin::pause))
        .route("/api/system/resume", post(routes::admin::resume))
        .merge(utoipa_swagger_ui::SwaggerUi::new("/docs").url("/api-doc/openapi.json", crate::openapi::ApiDoc::openapi()))
        .layer(axum::middleware::from_fn(crate::middleware::logging::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
