//! OpenAPI specification (spec §6 external interfaces), generated from
//! route handlers and DTOs with `utoipa`, served via Swagger UI at
//! `/docs` the way the teacher's `crates/api::openapi` wires its own
//! `ApiDoc`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ticket Orchestration Engine API",
        description = "Inbound webhook ingestion, manual job triggers, and the admin pause surface for the ISP support-ticket orchestration engine.",
        version = "0.1.0"
    ),
    paths(
        crate::routes::health::health_check,
        crate::routes::webhooks::nuevo_ticket,
        crate::routes::webhooks::cierre_ticket,
        crate::routes::webhooks::splynx_ticket_update,
        crate::routes::triggers::trigger_job,
        crate::routes::admin::system_status,
        crate::routes::admin::pause,
        crate::routes::admin::resume,
    ),
    components(schemas(
        crate::types::NuevoTicketRequest,
        crate::types::CierreTicketRequest,
        crate::types::WebhookAck,
        crate::types::TriggerResponse,
        crate::types::ErrorResponse,
        crate::types::HealthResponse,
        crate::types::SystemStatusResponse,
        crate::types::PauseRequest,
        crate::types::ResumeRequest,
    )),
    tags(
        (name = "webhooks", description = "Inbound ticket webhooks"),
        (name = "triggers", description = "Manual out-of-cadence job triggers"),
        (name = "admin", description = "Global pause/resume and status"),
        (name = "health", description = "Liveness check")
    )
)]
pub struct ApiDoc;
