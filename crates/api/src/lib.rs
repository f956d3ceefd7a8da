//! Inbound HTTP surface (spec §6): three webhook endpoints, seven
//! trigger-only endpoints that invoke a worker's `run_once` out of
//! cadence, and the admin pause/resume/status surface.
//!
//! ```text
//! POST /api/hooks/nuevo-ticket                <- new-ticket webhook
//! POST /api/hooks/cierre-ticket                <- closure webhook
//! POST /api/hooks/splynx/ticket-update          <- Splynx event, raw persist
//! POST /api/tickets/{job}                      <- manual job trigger
//! GET  /api/system/status                      <- pause state
//! POST /api/system/pause | /api/system/resume
//! GET  /health
//! GET  /docs, /api-doc/openapi.json            <- utoipa Swagger UI
//! ```

pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod types;

pub use server::{build_router, AppState};
