use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, info_span, instrument, warn};
use uuid::Uuid;

/// Request/response logging with a per-request correlation id, the same
/// shape the teacher's `middleware::logging` wraps every route in.
#[instrument(skip(request, next))]
pub async fn logging_middleware(mut request: Request, next: Next) -> Response {
    let start_time = Instant::now();
    let request_id = Uuid::new_v4().to_string();

    let method = request.method().clone();
    let uri = request.uri().clone();

    request.headers_mut().insert("x-request-id", request_id.parse().unwrap());

    let span = info_span!("http_request", request_id = %request_id, method = %method, uri = %uri);
    let response = span.in_scope(|| next.run(request)).await;

    let duration = start_time.elapsed();
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        warn!(request_id = %request_id, %status, duration_ms = duration.as_millis(), "request failed");
    } else {
        info!(request_id = %request_id, %status, duration_ms = duration.as_millis(), "request completed");
    }

    response
}
