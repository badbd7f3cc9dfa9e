use super::request_id::request_id;
use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::info;

/// One structured line per request; uploads also carry the declared body size.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let route = req.uri().path().to_string();
    let request_id = request_id(req.headers()).to_string();
    let body_bytes = req
        .headers()
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);

    let response = next.run(req).await;

    info!(
        target: "metrics",
        request_id = %request_id,
        method = %method,
        route = %route,
        status = response.status().as_u16(),
        body_bytes,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "relay_request_completed"
    );

    response
}
