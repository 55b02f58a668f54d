//! Public submission and health handlers.

use axum::{
    body::Body,
    extract::{ConnectInfo, Path, State},
    http::{header, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::net::SocketAddr;
use std::time::Instant;

use crate::http::request::{client_address, request_id};
use crate::http::response::ResponseDescriptor;
use crate::http::server::AppState;
use crate::intake::IntakeRequest;

fn header_text(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// `POST {prefix}/{public_id}`
pub async fn submit_handler(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
    request: Request<Body>,
) -> Response {
    let received_at = Instant::now();
    let (parts, body) = request.into_parts();
    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let config = state.config.load_full();
    let client = client_address(&parts.headers, peer, config.security.trust_forwarded_for);

    tracing::debug!(
        request_id = %request_id(&parts.headers),
        form = %public_id,
        client = %client,
        "Submission received"
    );

    // The body limit layer caps the size; this only fails on oversize or broken streams.
    let body = match axum::body::to_bytes(body, config.security.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(form = %public_id, error = %e, "Failed to read submission body");
            return ResponseDescriptor::error(
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body too large",
                HeaderMap::new(),
            )
            .into_response();
        }
    };

    let intake = IntakeRequest {
        public_id,
        origin: header_text(&parts.headers, header::ORIGIN),
        accept: header_text(&parts.headers, header::ACCEPT),
        content_type: header_text(&parts.headers, header::CONTENT_TYPE),
        client_address: client,
        body,
        received_at,
    };

    state.intake.submit(intake).await.into_response()
}

/// `OPTIONS {prefix}/{public_id}`
pub async fn preflight_handler(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let origin = header_text(&headers, header::ORIGIN);
    state
        .intake
        .preflight(&public_id, origin.as_deref())
        .into_response()
}

/// `GET /health`
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "app": "FormForge",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
