//! Request identification and client addressing.
//!
//! # Responsibilities
//! - Generate a UUID v4 request ID when the client did not send one
//! - Resolve the best-effort client address used as the rate-limit key
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - `X-Forwarded-For` is only honored when configured as trusted

use axum::http::{HeaderMap, Request};
use std::net::SocketAddr;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Client address used when nothing better is known.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Generates `x-request-id` values for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        Uuid::new_v4().to_string().parse().ok().map(RequestId::new)
    }
}

/// Request ID of an in-flight request, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(UNKNOWN_CLIENT)
}

/// Resolve the client address: first `X-Forwarded-For` hop when trusted,
/// then the peer socket, then `"unknown"`.
pub fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = headers
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(first) = forwarded {
            return first.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("192.0.2.7:51000".parse().unwrap())
    }

    #[test]
    fn test_forwarded_for_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static(" 203.0.113.9 , 10.0.0.1"));
        assert_eq!(client_address(&headers, peer(), true), "203.0.113.9");
    }

    #[test]
    fn test_forwarded_for_ignored_when_untrusted() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("203.0.113.9"));
        assert_eq!(client_address(&headers, peer(), false), "192.0.2.7");
    }

    #[test]
    fn test_unknown_without_peer() {
        assert_eq!(client_address(&HeaderMap::new(), None, true), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_request_id_is_uuid() {
        let request = Request::builder().body(Body::empty()).unwrap();
        let id = MakeRequestUuidV4.make_request_id(&request).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(text).is_ok());
    }
}
