//! Per-form cross-origin policy.
//!
//! The same header set is computed for the pre-flight and the submission
//! itself, and is attached to every response once the form is known,
//! errors included, so browser scripts can read rejection details.

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderMap, HeaderValue};

/// Sentinel allowing every origin.
pub const ANY_ORIGIN: &str = "*";

const ALLOWED_METHODS: &str = "POST, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type";

/// Compute CORS response headers from a form's `allowed_origins` setting and
/// the request's `Origin` header.
pub fn resolve_cors_headers(allowed_origins: &str, request_origin: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let allowed = allowed_origins.trim();

    if allowed == ANY_ORIGIN {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static(ANY_ORIGIN));
    } else if let Some(origin) = request_origin.filter(|o| !o.is_empty()) {
        if allowed.split(',').map(str::trim).any(|entry| entry == origin) {
            if let Ok(value) = HeaderValue::from_str(origin) {
                headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
            }
        }
    }

    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOWED_METHODS));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOWED_HEADERS));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow_origin(headers: &HeaderMap) -> Option<&str> {
        headers
            .get(ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok())
    }

    #[test]
    fn test_wildcard_ignores_origin() {
        for origin in [None, Some("https://anything.example"), Some("")] {
            let headers = resolve_cors_headers(" * ", origin);
            assert_eq!(allow_origin(&headers), Some("*"));
        }
    }

    #[test]
    fn test_allow_list_echoes_match() {
        let headers = resolve_cors_headers("https://a.com, https://b.com", Some("https://b.com"));
        assert_eq!(allow_origin(&headers), Some("https://b.com"));
    }

    #[test]
    fn test_allow_list_rejects_unlisted() {
        let headers = resolve_cors_headers("https://a.com, https://b.com", Some("https://c.com"));
        assert_eq!(allow_origin(&headers), None);

        // Exact match only: no prefix or suffix tricks.
        let headers = resolve_cors_headers("https://a.com", Some("https://a.com.evil.net"));
        assert_eq!(allow_origin(&headers), None);
    }

    #[test]
    fn test_allow_list_without_origin() {
        let headers = resolve_cors_headers("https://a.com", None);
        assert_eq!(allow_origin(&headers), None);
    }

    #[test]
    fn test_methods_and_headers_always_present() {
        for (allowed, origin) in [("*", None), ("https://a.com", Some("https://z.com"))] {
            let headers = resolve_cors_headers(allowed, origin);
            assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_METHODS).unwrap(), "POST, OPTIONS");
            assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_HEADERS).unwrap(), "Content-Type");
        }
    }
}
