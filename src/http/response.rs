//! Response negotiation for the submission endpoint.
//!
//! # Responsibilities
//! - Choose redirect, HTML acknowledgment or JSON acknowledgment
//! - Build JSON error bodies (`{"detail": ...}`) for every rejection
//! - Merge the form's CORS headers into whatever is returned
//!
//! # Design Decisions
//! - Errors are always JSON, regardless of `Accept`
//! - Redirects use 303 so browsers follow with GET
//! - Descriptors are plain data; conversion to an HTTP response happens last

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

/// Acknowledgment page served to browsers without a configured redirect.
pub const THANK_YOU_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>Thank you!</title>
<style>
body{font-family:system-ui,-apple-system,sans-serif;display:flex;align-items:center;justify-content:center;min-height:100vh;margin:0;background:#f8fafc}
.card{text-align:center;padding:3rem 2.5rem;background:#fff;border-radius:16px;box-shadow:0 4px 32px rgba(0,0,0,.06);max-width:420px;width:90%}
h1{color:#0f172a;margin:0 0 .5rem;font-size:1.5rem}
p{color:#64748b;margin:0;line-height:1.5}
.powered{margin-top:2rem;font-size:.75rem;color:#94a3b8}
</style>
</head>
<body>
<div class="card">
  <h1>Thank you!</h1>
  <p>Your submission has been received.</p>
  <p class="powered">Powered by FormForge</p>
</div>
</body>
</html>
"#;

const HTML: &str = "text/html";
const JSON: &str = "application/json";

/// What kind of reply a descriptor represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Redirect,
    Html,
    Json,
    Empty,
}

/// A fully decided reply, not yet encoded.
#[derive(Debug, Clone)]
pub struct ResponseDescriptor {
    pub kind: ResponseKind,
    pub status: StatusCode,
    pub body: Option<String>,
    pub location: Option<String>,
    pub headers: HeaderMap,
}

impl ResponseDescriptor {
    /// JSON `{"detail": message}` error reply.
    pub fn error(status: StatusCode, detail: &str, headers: HeaderMap) -> Self {
        Self {
            kind: ResponseKind::Json,
            status,
            body: Some(serde_json::json!({ "detail": detail }).to_string()),
            location: None,
            headers,
        }
    }

    /// Empty 200 reply carrying only headers (CORS pre-flight).
    pub fn empty(headers: HeaderMap) -> Self {
        Self {
            kind: ResponseKind::Empty,
            status: StatusCode::OK,
            body: None,
            location: None,
            headers,
        }
    }
}

/// Decide how to acknowledge an accepted submission.
pub fn negotiate(
    accept: Option<&str>,
    redirect_url: Option<&str>,
    cors: HeaderMap,
) -> ResponseDescriptor {
    let accept = accept.unwrap_or_default().to_ascii_lowercase();
    let wants_html = accept.contains(HTML);

    if let Some(url) = redirect_url.filter(|url| HeaderValue::from_str(url).is_ok()) {
        if wants_html {
            return ResponseDescriptor {
                kind: ResponseKind::Redirect,
                status: StatusCode::SEE_OTHER,
                body: None,
                location: Some(url.to_string()),
                headers: cors,
            };
        }
    }

    if wants_html && !accept.contains(JSON) {
        return ResponseDescriptor {
            kind: ResponseKind::Html,
            status: StatusCode::OK,
            body: Some(THANK_YOU_PAGE.to_string()),
            location: None,
            headers: cors,
        };
    }

    ResponseDescriptor {
        kind: ResponseKind::Json,
        status: StatusCode::OK,
        body: Some(
            serde_json::json!({ "status": "ok", "message": "Submission received" }).to_string(),
        ),
        location: None,
        headers: cors,
    }
}

impl IntoResponse for ResponseDescriptor {
    fn into_response(self) -> Response {
        let mut response = Response::new(self.body.map(Body::from).unwrap_or_else(Body::empty));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        headers.extend(self.headers);
        match self.kind {
            ResponseKind::Json => {
                headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON));
            }
            ResponseKind::Html => {
                headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/html; charset=utf-8"),
                );
            }
            ResponseKind::Redirect | ResponseKind::Empty => {}
        }
        if let Some(value) = self.location.and_then(|l| HeaderValue::from_str(&l).ok()) {
            headers.insert(header::LOCATION, value);
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::resolve_cors_headers;

    #[test]
    fn test_json_by_default() {
        for accept in [None, Some("application/json"), Some("*/*")] {
            let reply = negotiate(accept, Some("https://x.com/thanks"), HeaderMap::new());
            assert_eq!(reply.kind, ResponseKind::Json);
            assert_eq!(reply.status, StatusCode::OK);
            let body: serde_json::Value = serde_json::from_str(reply.body.as_deref().unwrap()).unwrap();
            assert_eq!(body, serde_json::json!({"status": "ok", "message": "Submission received"}));
        }
    }

    #[test]
    fn test_html_without_redirect() {
        let reply = negotiate(Some("text/html,application/xhtml+xml"), None, HeaderMap::new());
        assert_eq!(reply.kind, ResponseKind::Html);
        assert!(reply.body.unwrap().contains("Thank you!"));
    }

    #[test]
    fn test_html_and_json_prefers_json() {
        let reply = negotiate(Some("text/html, application/json"), None, HeaderMap::new());
        assert_eq!(reply.kind, ResponseKind::Json);
    }

    #[test]
    fn test_redirect_for_html_clients() {
        let reply = negotiate(Some("text/html"), Some("https://x.com/thanks"), HeaderMap::new());
        assert_eq!(reply.kind, ResponseKind::Redirect);
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert_eq!(reply.location.as_deref(), Some("https://x.com/thanks"));
    }

    #[test]
    fn test_cors_headers_carried_into_response() {
        let cors = resolve_cors_headers("*", None);
        let response = negotiate(Some("text/html"), Some("https://x.com/thanks"), cors).into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "https://x.com/thanks");
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[test]
    fn test_error_descriptor() {
        let cors = resolve_cors_headers("*", None);
        let response = ResponseDescriptor::error(StatusCode::TOO_MANY_REQUESTS, "Slow down", cors)
            .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
