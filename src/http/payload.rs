//! Submission body normalization.
//!
//! # Responsibilities
//! - Turn a raw body into a flat field mapping whatever its encoding
//! - Honor an explicit JSON content type strictly
//! - Fall back JSON → form decoding when the content type is missing or unknown
//!
//! # Design Decisions
//! - Public HTML forms cannot be trusted to send correct content types
//! - Only top-level JSON objects are accepted
//! - Duplicate keys: last value wins
//! - File parts are reduced to their filename

use bytes::Bytes;
use futures_util::stream;
use std::convert::Infallible;

use crate::intake::IntakeError;
use crate::storage::{FieldValue, Fields};

const JSON: &str = "application/json";
const URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART: &str = "multipart/form-data";

const INVALID_JSON: &str = "Invalid JSON";
const NOT_AN_OBJECT: &str = "Expected a JSON object";
const UNPARSEABLE: &str = "Unable to parse request body";
const MALFORMED_MULTIPART: &str = "Malformed multipart body";

/// Parse a submission body according to its `Content-Type`.
pub async fn parse(content_type: Option<&str>, body: Bytes) -> Result<Fields, IntakeError> {
    let raw_type = content_type.unwrap_or_default();
    let media = raw_type.to_ascii_lowercase();

    if media.contains(JSON) {
        let value = serde_json::from_slice(&body)
            .map_err(|_| IntakeError::invalid_payload(INVALID_JSON))?;
        return object_fields(value);
    }

    if media.contains(URLENCODED) {
        return decode_form(&body).ok_or_else(|| IntakeError::invalid_payload(UNPARSEABLE));
    }

    if media.contains(MULTIPART) {
        return decode_multipart(raw_type, body).await;
    }

    match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(value) => object_fields(value),
        Err(_) => decode_form(&body).ok_or_else(|| IntakeError::invalid_payload(UNPARSEABLE)),
    }
}

fn object_fields(value: serde_json::Value) -> Result<Fields, IntakeError> {
    match value {
        serde_json::Value::Object(map) => Ok(map
            .into_iter()
            .map(|(key, value)| (key, FieldValue::from(value)))
            .collect()),
        _ => Err(IntakeError::invalid_payload(NOT_AN_OBJECT)),
    }
}

fn decode_form(body: &[u8]) -> Option<Fields> {
    let text = std::str::from_utf8(body).ok()?;
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(text).ok()?;
    Some(
        pairs
            .into_iter()
            .map(|(key, value)| (key, FieldValue::String(value)))
            .collect(),
    )
}

async fn decode_multipart(content_type: &str, body: Bytes) -> Result<Fields, IntakeError> {
    let boundary = multer::parse_boundary(content_type)
        .map_err(|_| IntakeError::invalid_payload(MALFORMED_MULTIPART))?;
    let body = stream::once(async move { Ok::<Bytes, Infallible>(body) });
    let mut multipart = multer::Multipart::new(body, boundary);

    let mut fields = Fields::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| IntakeError::invalid_payload(MALFORMED_MULTIPART))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if let Some(file_name) = field.file_name().map(str::to_string) {
            // Browsers send an empty filename when no file was chosen.
            if !file_name.is_empty() {
                fields.insert(name, FieldValue::String(file_name));
            }
            continue;
        }

        let text = field
            .text()
            .await
            .map_err(|_| IntakeError::invalid_payload(MALFORMED_MULTIPART))?;
        fields.insert(name, FieldValue::String(text));
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(fields: &Fields, key: &str) -> String {
        fields[key].to_string()
    }

    fn detail(err: IntakeError) -> String {
        match err {
            IntakeError::InvalidPayload(message) => message,
            other => panic!("expected InvalidPayload, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_json_object() {
        let body = Bytes::from_static(br#"{"name":"Ada","age":36,"tags":["a","b"],"opt":null}"#);
        let fields = parse(Some("application/json; charset=utf-8"), body).await.unwrap();

        assert_eq!(text(&fields, "name"), "Ada");
        assert_eq!(fields["age"], FieldValue::Number(serde_json::Number::from(36u64)));
        assert_eq!(text(&fields, "tags"), r#"["a","b"]"#);
        assert_eq!(fields["opt"], FieldValue::Null);
    }

    #[tokio::test]
    async fn test_malformed_json_never_falls_back() {
        // Would decode as a form field if the fallback were tried.
        let body = Bytes::from_static(b"name=Ada");
        let err = parse(Some("application/json"), body).await.unwrap_err();
        assert_eq!(detail(err), INVALID_JSON);
    }

    #[tokio::test]
    async fn test_non_object_json_rejected() {
        for body in ["[1,2]", "\"text\"", "42"] {
            let err = parse(Some("application/json"), Bytes::from(body))
                .await
                .unwrap_err();
            assert_eq!(detail(err), NOT_AN_OBJECT);
        }
    }

    #[tokio::test]
    async fn test_urlencoded_last_value_wins() {
        let body = Bytes::from_static(b"name=Ada&email=ada%40example.com&name=Grace&msg=hi+there");
        let fields = parse(Some("application/x-www-form-urlencoded"), body).await.unwrap();

        assert_eq!(fields.len(), 3);
        assert_eq!(text(&fields, "name"), "Grace");
        assert_eq!(text(&fields, "email"), "ada@example.com");
        assert_eq!(text(&fields, "msg"), "hi there");
    }

    #[tokio::test]
    async fn test_multipart_with_file() {
        let body = concat!(
            "--XyZ\r\n",
            "Content-Disposition: form-data; name=\"name\"\r\n\r\n",
            "Ada\r\n",
            "--XyZ\r\n",
            "Content-Disposition: form-data; name=\"resume\"; filename=\"cv.pdf\"\r\n",
            "Content-Type: application/pdf\r\n\r\n",
            "%PDF-1.4 binary\r\n",
            "--XyZ\r\n",
            "Content-Disposition: form-data; name=\"empty_upload\"; filename=\"\"\r\n",
            "Content-Type: application/octet-stream\r\n\r\n",
            "\r\n",
            "--XyZ--\r\n",
        );
        let fields = parse(Some("multipart/form-data; boundary=XyZ"), Bytes::from(body))
            .await
            .unwrap();

        assert_eq!(fields.len(), 2);
        assert_eq!(text(&fields, "name"), "Ada");
        assert_eq!(text(&fields, "resume"), "cv.pdf");
    }

    #[tokio::test]
    async fn test_multipart_without_boundary() {
        let err = parse(Some("multipart/form-data"), Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert_eq!(detail(err), MALFORMED_MULTIPART);
    }

    #[tokio::test]
    async fn test_unknown_type_json_fallback() {
        for content_type in [None, Some("text/plain")] {
            let body = Bytes::from_static(br#"{"name":"Ada"}"#);
            let fields = parse(content_type, body).await.unwrap();
            assert_eq!(text(&fields, "name"), "Ada");
        }
    }

    #[tokio::test]
    async fn test_unknown_type_form_fallback() {
        let fields = parse(None, Bytes::from_static(b"name=Ada&city=London")).await.unwrap();
        assert_eq!(text(&fields, "city"), "London");
    }

    #[tokio::test]
    async fn test_unknown_type_unparseable() {
        let err = parse(None, Bytes::from_static(&[0xff, 0xfe, 0x00]))
            .await
            .unwrap_err();
        assert_eq!(detail(err), UNPARSEABLE);
    }

    #[tokio::test]
    async fn test_empty_body_yields_no_fields() {
        let fields = parse(None, Bytes::new()).await.unwrap();
        assert!(fields.is_empty());
    }
}
