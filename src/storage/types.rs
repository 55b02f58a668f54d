//! Storage-owned entities and error definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::config::FormConfig;

/// A single submitted value.
///
/// Submissions arrive as arbitrary JSON or form fields; they are narrowed to
/// this closed set so storage and display formatting stay well-defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl FieldValue {
    /// Truthiness used by the honeypot check.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Null => false,
            FieldValue::Bool(b) => *b,
            FieldValue::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
            FieldValue::String(s) => !s.is_empty(),
        }
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Bool(b),
            serde_json::Value::Number(n) => FieldValue::Number(n),
            serde_json::Value::String(s) => FieldValue::String(s),
            // Nested structures are kept as their compact JSON text.
            nested => FieldValue::String(nested.to_string()),
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::String(s) => f.write_str(s),
        }
    }
}

/// Flat field mapping of one submission.
pub type Fields = BTreeMap<String, FieldValue>;

/// Form settings the intake pipeline consults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormPolicy {
    pub id: u64,
    pub public_id: String,
    pub name: String,
    pub is_active: bool,
    pub allowed_origins: String,
    pub redirect_url: Option<String>,
    pub notification_email: Option<String>,
    pub email_notifications: bool,
    pub created_at: DateTime<Utc>,
}

impl FormPolicy {
    /// Destination for a new-submission notice, if one should be sent.
    pub fn notification_target(&self) -> Option<&str> {
        if !self.email_notifications {
            return None;
        }
        self.notification_email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }

    /// Editable settings of this form, in configuration shape.
    pub fn settings(&self) -> FormConfig {
        FormConfig {
            public_id: self.public_id.clone(),
            name: self.name.clone(),
            allowed_origins: self.allowed_origins.clone(),
            redirect_url: self.redirect_url.clone(),
            email_notifications: self.email_notifications,
            notification_email: self.notification_email.clone(),
            is_active: self.is_active,
        }
    }
}

/// A submission ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub form_id: u64,
    pub fields: Fields,
    pub client_address: String,
    pub is_spam: bool,
}

/// A persisted submission. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: u64,
    pub form_id: u64,
    pub fields: Fields,
    pub client_address: String,
    pub is_spam: bool,
    pub created_at: DateTime<Utc>,
}

impl SubmissionRecord {
    /// Case-insensitive substring match over keys and values.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.fields.iter().any(|(key, value)| {
            key.to_lowercase().contains(&needle) || value.to_string().to_lowercase().contains(&needle)
        })
    }
}

/// Listing parameters for a form's submissions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SubmissionQuery {
    pub page: usize,
    pub per_page: usize,
    pub search: Option<String>,
    pub include_spam: bool,
}

pub const MAX_PER_PAGE: usize = 100;

impl SubmissionQuery {
    /// Clamp paging values into their accepted ranges.
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.per_page = self.per_page.clamp(1, MAX_PER_PAGE);
        self.search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self
    }
}

impl Default for SubmissionQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
            search: None,
            include_spam: false,
        }
    }
}

/// One page of submissions, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPage {
    pub submissions: Vec<SubmissionRecord>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
}

/// Errors raised by a repository.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("unknown form id {0}")]
    UnknownForm(u64),

    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(FieldValue::from("x").is_truthy());
        assert!(FieldValue::from("0").is_truthy());
        assert!(FieldValue::Bool(true).is_truthy());
        assert!(FieldValue::from(json!(3)).is_truthy());

        assert!(!FieldValue::from("").is_truthy());
        assert!(!FieldValue::Bool(false).is_truthy());
        assert!(!FieldValue::from(json!(0)).is_truthy());
        assert!(!FieldValue::from(json!(0.0)).is_truthy());
        assert!(!FieldValue::Null.is_truthy());
    }

    #[test]
    fn test_nested_json_flattens_to_text() {
        assert_eq!(
            FieldValue::from(json!(["a", 1])),
            FieldValue::String(r#"["a",1]"#.to_string())
        );
        assert_eq!(
            FieldValue::from(json!({"k": true})),
            FieldValue::String(r#"{"k":true}"#.to_string())
        );
    }

    #[test]
    fn test_field_value_serializes_untagged() {
        let mut fields = Fields::new();
        fields.insert("age".into(), FieldValue::from(json!(42)));
        fields.insert("name".into(), "Ada".into());
        fields.insert("opt_in".into(), FieldValue::Bool(true));
        fields.insert("phone".into(), FieldValue::Null);

        let encoded = serde_json::to_value(&fields).unwrap();
        assert_eq!(
            encoded,
            json!({"age": 42, "name": "Ada", "opt_in": true, "phone": null})
        );
        let decoded: Fields = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, fields);
    }

    #[test]
    fn test_query_normalization() {
        let query = SubmissionQuery {
            page: 0,
            per_page: 1000,
            search: Some("   ".into()),
            include_spam: false,
        }
        .normalized();

        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, MAX_PER_PAGE);
        assert_eq!(query.search, None);
    }

    #[test]
    fn test_notification_target() {
        let mut form = FormPolicy {
            id: 1,
            public_id: "contact".into(),
            name: "Contact".into(),
            is_active: true,
            allowed_origins: "*".into(),
            redirect_url: None,
            notification_email: Some(" owner@example.com ".into()),
            email_notifications: true,
            created_at: Utc::now(),
        };
        assert_eq!(form.notification_target(), Some("owner@example.com"));

        form.email_notifications = false;
        assert_eq!(form.notification_target(), None);

        form.email_notifications = true;
        form.notification_email = Some(String::new());
        assert_eq!(form.notification_target(), None);
    }
}
