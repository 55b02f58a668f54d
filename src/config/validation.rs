//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, addresses parse)
//! - Check seeded forms (unique public ids, absolute redirect URLs)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FormforgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;
use url::Url;

use crate::config::schema::{FormConfig, FormforgeConfig};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &FormforgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_socket_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);

    let prefix = &config.listener.submit_prefix;
    if !prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/') {
        errors.push(ValidationError::new(
            "listener.submit_prefix",
            "must start with '/', be non-root and have no trailing '/'",
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }

    if config.rate_limit.submissions_per_minute == 0 {
        errors.push(ValidationError::new(
            "rate_limit.submissions_per_minute",
            "must be > 0",
        ));
    }
    if config.rate_limit.sweep_interval_secs == 0 {
        errors.push(ValidationError::new(
            "rate_limit.sweep_interval_secs",
            "must be > 0",
        ));
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be > 0"));
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            "must be \"pretty\" or \"json\"",
        ));
    }
    if config.observability.metrics_enabled {
        check_socket_addr(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.admin.enabled {
        check_socket_addr(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.trim().is_empty() {
            errors.push(ValidationError::new("admin.api_key", "must not be empty"));
        }
    }

    if let Some(smtp) = &config.notifications.smtp {
        if smtp.host.trim().is_empty() {
            errors.push(ValidationError::new("notifications.smtp.host", "must not be empty"));
        }
        if smtp.port == 0 {
            errors.push(ValidationError::new("notifications.smtp.port", "must be > 0"));
        }
        if smtp.username.is_some() != smtp.password.is_some() {
            errors.push(ValidationError::new(
                "notifications.smtp",
                "username and password must be set together",
            ));
        }
        if config.notifications.from_email.parse::<lettre::Address>().is_err() {
            errors.push(ValidationError::new(
                "notifications.from_email",
                format!("{:?} is not a valid address", config.notifications.from_email),
            ));
        }
    }

    let mut seen = HashSet::new();
    for (i, form) in config.forms.iter().enumerate() {
        validate_form(&mut errors, &format!("forms[{i}]"), form);
        if !seen.insert(form.public_id.as_str()) {
            errors.push(ValidationError::new(
                format!("forms[{i}].public_id"),
                format!("duplicate public id {:?}", form.public_id),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Checks applied to a single form definition, from config or the admin API.
pub fn validate_form(errors: &mut Vec<ValidationError>, path: &str, form: &FormConfig) {
    if !is_routable_id(&form.public_id) {
        errors.push(ValidationError::new(
            format!("{path}.public_id"),
            "must be non-empty and contain only [A-Za-z0-9_-]",
        ));
    }

    if form.name.trim().is_empty() {
        errors.push(ValidationError::new(format!("{path}.name"), "must not be empty"));
    }

    let origins = form.allowed_origins.trim();
    if origins != "*" {
        for origin in origins.split(',').map(str::trim) {
            if !is_http_url(origin) {
                errors.push(ValidationError::new(
                    format!("{path}.allowed_origins"),
                    format!("{origin:?} is not \"*\" or an http(s) origin"),
                ));
            }
        }
    }

    if let Some(redirect) = &form.redirect_url {
        if !is_http_url(redirect) {
            errors.push(ValidationError::new(
                format!("{path}.redirect_url"),
                "must be an absolute http(s) URL",
            ));
        }
    }
}

fn check_socket_addr(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            field,
            format!("{value:?} is not a socket address"),
        ));
    }
}

fn is_routable_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn is_http_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::SmtpConfig;

    fn form(public_id: &str) -> FormConfig {
        FormConfig {
            public_id: public_id.to_string(),
            name: "Contact".to_string(),
            allowed_origins: "*".to_string(),
            redirect_url: None,
            email_notifications: true,
            notification_email: None,
            is_active: true,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&FormforgeConfig::default()).is_ok());
    }

    #[test]
    fn test_duplicate_public_ids() {
        let mut config = FormforgeConfig::default();
        config.forms = vec![form("contact"), form("contact")];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "forms[1].public_id");
    }

    #[test]
    fn test_bad_origins_and_redirect() {
        let mut f = form("contact");
        f.allowed_origins = "https://a.com, not-a-url".to_string();
        f.redirect_url = Some("/thanks".to_string());

        let mut errors = Vec::new();
        validate_form(&mut errors, "form", &f);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "form.allowed_origins");
        assert_eq!(errors[1].field, "form.redirect_url");
    }

    #[test]
    fn test_public_id_charset() {
        let mut errors = Vec::new();
        validate_form(&mut errors, "form", &form("has/slash"));
        validate_form(&mut errors, "form", &form(""));
        assert_eq!(errors.len(), 2);

        let mut errors = Vec::new();
        validate_form(&mut errors, "form", &form("3f2c9a7e-5b1d-4e0a-9f6c-2d8b7a1e4c55"));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_smtp_settings_checked_when_present() {
        let mut config = FormforgeConfig::default();
        config.notifications.from_email = "not an address".to_string();
        assert!(validate_config(&config).is_ok());

        config.notifications.smtp = Some(SmtpConfig {
            username: Some("mailer".to_string()),
            ..SmtpConfig::default()
        });
        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["notifications.smtp.host", "notifications.smtp", "notifications.from_email"]
        );
    }

    #[test]
    fn test_admin_requires_key_when_enabled() {
        let mut config = FormforgeConfig::default();
        config.admin.enabled = true;
        config.admin.api_key = "  ".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "admin.api_key");
    }
}
