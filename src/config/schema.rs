//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the FormForge service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FormforgeConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Submission rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Request hardening.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Operator API.
    pub admin: AdminConfig,

    /// Submission repository settings.
    pub storage: StorageConfig,

    /// Outbound notification settings.
    pub notifications: NotificationConfig,

    /// Forms seeded at startup and on reload.
    pub forms: Vec<FormConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Path prefix of the public submission endpoint.
    pub submit_prefix: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            submit_prefix: "/f".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Grace period for in-flight requests on shutdown, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            shutdown_grace_secs: 10,
        }
    }
}

/// Rate limiting configuration.
///
/// The window is fixed at 60 seconds; only the per-window allowance is tunable.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Submissions admitted per form and client within one minute.
    pub submissions_per_minute: usize,

    /// How often idle rate-limit keys are swept, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            submissions_per_minute: 10,
            sweep_interval_secs: 300,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,

    /// Take the client address from the first `X-Forwarded-For` entry.
    pub trust_forwarded_for: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024, // 1MB
            trust_forwarded_for: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8001".to_string(),
        }
    }
}

/// Submission repository configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON snapshot file loaded at startup and written on shutdown.
    /// `None` keeps everything in memory only.
    pub snapshot_path: Option<String>,
}

/// Outbound notification configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Sender address used in notification messages.
    pub from_email: String,

    /// Outbound SMTP relay. Without it notifications are only logged.
    pub smtp: Option<SmtpConfig>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            from_email: "noreply@formforge.dev".to_string(),
            smtp: None,
        }
    }
}

/// SMTP relay settings (`[notifications.smtp]`).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,

    /// Upgrade the connection with STARTTLS. Disable only for local relays.
    pub starttls: bool,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 587,
            username: None,
            password: None,
            starttls: true,
        }
    }
}

/// A form declared in the configuration file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FormConfig {
    /// Public routing token (`/f/{public_id}`).
    pub public_id: String,

    /// Human-readable form name.
    pub name: String,

    /// `"*"` or a comma-delimited list of exact origins.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,

    /// Where HTML clients are sent after a successful submission.
    #[serde(default)]
    pub redirect_url: Option<String>,

    #[serde(default = "default_true")]
    pub email_notifications: bool,

    #[serde(default)]
    pub notification_email: Option<String>,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            public_id: String::new(),
            name: String::new(),
            allowed_origins: default_allowed_origins(),
            redirect_url: None,
            email_notifications: true,
            notification_email: None,
            is_active: true,
        }
    }
}

fn default_allowed_origins() -> String {
    "*".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FormforgeConfig::default();
        assert_eq!(config.rate_limit.submissions_per_minute, 10);
        assert_eq!(config.listener.submit_prefix, "/f");
        assert!(config.security.trust_forwarded_for);
        assert!(!config.admin.enabled);
        assert!(config.forms.is_empty());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: FormforgeConfig = toml::from_str(
            r#"
            [rate_limit]
            submissions_per_minute = 3

            [[forms]]
            public_id = "contact"
            name = "Contact"
            "#,
        )
        .unwrap();

        assert_eq!(config.rate_limit.submissions_per_minute, 3);
        assert_eq!(config.rate_limit.sweep_interval_secs, 300);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8000");

        let form = &config.forms[0];
        assert_eq!(form.allowed_origins, "*");
        assert!(form.is_active);
        assert!(form.email_notifications);
        assert!(form.redirect_url.is_none());
    }
}
