//! New-submission notifications.
//!
//! # Data Flow
//! ```text
//! intake pipeline (accepted, not spam, destination configured)
//!     → dispatch.rs (detached task, never joined)
//!     → Notifier::notify (SmtpNotifier when a relay is configured, else LogNotifier)
//!     → failures logged + counted, never surfaced to the HTTP caller
//! ```

pub mod dispatch;
pub mod message;
pub mod smtp;

pub use dispatch::{spawn_detached, spawn_notification};
pub use message::NotificationMessage;
pub use smtp::SmtpNotifier;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::NotificationConfig;
use crate::storage::Fields;

/// Errors raised while delivering a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("could not build email: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Delivery collaborator for new-submission notices.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, destination: &str, form_name: &str, fields: &Fields) -> Result<(), NotifyError>;

    /// Short transport name for logs.
    fn describe(&self) -> &'static str {
        "custom"
    }
}

/// Pick the delivery transport for a notification configuration.
///
/// An SMTP relay that cannot be set up is logged and replaced by [`LogNotifier`].
pub fn from_config(config: &NotificationConfig) -> Arc<dyn Notifier> {
    if let Some(smtp) = &config.smtp {
        match SmtpNotifier::new(smtp, &config.from_email) {
            Ok(notifier) => {
                tracing::info!(host = %smtp.host, port = smtp.port, "SMTP notifications enabled");
                return Arc::new(notifier);
            }
            Err(e) => {
                tracing::error!(host = %smtp.host, error = %e, "SMTP setup failed, logging notifications instead");
            }
        }
    }
    Arc::new(LogNotifier::new(config.from_email.clone()))
}

/// Notifier used when no outbound mail transport is configured: renders the
/// message and writes it to the log.
pub struct LogNotifier {
    from_email: String,
}

impl LogNotifier {
    pub fn new(from_email: impl Into<String>) -> Self {
        Self {
            from_email: from_email.into(),
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, destination: &str, form_name: &str, fields: &Fields) -> Result<(), NotifyError> {
        let message = NotificationMessage::render(&self.from_email, destination, form_name, fields);
        tracing::info!(
            to = %message.to,
            from = %message.from,
            subject = %message.subject,
            fields = fields.len(),
            "Mail transport not configured, logging notification instead"
        );
        tracing::debug!(body = %message.text, "Notification body");
        Ok(())
    }

    fn describe(&self) -> &'static str {
        "log"
    }
}
