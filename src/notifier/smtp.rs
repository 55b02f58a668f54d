//! SMTP delivery through an outbound relay.

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::notifier::{NotificationMessage, Notifier, NotifyError};
use crate::storage::Fields;

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Build the relay transport. No connection is made until the first send.
    pub fn new(config: &SmtpConfig, from_email: &str) -> Result<Self, NotifyError> {
        let from: Mailbox = from_email.parse()?;

        let mut builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(config.host.as_str())
        };
        builder = builder.port(config.port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

/// Assemble a multipart plain-text/HTML email from a rendered notification.
pub fn build_email(message: &NotificationMessage) -> Result<Message, NotifyError> {
    let email = Message::builder()
        .from(message.from.parse()?)
        .to(message.to.parse()?)
        .subject(message.subject.clone())
        .multipart(MultiPart::alternative_plain_html(
            message.text.clone(),
            message.html.clone(),
        ))?;
    Ok(email)
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, destination: &str, form_name: &str, fields: &Fields) -> Result<(), NotifyError> {
        let message = NotificationMessage::render(&self.from.to_string(), destination, form_name, fields);
        let email = build_email(&message)?;
        self.transport.send(email).await?;
        Ok(())
    }

    fn describe(&self) -> &'static str {
        "smtp"
    }
}
