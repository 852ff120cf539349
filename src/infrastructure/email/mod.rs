//! Outgoing Email
//!
//! SMTP delivery through `lettre`, or a logging stand-in when no relay is
//! configured.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::EmailSettings;
use crate::domain::services::{MailError, Mailer};

/// STARTTLS relay with username/password authentication.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        from_name: &str,
    ) -> Result<Self, MailError> {
        let from = format!("\"{}\" <{}>", from_name, username)
            .parse::<Mailbox>()
            .map_err(|e| MailError(format!("invalid sender address: {}", e)))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| MailError(format!("invalid SMTP relay: {}", e)))?
            .port(port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, text: &str) -> Result<(), MailError> {
        let recipient = to
            .parse::<Mailbox>()
            .map_err(|e| MailError(format!("invalid recipient: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(text.to_string())
            .map_err(|e| MailError(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError(e.to_string()))?;

        tracing::info!(to, subject, "Email sent");
        Ok(())
    }
}

/// Writes mail to the log instead of sending it.
///
/// Bodies carry reset and verification tokens, so they are only logged at
/// debug level and never in production.
pub struct LogMailer {
    reveal_body: bool,
}

impl LogMailer {
    pub fn new(reveal_body: bool) -> Self {
        Self { reveal_body }
    }

    fn loggable_body<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.reveal_body.then_some(text)
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, text: &str) -> Result<(), MailError> {
        tracing::info!(to, subject, "Email not sent, SMTP is not configured");
        if let Some(body) = self.loggable_body(text) {
            tracing::debug!(to, body, "Unsent email body");
        }
        Ok(())
    }
}

/// Pick the mailer for these settings.
pub fn build_mailer(
    settings: &EmailSettings,
    production: bool,
) -> Result<Arc<dyn Mailer>, MailError> {
    match (&settings.host, &settings.username, &settings.password) {
        (Some(host), Some(username), Some(password)) => {
            tracing::info!(host = %host, port = settings.port, "SMTP mailer configured");
            Ok(Arc::new(SmtpMailer::new(
                host,
                settings.port,
                username,
                password,
                &settings.from_name,
            )?))
        }
        _ => {
            tracing::warn!("SMTP is not configured, emails will only be logged");
            Ok(Arc::new(LogMailer::new(!production)))
        }
    }
}
