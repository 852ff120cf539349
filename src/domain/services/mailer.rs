//! Outgoing email port.

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
#[error("email could not be sent: {0}")]
pub struct MailError(pub String);

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, text: &str) -> Result<(), MailError>;
}
