use async_trait::async_trait;

mod mailgun;
mod outbox;
mod templates;

pub use mailgun::MailgunMailer;
pub use outbox::{Outbox, SentEmail};
pub use templates::PasswordResetEmail;

/// Outgoing mail port. Failures are returned, never swallowed.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()>;
}
