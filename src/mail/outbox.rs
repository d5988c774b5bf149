use async_trait::async_trait;
use tokio::sync::RwLock;

use super::Mailer;

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Keeps sent mail in memory instead of delivering it. Used when no mail
/// provider is configured and in tests.
#[derive(Default)]
pub struct Outbox {
    sent: RwLock<Vec<SentEmail>>,
    failing: bool,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// An outbox that rejects every message.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub async fn sent(&self) -> Vec<SentEmail> {
        self.sent.read().await.clone()
    }

    pub async fn last(&self) -> Option<SentEmail> {
        self.sent.read().await.last().cloned()
    }
}

#[async_trait]
impl Mailer for Outbox {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()> {
        if self.failing {
            anyhow::bail!("outbox rejected message");
        }
        tracing::info!(subject = %subject, "email kept in outbox");
        self.sent.write().await.push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
        });
        Ok(())
    }
}
