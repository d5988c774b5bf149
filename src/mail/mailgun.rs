use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;

use super::Mailer;
use crate::config::MailConfig;

/// Sends mail through the Mailgun HTTP API.
pub struct MailgunMailer {
    http_client: Client,
    base_url: String,
    domain: String,
    sender: String,
    api_key: String,
}

impl MailgunMailer {
    pub fn new(cfg: &MailConfig, http_client: Client) -> Self {
        Self {
            http_client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            domain: cfg.domain.clone(),
            sender: cfg.sender.clone(),
            api_key: cfg.api_key.clone(),
        }
    }
}

#[async_trait]
impl Mailer for MailgunMailer {
    #[tracing::instrument(name = "Sending email", skip_all)]
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()> {
        let url = format!("{}/v3/{}/messages", self.base_url, self.domain);
        let form = [
            ("from", self.sender.as_str()),
            ("to", to),
            ("subject", subject),
            ("html", html_body),
        ];

        self.http_client
            .post(url)
            .basic_auth(MAILGUN_API_USER, Some(&self.api_key))
            .form(&form)
            .send()
            .await
            .context("mailgun request")?
            .error_for_status()
            .context("mailgun response")?;

        tracing::info!("email accepted by mailgun");
        Ok(())
    }
}

const MAILGUN_API_USER: &str = "api";
