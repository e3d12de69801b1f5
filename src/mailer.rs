use async_trait::async_trait;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::AppConfig;
use crate::models::OutgoingEmail;

#[derive(Debug, Error)]
pub enum MailerError {
    /// Provider answered with a non-success status.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("{0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailerError>;
}

// ---------------- Resend HTTP API ----------------
pub const DEFAULT_RESEND_API_BASE: &str = "https://api.resend.com";

pub struct ResendMailer {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

#[derive(Serialize)]
struct ResendSendBody<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Deserialize)]
struct ResendSendResponse {
    id: Option<String>,
}

#[derive(Deserialize)]
struct ResendErrorResponse {
    message: Option<String>,
}

impl ResendMailer {
    pub fn new(api_base: &str, api_key: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/emails", self.api_base)
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailerError> {
        let body = ResendSendBody {
            from: &email.from,
            to: [email.to.as_str()],
            subject: &email.subject,
            html: &email.html,
        };
        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("resend request failed: {e}");
                MailerError::Transport(e.to_string())
            })?;

        let status = resp.status();
        if status.is_success() {
            // id is informational only; a body we can't parse still means accepted
            let id = resp.json::<ResendSendResponse>().await.ok().and_then(|r| r.id);
            debug!("resend accepted message id={}", id.as_deref().unwrap_or("-"));
            return Ok(());
        }

        let raw = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ResendErrorResponse>(&raw)
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| if raw.is_empty() { status.to_string() } else { raw });
        error!("resend rejected message status={} message={message}", status.as_u16());
        Err(MailerError::Rejected { status: status.as_u16(), message })
    }
}

// Factory helper used in main
pub fn build_mailer(cfg: &AppConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    let mailer = ResendMailer::new(&cfg.resend_api_base, &cfg.resend_api_key)?;
    info!("Resend mailer configured (api base {})", cfg.resend_api_base);
    Ok(Arc::new(mailer))
}
