use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;

use super::{AlertMessage, Notifier};

/// POSTs alerts as JSON to an HTTP endpoint (chat webhooks, mail relays).
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build webhook client")?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn payload(message: &AlertMessage) -> serde_json::Value {
        json!({
            "subject": message.subject,
            "text": format!("{}\n{}", message.subject, message.body),
            "status": message.status,
            "final_score": message.final_score,
            "reasons": message.reasons,
            "timestamp": message.timestamp,
        })
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, message: &AlertMessage) -> Result<()> {
        self.client
            .post(&self.url)
            .json(&Self::payload(message))
            .send()
            .await
            .with_context(|| format!("webhook POST to {} failed", self.url))?
            .error_for_status()
            .context("webhook rejected alert")?;
        info!(url = %self.url, "alert delivered to webhook");
        Ok(())
    }
}
