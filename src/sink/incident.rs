use anyhow::Result;
use serde_json::json;

use super::{AlertMessage, Notifier};
use crate::detect::incident::IncidentManager;

/// Persists every fired alert to the SQLite alert log.
#[derive(Clone)]
pub struct IncidentRecorder {
    incidents: IncidentManager,
}

impl IncidentRecorder {
    pub fn new(incidents: IncidentManager) -> Self {
        Self { incidents }
    }
}

#[async_trait::async_trait]
impl Notifier for IncidentRecorder {
    fn name(&self) -> &str {
        "incident_log"
    }

    async fn notify(&self, message: &AlertMessage) -> Result<()> {
        let incidents = self.incidents.clone();
        let message = message.clone();
        let id = tokio::task::spawn_blocking(move || {
            incidents.record_incident(
                message.status,
                message.final_score,
                &message.subject,
                json!({
                    "body": message.body,
                    "reasons": message.reasons,
                    "timestamp": message.timestamp,
                }),
            )
        })
        .await??;
        tracing::debug!(%id, "alert recorded");
        Ok(())
    }
}
