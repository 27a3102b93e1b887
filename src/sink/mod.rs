//! Collaborators notified by the pump: outbound alert notifiers and
//! presentation sinks.

pub mod dashboard;
pub mod incident;
pub mod webhook;

pub use self::dashboard::Dashboard;
pub use self::incident::IncidentRecorder;
pub use self::webhook::WebhookNotifier;

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::detect::{Status, Transition};
use crate::event::Timestamp;
use crate::monitor::{ScoreHistory, TickReport};

/// Payload of one outbound alert.
#[derive(Debug, Clone, Serialize)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
    pub timestamp: Timestamp,
    pub final_score: f64,
    pub status: Status,
    pub reasons: Vec<String>,
}

impl AlertMessage {
    pub fn from_report(report: &TickReport) -> Self {
        let reasons: Vec<String> = report.reasons.iter().map(|r| r.to_string()).collect();
        let mut body = format!("Risk Score: {}", report.score.final_score as i64);
        for r in &reasons {
            body.push_str("\n - ");
            body.push_str(r);
        }
        Self {
            subject: "RANSOMWARE DETECTED".to_string(),
            body,
            timestamp: report.timestamp,
            final_score: report.score.final_score,
            status: report.score.status,
            reasons,
        }
    }
}

/// Outbound alert delivery (mail relay, chat webhook, alert log, ...).
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self, message: &AlertMessage) -> Result<()>;
}

/// Receives every tick for display, plus status-change cues.
pub trait PresentationSink: Send + Sync {
    fn publish(&self, report: &TickReport, history: &ScoreHistory);

    /// Local feedback on status changes. Not subject to the alert cooldown.
    fn status_changed(&self, _transition: &Transition) {}
}

/// Writes alerts to the log. Always available.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, message: &AlertMessage) -> Result<()> {
        error!(
            subject = %message.subject,
            score = message.final_score,
            reasons = ?message.reasons,
            "ALERT"
        );
        Ok(())
    }
}

/// Delivers to every inner notifier; one failure does not stop the others.
#[derive(Default, Clone)]
pub struct FanoutNotifier {
    targets: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(targets: Vec<Arc<dyn Notifier>>) -> Self {
        Self { targets }
    }

    pub fn push(&mut self, target: Arc<dyn Notifier>) {
        self.targets.push(target);
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[async_trait::async_trait]
impl Notifier for FanoutNotifier {
    fn name(&self) -> &str {
        "fanout"
    }

    async fn notify(&self, message: &AlertMessage) -> Result<()> {
        let mut failed = Vec::new();
        for target in &self.targets {
            if let Err(e) = target.notify(message).await {
                warn!(notifier = target.name(), error = %e, "alert delivery failed");
                failed.push(target.name().to_string());
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("delivery failed for: {}", failed.join(", "))
        }
    }
}

/// Logs status changes in place of audible/visual cues.
#[derive(Debug, Default, Clone, Copy)]
pub struct CueLogger;

impl PresentationSink for CueLogger {
    fn publish(&self, _report: &TickReport, _history: &ScoreHistory) {}

    fn status_changed(&self, transition: &Transition) {
        match transition.current {
            Status::Attack => warn!(from = %transition.previous, "status -> ATTACK"),
            Status::HighRisk => warn!(from = %transition.previous, "status -> HIGH_RISK"),
            Status::Safe => info!(from = %transition.previous, "status -> SAFE"),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;

    /// Records messages; optionally fails every delivery.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<AlertMessage>>,
        pub fail: bool,
    }

    #[async_trait::async_trait]
    impl Notifier for RecordingNotifier {
        fn name(&self) -> &str {
            "recording"
        }

        async fn notify(&self, message: &AlertMessage) -> Result<()> {
            self.sent.lock().push(message.clone());
            if self.fail {
                anyhow::bail!("smtp relay unreachable");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingNotifier;
    use super::*;

    fn message() -> AlertMessage {
        AlertMessage {
            subject: "RANSOMWARE DETECTED".into(),
            body: "Risk Score: 212".into(),
            timestamp: 0.0,
            final_score: 212.0,
            status: Status::Attack,
            reasons: vec![],
        }
    }

    #[tokio::test]
    async fn test_fanout_continues_past_failures() {
        let broken = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        let healthy = Arc::new(RecordingNotifier::default());
        let fanout = FanoutNotifier::new(vec![broken.clone(), healthy.clone(), Arc::new(LogNotifier)]);
        assert_eq!(fanout.len(), 3);

        let result = fanout.notify(&message()).await;
        assert!(result.is_err());
        assert_eq!(broken.sent.lock().len(), 1);
        assert_eq!(healthy.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_fanout_succeeds() {
        assert!(FanoutNotifier::default().notify(&message()).await.is_ok());
    }
}
