//! Consumer side of the pipeline: per-tick scoring and the pump loop.

pub mod engine;
pub mod history;

pub use self::engine::{run_pump, Collaborators};
pub use self::history::{ScoreHistory, ScoreSample};

use std::sync::Arc;

use serde::Serialize;

use crate::analysis::explain::{explain, Reason};
use crate::analysis::model::{Classifier, LogisticClassifier};
use crate::analysis::{FeatureVector, LiveWindow};
use crate::config::{ClassifierConfig, MonitorConfig};
use crate::detect::scorer::guarded_probability;
use crate::detect::{AlertStateMachine, HybridScorer, RiskAccumulator, Score, Transition};
use crate::event::{Event, Timestamp};

/// Everything computed for one tick.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub timestamp: Timestamp,
    /// Events drained from the queue on this tick.
    pub ingested: usize,
    pub score: Score,
    pub features: Option<FeatureVector>,
    pub reasons: Vec<Reason>,
    pub transition: Transition,
    /// Queue overflow counter at the time of the tick.
    pub dropped_events: u64,
}

impl TickReport {
    pub fn sample(&self) -> ScoreSample {
        ScoreSample {
            timestamp: self.timestamp,
            final_score: self.score.final_score,
            status: self.score.status,
        }
    }
}

/// Scoring state owned by the pump.
///
/// Not shared: the pump task holds the only instance, so nothing here is
/// behind a lock.
pub struct Monitor {
    accumulator: RiskAccumulator,
    live: LiveWindow,
    scorer: HybridScorer,
    alerts: AlertStateMachine,
    classifier: Option<Arc<dyn Classifier>>,
    history: ScoreHistory,
}

impl Monitor {
    pub fn new(cfg: &MonitorConfig, classifier: Option<Arc<dyn Classifier>>) -> Self {
        Self {
            accumulator: RiskAccumulator::from_config(&cfg.accumulator),
            live: LiveWindow::new(cfg.features.live_buffer_events, cfg.features.ml_window_seconds),
            scorer: HybridScorer::from_config(&cfg.scoring),
            alerts: AlertStateMachine::from_config(&cfg.alerts),
            classifier,
            history: ScoreHistory::new(cfg.pump.history_len),
        }
    }

    /// Ingest the drained events and score at `now`.
    pub fn tick(&mut self, events: Vec<Event>, now: Timestamp) -> TickReport {
        let ingested = events.len();
        for event in events {
            self.accumulator.add_event(event.timestamp, event.risk_weight);
            self.live.push(event);
        }

        let heuristic = self.accumulator.normalized_risk_at(now);
        let features = self.live.latest();
        let probability = guarded_probability(self.classifier.as_deref(), features.as_ref());
        let score = self.scorer.score(heuristic, probability);
        let transition = self.alerts.evaluate(score.status, now);
        let reasons = features.as_ref().map(explain).unwrap_or_default();

        let report = TickReport {
            timestamp: now,
            ingested,
            score,
            features,
            reasons,
            transition,
            dropped_events: 0,
        };
        self.history.push(report.sample());
        report
    }

    pub fn history(&self) -> &ScoreHistory {
        &self.history
    }

    pub fn alerts(&self) -> &AlertStateMachine {
        &self.alerts
    }

    pub fn accumulator(&self) -> &RiskAccumulator {
        &self.accumulator
    }
}

/// Build the classifier described by `[classifier]`, or none when disabled.
pub fn classifier_from_config(cfg: &ClassifierConfig) -> Option<Arc<dyn Classifier>> {
    if cfg.disabled {
        return None;
    }
    let model = match &cfg.model_path {
        Some(path) => LogisticClassifier::load(path),
        None => LogisticClassifier::embedded(),
    };
    Some(Arc::new(model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::model::{FixedClassifier, NullClassifier};
    use crate::detect::Status;
    use crate::event::EventKind;

    fn monitor(classifier: Option<Arc<dyn Classifier>>) -> Monitor {
        Monitor::new(&MonitorConfig::default(), classifier)
    }

    #[test]
    fn test_quiet_tick_is_safe() {
        let mut m = monitor(None);
        let r = m.tick(Vec::new(), 1000.0);
        assert_eq!(r.ingested, 0);
        assert_eq!(r.score.final_score, 0.0);
        assert_eq!(r.score.status, Status::Safe);
        assert!(r.features.is_none());
        assert!(!r.transition.notify);
        assert_eq!(m.history().len(), 1);
    }

    #[test]
    fn test_certain_classifier_alone_reaches_high_risk() {
        // 0.4 * 1.0 * 300 = 120
        let mut m = monitor(Some(Arc::new(FixedClassifier::new(1.0))));
        let r = m.tick(vec![Event::new(1000.0, EventKind::Modified, "a")], 1000.0);
        assert!((r.score.final_score - 120.0).abs() < 1e-9);
        assert_eq!(r.score.status, Status::HighRisk);
        assert!(r.transition.changed);
        assert!(!r.transition.notify);
    }

    #[test]
    fn test_backup_deletes_trigger_attack() {
        let mut m = monitor(Some(Arc::new(NullClassifier)));
        let events = (0..4)
            .map(|i| Event::new(1000.0 + i as f64 * 0.1, EventKind::BackupDelete, "shadow"))
            .collect();
        // 3 increments of 75 => 225, clamped to 1.0 => 0.6 * 300 = 180
        let r = m.tick(events, 1001.0);
        assert_eq!(r.score.heuristic_risk, 1.0);
        assert_eq!(r.score.status, Status::Attack);
        assert!(r.transition.rising_edge);
        assert!(r.transition.notify);
        assert_eq!(m.alerts().last_alert_time(), Some(1001.0));
    }

    #[test]
    fn test_reasons_follow_live_window() {
        let mut m = monitor(None);
        let events = (0..8)
            .map(|i| Event::new(1000.0 + i as f64 * 0.2, EventKind::Renamed, "x.locked"))
            .collect();
        let r = m.tick(events, 1002.0);
        let f = r.features.unwrap();
        assert_eq!(f.rename_count, 8.0);
        assert!(r.reasons.contains(&Reason::RapidRenaming));
    }

    #[test]
    fn test_risk_decays_between_ticks() {
        let mut m = monitor(None);
        let events = vec![
            Event::new(1000.0, EventKind::EncryptOp, "a"),
            Event::new(1001.0, EventKind::EncryptOp, "b"),
        ];
        let hot = m.tick(events, 1001.0);
        assert!(hot.score.heuristic_risk > 0.0);
        let cold = m.tick(Vec::new(), 1100.0);
        assert_eq!(cold.score.heuristic_risk, 0.0);
    }

    #[test]
    fn test_classifier_config() {
        let disabled = ClassifierConfig {
            disabled: true,
            ..Default::default()
        };
        assert!(classifier_from_config(&disabled).is_none());

        let missing = ClassifierConfig {
            model_path: Some("/nonexistent/model.json".into()),
            disabled: false,
        };
        let c = classifier_from_config(&missing).unwrap();
        assert_eq!(c.name(), "logistic");
    }
}
