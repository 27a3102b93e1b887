use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use super::PresentationSink;
use crate::analysis::FeatureVector;
use crate::detect::{Score, Status};
use crate::event::Timestamp;
use crate::monitor::{ScoreHistory, ScoreSample, TickReport};

/// Point-in-time view served by `/status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub timestamp: Timestamp,
    pub score: Score,
    pub features: Option<FeatureVector>,
    pub reasons: Vec<String>,
    pub dropped_events: u64,
    pub last_change: Option<Timestamp>,
}

#[derive(Default)]
struct State {
    latest: Option<StatusSnapshot>,
    history: Vec<ScoreSample>,
    last_change: Option<Timestamp>,
}

/// Shared read-mostly handle: the pump writes, API handlers read.
#[derive(Clone, Default)]
pub struct Dashboard {
    state: Arc<RwLock<State>>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<StatusSnapshot> {
        self.state.read().latest.clone()
    }

    pub fn status(&self) -> Status {
        self.state
            .read()
            .latest
            .as_ref()
            .map_or(Status::Safe, |s| s.score.status)
    }

    pub fn history(&self) -> Vec<ScoreSample> {
        self.state.read().history.clone()
    }
}

impl PresentationSink for Dashboard {
    fn publish(&self, report: &TickReport, history: &ScoreHistory) {
        let mut state = self.state.write();
        if report.transition.changed {
            state.last_change = Some(report.timestamp);
        }
        state.latest = Some(StatusSnapshot {
            timestamp: report.timestamp,
            score: report.score,
            features: report.features,
            reasons: report.reasons.iter().map(|r| r.to_string()).collect(),
            dropped_events: report.dropped_events,
            last_change: state.last_change,
        });
        state.history = history.to_vec();
    }
}
