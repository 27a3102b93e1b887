use std::collections::VecDeque;

use crate::config::AccumulatorConfig;
use crate::event::{unix_now, Timestamp};

/// Time-windowed heuristic risk.
///
/// Keeps a running total of every weight ever added plus the
/// `(timestamp, running_total)` samples that are still inside the decay
/// window. The windowed risk is the growth of the running total across the
/// retained samples.
#[derive(Debug, Clone)]
pub struct RiskAccumulator {
    decay_window: f64,
    max_risk_score: f64,
    cumulative_total: u64,
    window: VecDeque<(Timestamp, u64)>,
}

impl RiskAccumulator {
    pub fn new(decay_window: f64, max_risk_score: f64) -> Self {
        Self {
            decay_window,
            max_risk_score,
            cumulative_total: 0,
            window: VecDeque::new(),
        }
    }

    pub fn from_config(cfg: &AccumulatorConfig) -> Self {
        Self::new(cfg.decay_window_seconds, cfg.max_risk_score)
    }

    /// Record a weighted observation. Callers feed timestamps in
    /// non-decreasing order.
    pub fn add_event(&mut self, timestamp: Timestamp, weight: u32) {
        self.cumulative_total += u64::from(weight);
        self.window.push_back((timestamp, self.cumulative_total));
    }

    /// Drop samples strictly older than `now - decay_window`.
    fn purge(&mut self, now: Timestamp) {
        let cutoff = now - self.decay_window;
        while self.window.front().is_some_and(|&(ts, _)| ts < cutoff) {
            self.window.pop_front();
        }
    }

    /// Increase of the running total across the retained samples.
    pub fn windowed_risk_at(&mut self, now: Timestamp) -> u64 {
        self.purge(now);
        match (self.window.front(), self.window.back()) {
            (Some(&(_, first)), Some(&(_, last))) if self.window.len() >= 2 => last - first,
            _ => 0,
        }
    }

    pub fn windowed_risk(&mut self) -> u64 {
        self.windowed_risk_at(unix_now())
    }

    /// Windowed risk scaled into `[0, 1]`.
    pub fn normalized_risk_at(&mut self, now: Timestamp) -> f64 {
        let risk = self.windowed_risk_at(now) as f64;
        if self.max_risk_score <= 0.0 {
            return if risk > 0.0 { 1.0 } else { 0.0 };
        }
        (risk / self.max_risk_score).min(1.0)
    }

    /// [`RiskAccumulator::normalized_risk_at`] against the wall clock.
    pub fn normalized_risk(&mut self) -> f64 {
        self.normalized_risk_at(unix_now())
    }

    pub fn cumulative_total(&self) -> u64 {
        self.cumulative_total
    }

    /// Retained samples (before any pending purge).
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

impl Default for RiskAccumulator {
    fn default() -> Self {
        Self::from_config(&AccumulatorConfig::default())
    }
}
