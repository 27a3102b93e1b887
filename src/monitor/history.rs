//! Rolling score history for presentation.

use std::collections::VecDeque;

use serde::Serialize;

use crate::detect::Status;
use crate::event::Timestamp;

/// One tick as shown to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreSample {
    pub timestamp: Timestamp,
    pub final_score: f64,
    pub status: Status,
}

/// Bounded FIFO of the most recent samples.
#[derive(Debug, Clone)]
pub struct ScoreHistory {
    samples: VecDeque<ScoreSample>,
    capacity: usize,
}

impl ScoreHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: ScoreSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn latest(&self) -> Option<&ScoreSample> {
        self.samples.back()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ScoreSample> {
        self.samples.iter()
    }

    pub fn to_vec(&self) -> Vec<ScoreSample> {
        self.samples.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ts: f64) -> ScoreSample {
        ScoreSample {
            timestamp: ts,
            final_score: ts * 10.0,
            status: Status::Safe,
        }
    }

    #[test]
    fn test_history_is_capped() {
        let mut h = ScoreHistory::new(3);
        for i in 0..5 {
            h.push(sample(i as f64));
        }
        assert_eq!(h.len(), 3);
        let ts: Vec<f64> = h.iter().map(|s| s.timestamp).collect();
        assert_eq!(ts, vec![2.0, 3.0, 4.0]);
        assert_eq!(h.latest().map(|s| s.timestamp), Some(4.0));
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let mut h = ScoreHistory::new(0);
        h.push(sample(1.0));
        h.push(sample(2.0));
        assert_eq!(h.capacity(), 1);
        assert_eq!(h.to_vec(), vec![sample(2.0)]);
    }
}
