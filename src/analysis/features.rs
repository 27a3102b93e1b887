//! Time-window feature extraction for the classifier.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use super::ClassifierError;
use crate::event::{Event, EventKind};

/// Fixed five-feature summary of one time window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    pub modify_count: f64,
    pub rename_count: f64,
    pub delete_ratio: f64,
    pub operation_entropy: f64,
    pub burstiness: f64,
}

impl FeatureVector {
    pub const LEN: usize = 5;

    pub const NAMES: [&'static str; Self::LEN] = [
        "modify_count",
        "rename_count",
        "delete_ratio",
        "operation_entropy",
        "burstiness",
    ];

    pub fn to_array(&self) -> [f64; Self::LEN] {
        [
            self.modify_count,
            self.rename_count,
            self.delete_ratio,
            self.operation_entropy,
            self.burstiness,
        ]
    }

    pub fn from_slice(values: &[f64]) -> Result<Self, ClassifierError> {
        if values.len() != Self::LEN {
            return Err(ClassifierError::LengthMismatch {
                expected: Self::LEN,
                got: values.len(),
            });
        }
        Ok(Self {
            modify_count: values[0],
            rename_count: values[1],
            delete_ratio: values[2],
            operation_entropy: values[3],
            burstiness: values[4],
        })
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

/// Shannon entropy in bits of a frequency distribution. Empty input is 0.
pub fn shannon_entropy<I>(counts: I) -> f64
where
    I: IntoIterator<Item = usize>,
{
    let counts: Vec<usize> = counts.into_iter().filter(|&c| c > 0).collect();
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    let h: f64 = counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p.log2()
        })
        .sum();
    // Avoid reporting -0.0 for single-kind windows.
    (-h).max(0.0)
}

fn process_window(window: &[&Event], window_seconds: f64) -> FeatureVector {
    let total = window.len();
    let mut by_kind: BTreeMap<EventKind, usize> = BTreeMap::new();
    let (mut modify, mut rename, mut delete) = (0usize, 0usize, 0usize);

    for e in window {
        *by_kind.entry(e.kind).or_default() += 1;
        if e.kind.is_modify() {
            modify += 1;
        }
        if e.kind.is_rename() {
            rename += 1;
        }
        if e.kind.is_delete() {
            delete += 1;
        }
    }

    FeatureVector {
        modify_count: modify as f64,
        rename_count: rename as f64,
        delete_ratio: if total > 0 {
            delete as f64 / total as f64
        } else {
            0.0
        },
        operation_entropy: shannon_entropy(by_kind.into_values()),
        burstiness: total as f64 / window_seconds,
    }
}

/// Partition `events` into consecutive windows of `window_seconds` and
/// summarize each one.
///
/// Events are stably sorted by timestamp. The first window starts at the
/// earliest timestamp; an event with `ts <= end` stays in the current window,
/// so an event exactly on the boundary closes it rather than opening the next.
/// The next window always starts at the previous end, even after a gap. The
/// trailing partial window is emitted. A non-positive `window_seconds` yields
/// nothing.
pub fn extract_features(events: &[Event], window_seconds: f64) -> Vec<FeatureVector> {
    let mut vectors = Vec::new();
    if events.is_empty() || !(window_seconds > 0.0) {
        return vectors;
    }

    let mut sorted: Vec<&Event> = events.iter().collect();
    sorted.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

    let mut end = sorted[0].timestamp + window_seconds;
    let mut current: Vec<&Event> = Vec::new();

    for event in sorted {
        if event.timestamp <= end {
            current.push(event);
        } else {
            vectors.push(process_window(&current, window_seconds));
            current.clear();
            current.push(event);
            end += window_seconds;
        }
    }

    if !current.is_empty() {
        vectors.push(process_window(&current, window_seconds));
    }

    vectors
}

/// Trailing buffer of recent events for live scoring.
///
/// The buffer is bounded by count, not age. Once activity stops, the last
/// feature vector (and the classifier probability derived from it) stays put
/// until new events displace the old ones; only the heuristic channel decays
/// with time.
#[derive(Debug, Clone)]
pub struct LiveWindow {
    events: VecDeque<Event>,
    capacity: usize,
    window_seconds: f64,
}

impl LiveWindow {
    pub fn new(capacity: usize, window_seconds: f64) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            window_seconds,
        }
    }

    /// Append, evicting the oldest event once full.
    pub fn push(&mut self, event: Event) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Feature vector of the most recent window over the buffer.
    pub fn latest(&mut self) -> Option<FeatureVector> {
        extract_features(self.events.make_contiguous(), self.window_seconds).pop()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
