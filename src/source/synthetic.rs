//! Synthetic file-activity generator for demos and end-to-end tests.

use std::ops::Range;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{EventQueue, EventSource};
use crate::event::{Event, EventKind, Timestamp};

pub const SIMULATED_FILE: &str = "SimulatedFile";

const NORMAL_KINDS: &[EventKind] = &[EventKind::NormalAccess, EventKind::NormalModify];
const MALICIOUS_KINDS: &[EventKind] = &[
    EventKind::EncryptOp,
    EventKind::Renamed,
    EventKind::MassRead,
    EventKind::BackupDelete,
];

/// Behaviour profile of the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SimulationMode {
    /// Slow, low-risk user activity.
    Normal,
    /// Rapid encryption, renames, and backup deletion.
    Malicious,
}

impl SimulationMode {
    pub fn kinds(self) -> &'static [EventKind] {
        match self {
            SimulationMode::Normal => NORMAL_KINDS,
            SimulationMode::Malicious => MALICIOUS_KINDS,
        }
    }

    /// Pause between two emitted events, in seconds.
    pub fn delay_range(self) -> Range<f64> {
        match self {
            SimulationMode::Normal => 0.8..1.5,
            SimulationMode::Malicious => 0.1..0.4,
        }
    }
}

/// Draw one event for `mode` and the delay before the next one.
pub fn next_event<R: Rng>(mode: SimulationMode, rng: &mut R, now: Timestamp) -> (Event, Duration) {
    let kinds = mode.kinds();
    let kind = kinds[rng.gen_range(0..kinds.len())];
    let delay = rng.gen_range(mode.delay_range());
    (
        Event::new(now, kind, SIMULATED_FILE),
        Duration::from_secs_f64(delay),
    )
}

/// Background task emitting synthetic events onto a queue.
pub struct SyntheticSource {
    mode_tx: watch::Sender<SimulationMode>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl SyntheticSource {
    /// Spawn the generator on the current tokio runtime.
    pub fn spawn(queue: EventQueue, mode: SimulationMode) -> Self {
        Self::spawn_with_rng(queue, mode, StdRng::from_entropy())
    }

    /// Deterministic variant for tests.
    pub fn spawn_seeded(queue: EventQueue, mode: SimulationMode, seed: u64) -> Self {
        Self::spawn_with_rng(queue, mode, StdRng::seed_from_u64(seed))
    }

    fn spawn_with_rng(queue: EventQueue, mode: SimulationMode, rng: StdRng) -> Self {
        let (mode_tx, mode_rx) = watch::channel(mode);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(queue, mode_rx, cancel.clone(), rng));
        info!(?mode, "synthetic source started");
        Self {
            mode_tx,
            cancel,
            handle: Some(handle),
        }
    }

    /// Switch behaviour; takes effect from the next emitted event.
    pub fn set_mode(&self, mode: SimulationMode) {
        self.mode_tx.send_replace(mode);
        info!(?mode, "synthetic source mode changed");
    }

    pub fn mode(&self) -> SimulationMode {
        *self.mode_tx.borrow()
    }

    /// Stop and wait for the task to finish.
    pub async fn shutdown(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl EventSource for SyntheticSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn stop(&mut self) {
        if !self.cancel.is_cancelled() {
            self.cancel.cancel();
            debug!("synthetic source stop requested");
        }
    }
}

impl Drop for SyntheticSource {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    queue: EventQueue,
    mode_rx: watch::Receiver<SimulationMode>,
    cancel: CancellationToken,
    mut rng: StdRng,
) {
    loop {
        let mode = *mode_rx.borrow();
        let (event, delay) = next_event(mode, &mut rng, crate::event::unix_now());
        if !queue.push(event) {
            debug!("event queue full, synthetic event dropped");
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }
    debug!("synthetic source stopped");
}
