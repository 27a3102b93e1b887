use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::Monitor;
use crate::event::unix_now;
use crate::sink::{AlertMessage, Notifier, PresentationSink};
use crate::source::EventQueue;

/// Everything the pump reports to.
pub struct Collaborators {
    pub notifier: Arc<dyn Notifier>,
    pub presenters: Vec<Arc<dyn PresentationSink>>,
}

/// Main consumer loop.
///
/// Every `tick` the queue is drained into the monitor and the result is
/// handed to the presentation sinks. Notifications run on their own tasks so
/// a slow endpoint never delays scoring. Returns the monitor once `cancel`
/// fires and in-flight notifications have settled.
pub async fn run_pump(
    mut monitor: Monitor,
    queue: EventQueue,
    collaborators: Collaborators,
    tick: Duration,
    cancel: CancellationToken,
) -> Monitor {
    info!(tick_ms = tick.as_millis() as u64, "pump started");

    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        let events = queue.drain();
        let mut report = monitor.tick(events, unix_now());
        report.dropped_events = queue.dropped();

        if report.ingested > 0 {
            debug!(
                ingested = report.ingested,
                score = report.score.final_score,
                status = %report.score.status,
                "tick"
            );
        }

        for presenter in &collaborators.presenters {
            if report.transition.changed {
                presenter.status_changed(&report.transition);
            }
            presenter.publish(&report, monitor.history());
        }

        if report.transition.notify {
            let notifier = collaborators.notifier.clone();
            let message = AlertMessage::from_report(&report);
            in_flight.spawn(async move {
                if let Err(e) = notifier.notify(&message).await {
                    warn!(notifier = notifier.name(), error = %e, "alert notification failed");
                }
            });
        } else if report.transition.rising_edge {
            info!(score = report.score.final_score, "ATTACK again within cooldown, notification suppressed");
        }

        while in_flight.try_join_next().is_some() {}
    }

    while in_flight.join_next().await.is_some() {}
    info!("pump stopped");
    monitor
}
