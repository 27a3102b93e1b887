//! Ransomwatch -- real-time ransomware detection from file-activity events.
//!
//! Event sources feed a bounded queue; a single pump drains it on a fixed
//! tick, fuses a decaying heuristic risk score with a classifier probability,
//! and raises debounced alerts.

pub mod analysis;
pub mod api;
pub mod config;
pub mod detect;
pub mod event;
pub mod monitor;
pub mod sink;
pub mod source;
pub mod storage;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::config::MonitorConfig;
use crate::detect::incident::IncidentManager;
use crate::monitor::{Collaborators, Monitor};
use crate::sink::{
    CueLogger, Dashboard, FanoutNotifier, IncidentRecorder, LogNotifier, Notifier,
    PresentationSink, WebhookNotifier,
};
use crate::source::{EventQueue, EventSource, SimulationMode, SyntheticSource, WatcherSource};

/// Which producers to start.
#[derive(Debug, Clone, Default)]
pub struct SourcePlan {
    pub simulate: Option<SimulationMode>,
    pub watch: Option<PathBuf>,
    /// Seed for the synthetic source.
    pub seed: Option<u64>,
}

/// Run the monitor until `cancel` fires: sources, pump, and status API.
///
/// With neither a simulation mode nor a watch root, the synthetic source
/// starts in normal mode.
pub async fn run(config: MonitorConfig, plan: SourcePlan, cancel: CancellationToken) -> Result<()> {
    let queue = EventQueue::from_config(&config.queue);

    // 1. Alert log
    let incidents = match &config.notify.incident_db {
        Some(path) => {
            tracing::info!(path = %path.display(), "opening alert log");
            let pool = storage::open_pool(path)
                .with_context(|| format!("failed to open alert log {}", path.display()))?;
            Some(IncidentManager::new(pool))
        }
        None => None,
    };

    // 2. Collaborators
    let mut notifier = FanoutNotifier::new(vec![Arc::new(LogNotifier)]);
    if let Some(url) = &config.notify.webhook_url {
        notifier.push(Arc::new(WebhookNotifier::new(url.clone())?));
    }
    if let Some(incidents) = &incidents {
        notifier.push(Arc::new(IncidentRecorder::new(incidents.clone())));
    }
    let dashboard = Dashboard::new();
    let presenters: Vec<Arc<dyn PresentationSink>> = vec![Arc::new(dashboard.clone()), Arc::new(CueLogger)];
    let notifier: Arc<dyn Notifier> = Arc::new(notifier);

    // 3. API
    let api = if config.api.enabled {
        let addr: std::net::SocketAddr = config
            .api
            .bind
            .parse()
            .with_context(|| format!("invalid API bind address {}", config.api.bind))?;
        let app = api::router(api::state::AppState {
            dashboard: dashboard.clone(),
            incidents: incidents.clone(),
        });
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        tracing::info!(%addr, "status API listening");
        let shutdown = cancel.clone();
        Some(tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
        }))
    } else {
        None
    };

    // 4. Pump
    let classifier = monitor::classifier_from_config(&config.classifier);
    match &classifier {
        Some(c) => tracing::info!(classifier = c.name(), "hybrid scoring enabled"),
        None => tracing::info!("classifier disabled, scoring heuristic-only"),
    }
    let pump = tokio::spawn(monitor::run_pump(
        Monitor::new(&config, classifier),
        queue.clone(),
        Collaborators { notifier, presenters },
        Duration::from_millis(config.pump.tick_interval_ms.max(1)),
        cancel.child_token(),
    ));

    // 5. Sources
    let mut watcher = match &plan.watch {
        Some(root) => match WatcherSource::start(root.clone(), queue.clone()) {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::error!(error = %e, "filesystem watcher unavailable");
                None
            }
        },
        None => None,
    };
    let simulate = plan
        .simulate
        .or(if plan.watch.is_none() { Some(SimulationMode::Normal) } else { None });
    let mut synthetic = simulate.map(|mode| match plan.seed {
        Some(seed) => SyntheticSource::spawn_seeded(queue.clone(), mode, seed),
        None => SyntheticSource::spawn(queue.clone(), mode),
    });
    if watcher.is_none() && synthetic.is_none() {
        cancel.cancel();
        pump.await.ok();
        anyhow::bail!("no event source could be started");
    }

    cancel.cancelled().await;
    tracing::info!("shutting down");

    if let Some(w) = watcher.as_mut() {
        w.stop();
    }
    if let Some(s) = synthetic.as_mut() {
        s.shutdown().await;
    }
    let monitor = pump.await.context("pump task panicked")?;
    if let Some(api) = api {
        api.await.context("API task panicked")??;
    }

    tracing::info!(
        samples = monitor.history().len(),
        dropped = queue.dropped(),
        final_status = %dashboard.status(),
        "monitor stopped"
    );
    Ok(())
}
