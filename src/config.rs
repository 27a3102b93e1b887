//! TOML configuration for the ransomwatch monitor.
//!
//! Every section is optional; missing keys fall back to compiled-in defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "RANSOMWATCH_CONFIG";

/// System-wide config location.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/ransomwatch/ransomwatch.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for the monitor process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub accumulator: AccumulatorConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub pump: PumpConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl MonitorConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded monitor configuration");
        Ok(config)
    }

    /// Resolve configuration, in order:
    /// 1. `explicit` (the `--config` flag). A failure here is an error.
    /// 2. The path in `RANSOMWATCH_CONFIG`.
    /// 3. `/etc/ransomwatch/ransomwatch.toml`.
    /// 4. Compiled-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => Ok(Self::load_or_default()),
        }
    }

    /// Steps 2-4 of [`MonitorConfig::resolve`]; never fails.
    pub fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "RANSOMWATCH_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let system_path = Path::new(SYSTEM_CONFIG_PATH);
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %system_path.display(),
                        error = %e,
                        "system config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Accumulator
// ---------------------------------------------------------------------------

/// Heuristic risk accumulator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccumulatorConfig {
    /// Samples older than this many seconds are purged before every read.
    pub decay_window_seconds: f64,
    /// Windowed risk that maps to a normalized risk of 1.0.
    pub max_risk_score: f64,
}

impl Default for AccumulatorConfig {
    fn default() -> Self {
        Self {
            decay_window_seconds: 60.0,
            max_risk_score: 200.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Hybrid score fusion and status thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub high_risk_threshold: f64,
    pub attack_threshold: f64,
    /// Multiplier applied to the fused [0,1] score.
    pub scale: f64,
    /// Share of the heuristic channel; the classifier gets the remainder.
    pub heuristic_weight: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            high_risk_threshold: 80.0,
            attack_threshold: 130.0,
            scale: 300.0,
            heuristic_weight: 0.6,
        }
    }
}

// ---------------------------------------------------------------------------
// Features
// ---------------------------------------------------------------------------

/// Feature windowing for the classifier channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub ml_window_seconds: f64,
    /// Size of the trailing event buffer used while monitoring live.
    pub live_buffer_events: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            ml_window_seconds: 10.0,
            live_buffer_events: 50,
        }
    }
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Minimum seconds between two outbound notifications.
    pub alert_cooldown_seconds: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            alert_cooldown_seconds: 120.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Pump
// ---------------------------------------------------------------------------

/// Consumer loop timing and presentation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PumpConfig {
    pub tick_interval_ms: u64,
    /// Number of score samples kept for presentation.
    pub history_len: usize,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 500,
            history_len: 300,
        }
    }
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

/// What a full event queue does with a new event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued event to make room (keeps the freshest signal).
    DropOldest,
    /// Discard the incoming event.
    DropNewest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub capacity: usize,
    pub overflow: OverflowPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            overflow: OverflowPolicy::DropOldest,
        }
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// JSON logistic model artifact. When unset the embedded default is used.
    pub model_path: Option<PathBuf>,
    /// Run heuristic-only scoring.
    pub disabled: bool,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Endpoint receiving a JSON POST for every fired alert.
    pub webhook_url: Option<String>,
    /// SQLite file recording fired alerts.
    pub incident_db: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// API
// ---------------------------------------------------------------------------

/// Read-only status API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub enabled: bool,
    pub bind: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
