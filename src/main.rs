use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use ransomwatch::analysis::dataset::{self, DatasetSpec};
use ransomwatch::analysis::explain::explain;
use ransomwatch::analysis::extract_features;
use ransomwatch::config::{LoggingConfig, MonitorConfig};
use ransomwatch::event::{Event, EventKind};
use ransomwatch::source::SimulationMode;

#[derive(Parser)]
#[command(
    name = "ransomwatch",
    about = "Real-time ransomware detection from file-activity events",
    version,
    long_about = None
)]
struct Cli {
    /// Configuration file (overrides RANSOMWATCH_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the detector (sources + pump + status API) until Ctrl-C
    Monitor {
        /// Generate synthetic activity in the given mode
        #[arg(long, value_enum)]
        simulate: Option<SimulationMode>,

        /// Watch a directory tree recursively
        #[arg(long)]
        watch: Option<PathBuf>,

        /// Seed for the synthetic source
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print feature vectors for a JSON array of events
    Features {
        /// Input file: [{"timestamp": .., "kind": "renamed", "file": ..}, ...]
        #[arg(long)]
        input: PathBuf,

        /// Window length in seconds [default: features.ml_window_seconds]
        #[arg(long)]
        window: Option<f64>,
    },

    /// Write a synthetic labelled dataset as JSON lines
    Dataset {
        /// Output file path
        #[arg(long)]
        output: PathBuf,

        /// Sequences per class
        #[arg(long, default_value = "200")]
        sequences: usize,

        /// Events per sequence
        #[arg(long, default_value = "50")]
        events: usize,

        /// Window length in seconds
        #[arg(long, default_value = "10")]
        window: f64,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Event as accepted on input; the weight always comes from the kind.
#[derive(Deserialize)]
struct EventRecord {
    timestamp: f64,
    kind: EventKind,
    #[serde(default)]
    file: String,
}

fn env_filter(default_level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level))
}

/// Resolve configuration under a temporary stderr subscriber so fallback
/// warnings are visible before `[logging]` is known.
fn resolve_config(explicit: Option<&std::path::Path>) -> Result<MonitorConfig> {
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(env_filter("warn"))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::with_default(bootstrap, || MonitorConfig::resolve(explicit))
}

fn init_tracing(cfg: &LoggingConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(&cfg.level))
        .with_writer(std::io::stderr);
    if cfg.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Monitor {
            simulate,
            watch,
            seed,
        } => {
            tracing::info!("Starting ransomwatch monitor");
            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => tracing::info!("Ctrl-C received"),
                    Err(e) => tracing::error!(error = %e, "failed to listen for Ctrl-C"),
                }
                on_signal.cancel();
            });

            let plan = ransomwatch::SourcePlan {
                simulate,
                watch,
                seed,
            };
            ransomwatch::run(config, plan, cancel).await?;
        }
        Commands::Features { input, window } => {
            let content = std::fs::read_to_string(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let records: Vec<EventRecord> = serde_json::from_str(&content)
                .with_context(|| format!("failed to parse events in {}", input.display()))?;
            let events: Vec<Event> = records
                .into_iter()
                .map(|r| Event::new(r.timestamp, r.kind, r.file))
                .collect();

            let window = window.unwrap_or(config.features.ml_window_seconds);
            let vectors = extract_features(&events, window);
            println!("{:<6} {:>8} {:>8} {:>8} {:>8} {:>8}  Reasons", "Window", "modify", "rename", "del_rat", "entropy", "burst");
            for (i, f) in vectors.iter().enumerate() {
                let reasons: Vec<String> = explain(f).iter().map(|r| r.to_string()).collect();
                println!(
                    "{:<6} {:>8.0} {:>8.0} {:>8.3} {:>8.3} {:>8.3}  {}",
                    i,
                    f.modify_count,
                    f.rename_count,
                    f.delete_ratio,
                    f.operation_entropy,
                    f.burstiness,
                    reasons.join("; ")
                );
            }
            println!("\n{} events, {} windows", events.len(), vectors.len());
        }
        Commands::Dataset {
            output,
            sequences,
            events,
            window,
            seed,
        } => {
            let spec = DatasetSpec {
                sequences,
                events_per_sequence: events,
                window_seconds: window,
            };
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let samples = dataset::generate(&spec, &mut rng);
            let file = File::create(&output)
                .with_context(|| format!("failed to create {}", output.display()))?;
            dataset::write_jsonl(&samples, BufWriter::new(file))?;
            let malicious = samples.iter().filter(|s| s.label == 1).count();
            println!(
                "Wrote {} samples ({} benign, {} malicious) to {}",
                samples.len(),
                samples.len() - malicious,
                malicious,
                output.display()
            );
        }
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
