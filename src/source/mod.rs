//! Event producers: a synthetic activity generator and a filesystem watcher.
//!
//! Sources never touch scoring state. They only push [`Event`]s onto the
//! shared [`EventQueue`], which the pump drains once per tick.
//!
//! [`Event`]: crate::event::Event

pub mod queue;
pub mod synthetic;
pub mod watcher;

pub use self::queue::EventQueue;
pub use self::synthetic::{SimulationMode, SyntheticSource};
pub use self::watcher::WatcherSource;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    #[error("watch root does not exist: {0}")]
    MissingRoot(PathBuf),
}

/// Common control surface of every running producer.
pub trait EventSource: Send {
    fn name(&self) -> &'static str;

    fn is_running(&self) -> bool;

    /// Stop producing and release OS resources. Safe to call repeatedly.
    fn stop(&mut self);
}
