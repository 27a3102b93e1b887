//! Classifier channel: feature windowing, models, explanations, and
//! labelled dataset generation.

pub mod dataset;
pub mod explain;
pub mod features;
pub mod model;

pub use self::features::{extract_features, FeatureVector, LiveWindow};
pub use self::model::{Classifier, LogisticClassifier};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("malformed feature vector: {0}")]
    Malformed(String),
    #[error("feature length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },
    #[error("failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid model artifact: {0}")]
    Parse(#[from] serde_json::Error),
}
