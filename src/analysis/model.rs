use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use super::{ClassifierError, FeatureVector};

// Embedded default model for fallback
const DEFAULT_MODEL_JSON: &str = include_str!("ransomware_lr.json");

/// Probability that a feature window reflects ransomware activity.
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    /// Returns a probability in `[0, 1]`.
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, ClassifierError>;
}

/// Always 0. Equivalent to running without a model.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullClassifier;

impl Classifier for NullClassifier {
    fn name(&self) -> &str {
        "null"
    }

    fn predict_probability(&self, _features: &FeatureVector) -> Result<f64, ClassifierError> {
        Ok(0.0)
    }
}

/// Returns the same probability for every input.
#[derive(Debug, Clone, Copy)]
pub struct FixedClassifier {
    probability: f64,
}

impl FixedClassifier {
    pub fn new(probability: f64) -> Self {
        Self { probability }
    }
}

impl Classifier for FixedClassifier {
    fn name(&self) -> &str {
        "fixed"
    }

    fn predict_probability(&self, _features: &FeatureVector) -> Result<f64, ClassifierError> {
        Ok(self.probability)
    }
}

/// Step function over burstiness: the probability of the highest
/// `(min_burstiness, probability)` row not above the input, else 0.
#[derive(Debug, Clone, Default)]
pub struct TableClassifier {
    rows: Vec<(f64, f64)>,
}

impl TableClassifier {
    pub fn new(mut rows: Vec<(f64, f64)>) -> Self {
        rows.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { rows }
    }
}

impl Classifier for TableClassifier {
    fn name(&self) -> &str {
        "table"
    }

    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, ClassifierError> {
        if !features.burstiness.is_finite() {
            return Err(ClassifierError::Malformed("non-finite burstiness".into()));
        }
        Ok(self
            .rows
            .iter()
            .rev()
            .find(|(min, _)| features.burstiness >= *min)
            .map_or(0.0, |(_, p)| *p))
    }
}

/// Binary logistic regression over standardized features.
#[derive(Debug, Clone, Deserialize)]
pub struct LogisticClassifier {
    pub feature_names: Vec<String>,
    pub weights: Vec<f64>,
    pub bias: f64,
    pub means: Vec<f64>, // For standardization
    pub stds: Vec<f64>,  // For standardization
}

impl LogisticClassifier {
    /// Parse and validate a JSON artifact.
    pub fn from_json(json: &str) -> Result<Self, ClassifierError> {
        let model: Self = serde_json::from_str(json)?;
        for (what, len) in [
            ("weights", model.weights.len()),
            ("means", model.means.len()),
            ("stds", model.stds.len()),
        ] {
            if len != FeatureVector::LEN {
                return Err(ClassifierError::Malformed(format!(
                    "{} has {} entries, expected {}",
                    what,
                    len,
                    FeatureVector::LEN
                )));
            }
        }
        Ok(model)
    }

    pub fn from_file(path: &Path) -> Result<Self, ClassifierError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Compiled-in model.
    pub fn embedded() -> Self {
        Self::from_json(DEFAULT_MODEL_JSON).expect("Embedded default model is invalid")
    }

    /// Load model from JSON file, falling back to embedded default if missing/invalid.
    pub fn load(path: &Path) -> Self {
        match Self::from_file(path) {
            Ok(model) => {
                info!(path = %path.display(), "loaded classifier model");
                model
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "classifier model unusable, using embedded default");
                Self::embedded()
            }
        }
    }
}

impl Classifier for LogisticClassifier {
    fn name(&self) -> &str {
        "logistic"
    }

    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, ClassifierError> {
        if !features.is_finite() {
            return Err(ClassifierError::Malformed("non-finite feature value".into()));
        }

        let raw = features.to_array();
        let mut z = self.bias;
        for (i, val) in raw.iter().enumerate() {
            // A zero spread carries no information; leave the value centred.
            let std = if self.stds[i].abs() > f64::EPSILON { self.stds[i] } else { 1.0 };
            z += self.weights[i] * (val - self.means[i]) / std;
        }

        Ok(1.0 / (1.0 + (-z).exp()))
    }
}
