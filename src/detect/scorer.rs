use serde::Serialize;
use tracing::{debug, warn};

use crate::analysis::features::FeatureVector;
use crate::analysis::model::Classifier;
use crate::config::ScoringConfig;
use crate::detect::Status;

/// Result of fusing both channels for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Score {
    pub heuristic_risk: f64,
    pub classifier_probability: f64,
    pub final_score: f64,
    pub status: Status,
}

/// Weighted fusion of heuristic risk and classifier probability.
#[derive(Debug, Clone)]
pub struct HybridScorer {
    heuristic_weight: f64,
    scale: f64,
    high_risk_threshold: f64,
    attack_threshold: f64,
}

impl HybridScorer {
    pub fn from_config(cfg: &ScoringConfig) -> Self {
        Self {
            heuristic_weight: cfg.heuristic_weight.clamp(0.0, 1.0),
            scale: cfg.scale,
            high_risk_threshold: cfg.high_risk_threshold,
            attack_threshold: cfg.attack_threshold,
        }
    }

    /// `(w * heuristic + (1 - w) * probability) * scale`
    pub fn fuse(&self, heuristic_risk: f64, classifier_probability: f64) -> f64 {
        let blended = self.heuristic_weight * heuristic_risk
            + (1.0 - self.heuristic_weight) * classifier_probability;
        blended * self.scale
    }

    /// Stateless mapping from score to status.
    pub fn classify(&self, final_score: f64) -> Status {
        if final_score < self.high_risk_threshold {
            Status::Safe
        } else if final_score < self.attack_threshold {
            Status::HighRisk
        } else {
            Status::Attack
        }
    }

    pub fn score(&self, heuristic_risk: f64, classifier_probability: f64) -> Score {
        let final_score = self.fuse(heuristic_risk, classifier_probability);
        Score {
            heuristic_risk,
            classifier_probability,
            final_score,
            status: self.classify(final_score),
        }
    }
}

impl Default for HybridScorer {
    fn default() -> Self {
        Self::from_config(&ScoringConfig::default())
    }
}

/// Ask the classifier for a probability, degrading to 0 on any failure.
///
/// Missing classifier, missing features, inference errors and results outside
/// `[0, 1]` all yield 0 so that scoring continues heuristic-only.
pub fn guarded_probability(
    classifier: Option<&dyn Classifier>,
    features: Option<&FeatureVector>,
) -> f64 {
    let (Some(classifier), Some(features)) = (classifier, features) else {
        return 0.0;
    };

    match classifier.predict_probability(features) {
        Ok(p) if p.is_finite() && (0.0..=1.0).contains(&p) => p,
        Ok(p) => {
            warn!(probability = p, "classifier returned out-of-range probability, ignoring");
            0.0
        }
        Err(e) => {
            debug!(error = %e, "classifier inference failed, scoring heuristic-only");
            0.0
        }
    }
}
