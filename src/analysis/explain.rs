//! Human-readable reasons behind a feature window.

use serde::Serialize;

use super::FeatureVector;

const RENAME_COUNT_LIMIT: f64 = 5.0;
const DELETE_RATIO_LIMIT: f64 = 0.3;
const BURSTINESS_LIMIT: f64 = 10.0;
const ENTROPY_LIMIT: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    RapidRenaming,
    HighDeletionRatio,
    OperationBurst,
    RandomizedBehavior,
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Reason::RapidRenaming => "Rapid file renaming detected",
            Reason::HighDeletionRatio => "High file deletion ratio",
            Reason::OperationBurst => "Sudden burst of file operations",
            Reason::RandomizedBehavior => "Highly random file behavior",
        };
        f.write_str(text)
    }
}

pub fn explain(features: &FeatureVector) -> Vec<Reason> {
    let mut reasons = Vec::new();
    if features.rename_count > RENAME_COUNT_LIMIT {
        reasons.push(Reason::RapidRenaming);
    }
    if features.delete_ratio > DELETE_RATIO_LIMIT {
        reasons.push(Reason::HighDeletionRatio);
    }
    if features.burstiness > BURSTINESS_LIMIT {
        reasons.push(Reason::OperationBurst);
    }
    if features.operation_entropy > ENTROPY_LIMIT {
        reasons.push(Reason::RandomizedBehavior);
    }
    reasons
}
