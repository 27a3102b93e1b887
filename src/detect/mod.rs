//! Heuristic risk accumulation, hybrid scoring, and alerting.

pub mod accumulator;
pub mod alert;
pub mod incident;
pub mod scorer;

pub use self::accumulator::RiskAccumulator;
pub use self::alert::{AlertStateMachine, Transition};
pub use self::scorer::{HybridScorer, Score};

/// Overall verdict for one scoring tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Safe,
    HighRisk,
    Attack,
}

impl Status {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SAFE" => Some(Status::Safe),
            "HIGH_RISK" | "HIGH RISK" => Some(Status::HighRisk),
            "ATTACK" => Some(Status::Attack),
            _ => None,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Safe => write!(f, "SAFE"),
            Status::HighRisk => write!(f, "HIGH_RISK"),
            Status::Attack => write!(f, "ATTACK"),
        }
    }
}

/// A fired alert as recorded in the alert log.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Incident {
    pub id: uuid::Uuid,
    pub status: Status,
    pub final_score: f64,
    pub subject: String,
    pub evidence: serde_json::Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
