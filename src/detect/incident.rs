use crate::detect::{Incident, Status};
use crate::storage::Pool;
use anyhow::Result;
use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

/// Read/write access to the `incidents` alert log.
#[derive(Clone)]
pub struct IncidentManager {
    pool: Pool,
}

impl IncidentManager {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn record_incident(
        &self,
        status: Status,
        final_score: f64,
        subject: &str,
        evidence: serde_json::Value,
    ) -> Result<Uuid> {
        let conn = self.pool.get()?;
        let id = Uuid::new_v4();
        let evidence_json = serde_json::to_string(&evidence)?;

        conn.execute(
            "INSERT INTO incidents (id, status, final_score, subject, evidence_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id.to_string(),
                status.to_string(),
                final_score,
                subject,
                evidence_json,
                Utc::now().to_rfc3339()
            ],
        )?;

        Ok(id)
    }

    pub fn list_recent(&self, limit: usize) -> Result<Vec<Incident>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, status, final_score, subject, evidence_json, created_at
             FROM incidents ORDER BY created_at DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let id_str: String = row.get(0)?;
            let status_str: String = row.get(1)?;
            let evidence_str: String = row.get(4)?;
            let created_str: String = row.get(5)?;

            Ok(Incident {
                id: Uuid::parse_str(&id_str).unwrap_or_default(),
                status: Status::parse(&status_str).unwrap_or(Status::Attack),
                final_score: row.get(2)?,
                subject: row.get(3)?,
                evidence: serde_json::from_str(&evidence_str).unwrap_or_default(),
                created_at: chrono::DateTime::parse_from_rfc3339(&created_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_default(),
            })
        })?;

        let mut incidents = Vec::new();
        for r in rows {
            incidents.push(r?);
        }
        Ok(incidents)
    }
}
