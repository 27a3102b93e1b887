//! API route definitions.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use super::state::AppState;

const DEFAULT_INCIDENT_LIMIT: usize = 50;
const MAX_INCIDENT_LIMIT: usize = 500;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/history", get(history))
        .route("/incidents", get(list_incidents))
}

fn meta() -> Value {
    json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    })
}

async fn health() -> Json<Value> {
    Json(json!({
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION")
        },
        "meta": meta()
    }))
}

async fn status(State(state): State<AppState>) -> Json<Value> {
    match state.dashboard.latest() {
        Some(snapshot) => Json(json!({ "data": snapshot, "meta": meta() })),
        None => Json(json!({ "data": null, "meta": { "message": "no samples yet" } })),
    }
}

async fn history(State(state): State<AppState>) -> Json<Value> {
    let samples = state.dashboard.history();
    Json(json!({ "data": samples, "meta": { "total": samples.len() } }))
}

#[derive(Debug, Deserialize)]
struct IncidentQuery {
    limit: Option<usize>,
}

async fn list_incidents(
    State(state): State<AppState>,
    Query(query): Query<IncidentQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let Some(incidents) = state.incidents else {
        return Ok(Json(json!({
            "data": [],
            "meta": { "total": 0, "message": "alert log not configured" }
        })));
    };

    let limit = query
        .limit
        .unwrap_or(DEFAULT_INCIDENT_LIMIT)
        .min(MAX_INCIDENT_LIMIT);
    let listed = tokio::task::spawn_blocking(move || incidents.list_recent(limit))
        .await
        .map_err(anyhow::Error::from)
        .and_then(|r| r);

    match listed {
        Ok(rows) => Ok(Json(json!({ "data": rows, "meta": { "total": rows.len() } }))),
        Err(e) => {
            error!(error = %e, "failed to list incidents");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "failed to read alert log" })),
            ))
        }
    }
}
