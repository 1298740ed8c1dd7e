use super::AppState;
use crate::error::RegistryError;
use crate::engine::LifecycleOutcome;
use crate::platform::health;
use crate::publish::exposition;
use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// GET /metrics: text exposition of every active metric
pub(super) async fn handle_metrics(State(state): State<AppState>) -> Response {
    match state.engine.scrape() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, exposition::CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(error) => {
            tracing::error!(%error, "scrape rendering failed");
            (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response()
        }
    }
}

/// GET /sla: current value of every tracked metric
pub(super) async fn handle_sla_get(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.engine.status())
}

/// POST|PUT /sla: upsert `{"metric": number, ...}`
pub(super) async fn handle_sla_update(
    State(state): State<AppState>,
    Json(body): Json<Map<String, Value>>,
) -> impl IntoResponse {
    let mut updates = BTreeMap::new();
    let mut rejected = BTreeMap::new();
    for (name, value) in body {
        match value.as_f64() {
            Some(number) => {
                updates.insert(name, number);
            }
            None => {
                rejected.insert(name, "value must be a number".to_string());
            }
        }
    }

    let mut outcome = state.engine.set_desired(&updates).await;
    outcome.ignored.extend(rejected);
    let status = if outcome.applied.is_empty() && !outcome.ignored.is_empty() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };
    (
        status,
        Json(json!({
            "message": format!("{} metric(s) updated", outcome.applied.len()),
            "applied": outcome.applied,
            "ignored": outcome.ignored,
        })),
    )
}

/// GET /violations: lifetime count and window latches
pub(super) async fn handle_violations(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.engine.violations())
}

/// GET /probability_of_violations/{minutes}
pub(super) async fn handle_probability(
    State(state): State<AppState>,
    Path(minutes): Path<i64>,
) -> impl IntoResponse {
    Json(json!({
        "minutes": minutes,
        "probability": state.engine.probability(minutes),
    }))
}

fn lifecycle_response(result: Result<LifecycleOutcome, RegistryError>) -> Response {
    match result {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => {
            let status = match error {
                RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_REQUEST,
            };
            (status, Json(json!({ "error": error.to_string() }))).into_response()
        }
    }
}

/// POST /add_metric/{name}: restore a removed metric
pub(super) async fn handle_add_metric(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    lifecycle_response(state.engine.add_metric(&name))
}

/// POST /remove_metric/{name}: remove a metric, keeping its last value
pub(super) async fn handle_remove_metric(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    lifecycle_response(state.engine.remove_metric(&name))
}

/// GET /state: rows held by the durable store
pub(super) async fn handle_state(State(state): State<AppState>) -> Response {
    match state.engine.persisted_state().await {
        Ok(rows) => Json(rows).into_response(),
        Err(error) => {
            tracing::warn!(%error, "persisted state unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": error.to_string() })),
            )
                .into_response()
        }
    }
}

/// GET /health: component health snapshot
pub(super) async fn handle_health() -> impl IntoResponse {
    let snapshot = health::snapshot();
    let status = if snapshot.is_healthy() { "ok" } else { "degraded" };
    Json(json!({
        "status": status,
        "runtime": health::snapshot_json(),
    }))
}
