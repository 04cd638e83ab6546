// SPDX-License-Identifier: Apache-2.0

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::Ordering;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use turnover_model::{FeatureValue, PredictionOutcome};
use turnover_store::AuditRecord;

use crate::error_mapping::{api_error_response, error_json, predict_error_response};
use crate::security::check_api_key;
use crate::AppState;

pub(crate) fn make_request_id(state: &AppState) -> String {
    let id = state.request_id_seed.fetch_add(1, Ordering::Relaxed);
    format!("req-{id:016x}")
}

pub(crate) fn propagated_request_id(headers: &HeaderMap, state: &AppState) -> String {
    if let Some(raw) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    make_request_id(state)
}

pub(crate) fn with_request_id(mut response: Response, request_id: &str) -> Response {
    if let Ok(v) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert("x-request-id", v);
    }
    response
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis().min(u128::from(u64::MAX)) as i64)
        .unwrap_or(0)
}

async fn observe(
    state: &AppState,
    route: &str,
    started: Instant,
    response: Response,
    request_id: &str,
) -> Response {
    state
        .metrics
        .observe_request(route, response.status(), started.elapsed())
        .await;
    with_request_id(response, request_id)
}

/// Unauthenticated service banner; every other route is behind the key check.
pub(crate) async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    let request_id = make_request_id(&state);
    let resp = Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "status": "ok"
    }))
    .into_response();
    with_request_id(resp, &request_id)
}

pub(crate) async fn healthz_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    if let Err(resp) = check_api_key(&state, &headers) {
        return observe(&state, "/healthz", started, resp, &request_id).await;
    }
    let resp = (StatusCode::OK, "ok").into_response();
    observe(&state, "/healthz", started, resp, &request_id).await
}

pub(crate) async fn readyz_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    if let Err(resp) = check_api_key(&state, &headers) {
        return observe(&state, "/readyz", started, resp, &request_id).await;
    }
    let feature_rows = {
        let store = state.store.lock().await;
        store.feature_row_count()
    };
    let resp = match feature_rows {
        Ok(rows) if state.ready.load(Ordering::Relaxed) => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "model_version": state.adapter.model_version(),
                "feature_rows": rows
            })),
        )
            .into_response(),
        Ok(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "not-ready"})),
        )
            .into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "readiness probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "not-ready"})),
            )
                .into_response()
        }
    };
    observe(&state, "/readyz", started, resp, &request_id).await
}

pub(crate) async fn version_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    if let Err(resp) = check_api_key(&state, &headers) {
        return observe(&state, "/v1/version", started, resp, &request_id).await;
    }
    let resp = Json(json!({
        "service": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        },
        "model": {
            "version": state.adapter.model_version(),
            "threshold": state.adapter.threshold(),
        }
    }))
    .into_response();
    observe(&state, "/v1/version", started, resp, &request_id).await
}

pub(crate) async fn metrics_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    if let Err(resp) = check_api_key(&state, &headers) {
        return observe(&state, "/metrics", started, resp, &request_id).await;
    }
    let resp = (StatusCode::OK, state.metrics.render_text().await).into_response();
    observe(&state, "/metrics", started, resp, &request_id).await
}

/// Writes the audit pair and renders the outcome. A failed audit write fails
/// the whole call: an unaudited prediction must never reach the caller.
async fn audit_and_respond(
    state: &AppState,
    payload: Value,
    outcome: &PredictionOutcome,
    started: Instant,
) -> Response {
    let record_time = now_ms();
    let latency_ms = started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64;
    let audit = {
        let mut store = state.store.lock().await;
        store.audit_prediction(&AuditRecord {
            payload: &payload,
            model_version: state.adapter.model_version(),
            employee_id: outcome.employee_id,
            predicted_class: outcome.will_leave,
            predicted_proba: outcome.turnover_probability,
            threshold_used: state.adapter.threshold(),
            latency_ms,
            created_at: record_time,
        })
    };
    match audit {
        Ok(_) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "audit write failed");
            api_error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                error_json("internal", "internal error", json!({})),
            )
        }
    }
}

pub(crate) async fn predict_by_id_handler(
    State(state): State<AppState>,
    Path(employee_id): Path<i64>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let route = "/v1/predict/by-id";
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    if let Err(resp) = check_api_key(&state, &headers) {
        return observe(&state, route, started, resp, &request_id).await;
    }

    let row = {
        let store = state.store.lock().await;
        store.fetch_latest_features(employee_id)
    };
    let resp = match row {
        Err(err) => {
            tracing::error!(error = %err, employee_id, "feature lookup failed");
            api_error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                error_json("internal", "internal error", json!({})),
            )
        }
        Ok(None) => predict_error_response(&turnover_model::PredictError::NoFeatureRow {
            employee_id,
        }),
        Ok(Some(features)) => match state.adapter.predict_from_row(employee_id, &features) {
            Err(err) => predict_error_response(&err),
            Ok(outcome) => {
                let payload = json!({
                    "mode": "by_employee_id",
                    "employee_id": employee_id,
                });
                audit_and_respond(&state, payload, &outcome, started).await
            }
        },
    };
    observe(&state, route, started, resp, &request_id).await
}

pub(crate) async fn predict_by_features_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let route = "/v1/predict/by-features";
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    if let Err(resp) = check_api_key(&state, &headers) {
        return observe(&state, route, started, resp, &request_id).await;
    }

    let features: Result<BTreeMap<String, FeatureValue>, _> =
        serde_json::from_value(body.clone());
    let resp = match features {
        Err(err) => api_error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            error_json(
                "validation_failed",
                &format!("payload must map feature names to numbers or strings: {err}"),
                json!({}),
            ),
        ),
        Ok(features) => match state.adapter.predict_from_payload(&features) {
            Err(err) => predict_error_response(&err),
            Ok(outcome) => {
                let payload = json!({
                    "mode": "by_features",
                    "features": body,
                });
                audit_and_respond(&state, payload, &outcome, started).await
            }
        },
    };
    observe(&state, route, started, resp, &request_id).await
}

pub(crate) async fn latest_predictions_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let route = "/v1/predictions/latest";
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    if let Err(resp) = check_api_key(&state, &headers) {
        return observe(&state, route, started, resp, &request_id).await;
    }

    let limit = match params.get("limit") {
        None => Ok(state.api.latest_predictions_default_limit),
        Some(raw) => raw.parse::<u32>().map_err(|_| raw.clone()),
    };
    let resp = match limit {
        Err(raw) => api_error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            error_json(
                "validation_failed",
                &format!("limit must be a non-negative integer, got {raw:?}"),
                json!({ "fields": ["limit"] }),
            ),
        ),
        Ok(limit) => {
            let limit = limit.min(state.api.latest_predictions_max_limit);
            let rows = {
                let store = state.store.lock().await;
                store.latest_predictions(limit)
            };
            match rows {
                Ok(predictions) => Json(json!({ "predictions": predictions })).into_response(),
                Err(err) => {
                    tracing::error!(error = %err, "audit listing failed");
                    api_error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        error_json("internal", "internal error", json!({})),
                    )
                }
            }
        }
    };
    observe(&state, route, started, resp, &request_id).await
}
