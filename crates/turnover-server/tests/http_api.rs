// SPDX-License-Identifier: Apache-2.0

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;
use turnover_inference::{FixedClassifier, InferenceAdapter};
use turnover_model::{feature_names, FeatureValue};
use turnover_server::config::ApiConfig;
use turnover_server::{build_router, AppState};
use turnover_store::FeatureStore;

const SEEDED_EMPLOYEE: i64 = 7;

fn app_with(probability: f64, api: ApiConfig) -> Router {
    let store = FeatureStore::open_in_memory().expect("in-memory store");
    store.init_schema().expect("schema");
    let row: BTreeMap<String, FeatureValue> = feature_names()
        .map(|name| (name.to_string(), FeatureValue::Int(1)))
        .collect();
    store
        .insert_feature_row(SEEDED_EMPLOYEE, 1_000, &row)
        .expect("seed feature row");
    let adapter = Arc::new(InferenceAdapter::new(
        Arc::new(FixedClassifier(probability)),
        0.5,
    ));
    build_router(AppState::new(adapter, Arc::new(Mutex::new(store)), api))
}

fn app(probability: f64) -> Router {
    app_with(probability, ApiConfig::default())
}

async fn send(router: &Router, request: Request<Body>) -> Response {
    router
        .clone()
        .oneshot(request)
        .await
        .expect("infallible service")
}

async fn get(router: &Router, uri: &str) -> Response {
    send(
        router,
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request"),
    )
    .await
}

async fn post_empty(router: &Router, uri: &str) -> Response {
    send(
        router,
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .expect("request"),
    )
    .await
}

async fn post_json(router: &Router, uri: &str, body: &Value) -> Response {
    send(
        router,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
    )
    .await
}

async fn body_json(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

fn full_payload() -> Value {
    let mut map = serde_json::Map::new();
    for name in feature_names() {
        map.insert(name.to_string(), json!(1));
    }
    Value::Object(map)
}

#[tokio::test]
async fn root_and_health_answer_ok() {
    let router = app(0.5);
    assert_eq!(get(&router, "/").await.status(), StatusCode::OK);
    assert_eq!(get(&router, "/healthz").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn readyz_reports_model_version() {
    let router = app(0.5);
    let resp = get(&router, "/readyz").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["model_version"], "fixed_test");
    assert_eq!(body["feature_rows"], 1);
}

#[tokio::test]
async fn readyz_degrades_without_a_feature_table() {
    let store = FeatureStore::open_in_memory().expect("in-memory store");
    // No schema: the readiness probe cannot count feature rows.
    let adapter = Arc::new(InferenceAdapter::new(Arc::new(FixedClassifier(0.5)), 0.5));
    let router = build_router(AppState::new(
        adapter,
        Arc::new(Mutex::new(store)),
        ApiConfig::default(),
    ));
    let resp = get(&router, "/readyz").await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "not-ready");
}

#[tokio::test]
async fn readyz_degrades_once_shutdown_begins() {
    let store = FeatureStore::open_in_memory().expect("in-memory store");
    store.init_schema().expect("schema");
    let adapter = Arc::new(InferenceAdapter::new(Arc::new(FixedClassifier(0.5)), 0.5));
    let state = AppState::new(adapter, Arc::new(Mutex::new(store)), ApiConfig::default());
    let ready = state.ready.clone();
    let router = build_router(state);

    assert_eq!(get(&router, "/readyz").await.status(), StatusCode::OK);

    // The server flips this flag when it starts draining.
    ready.store(false, Ordering::Relaxed);
    let resp = get(&router, "/readyz").await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "not-ready");
}

#[tokio::test]
async fn version_reports_service_and_model() {
    let router = app(0.5);
    let body = body_json(get(&router, "/v1/version").await).await;
    assert_eq!(body["model"]["version"], "fixed_test");
    assert_eq!(body["model"]["threshold"], 0.5);
    assert_eq!(body["service"]["name"], "turnover-server");
}

#[tokio::test]
async fn predict_by_id_scores_and_audits() {
    let router = app(0.8);
    let resp = post_empty(&router, "/v1/predict/by-id/7").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["employee_id"], 7);
    assert_eq!(body["will_leave"], true);
    assert!((body["turnover_probability"].as_f64().expect("proba") - 0.8).abs() < 1e-9);

    let listing = body_json(get(&router, "/v1/predictions/latest").await).await;
    let predictions = listing["predictions"].as_array().expect("array");
    assert_eq!(predictions.len(), 1);
    assert_eq!(predictions[0]["employee_id"], 7);
    assert_eq!(predictions[0]["predicted_class"], true);
    assert_eq!(predictions[0]["model_version"], "fixed_test");
    assert_eq!(predictions[0]["threshold_used"], 0.5);
    assert_eq!(predictions[0]["payload"]["mode"], "by_employee_id");
}

#[tokio::test]
async fn unknown_employee_is_404_and_never_audited() {
    let router = app(0.8);
    let resp = post_empty(&router, "/v1/predict/by-id/999").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["code"], "not_found");
    assert_eq!(body["error"]["details"]["employee_id"], 999);

    let listing = body_json(get(&router, "/v1/predictions/latest").await).await;
    assert_eq!(listing["predictions"].as_array().expect("array").len(), 0);
}

#[tokio::test]
async fn by_features_scores_without_employee_id() {
    let router = app(0.2);
    let resp = post_json(&router, "/v1/predict/by-features", &full_payload()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["employee_id"], Value::Null);
    assert_eq!(body["will_leave"], false);
}

#[tokio::test]
async fn by_features_missing_field_is_422() {
    let router = app(0.5);
    let mut payload = full_payload();
    payload
        .as_object_mut()
        .expect("object")
        .remove("revenu_mensuel");
    let resp = post_json(&router, "/v1/predict/by-features", &payload).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["code"], "validation_failed");
    assert_eq!(body["error"]["details"]["fields"][0], "revenu_mensuel");

    let listing = body_json(get(&router, "/v1/predictions/latest").await).await;
    assert_eq!(listing["predictions"].as_array().expect("array").len(), 0);
}

#[tokio::test]
async fn by_features_unknown_field_is_422() {
    let router = app(0.5);
    let mut payload = full_payload();
    payload
        .as_object_mut()
        .expect("object")
        .insert("foo".to_string(), json!(1));
    let resp = post_json(&router, "/v1/predict/by-features", &payload).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["details"]["fields"][0], "foo");
}

#[tokio::test]
async fn by_features_rejects_non_object_payloads() {
    let router = app(0.5);
    let resp = post_json(&router, "/v1/predict/by-features", &json!([1, 2, 3])).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn threshold_boundary_is_inclusive() {
    let router = app(0.5);
    let body = body_json(post_empty(&router, "/v1/predict/by-id/7").await).await;
    assert_eq!(body["will_leave"], true);
}

#[tokio::test]
async fn api_key_is_enforced_everywhere_but_root() {
    let router = app_with(
        0.8,
        ApiConfig {
            require_api_key: true,
            api_keys: vec!["sekret".to_string()],
            ..ApiConfig::default()
        },
    );

    assert_eq!(get(&router, "/").await.status(), StatusCode::OK);
    assert_eq!(
        get(&router, "/healthz").await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        post_empty(&router, "/v1/predict/by-id/7").await.status(),
        StatusCode::UNAUTHORIZED
    );

    let resp = send(
        &router,
        Request::builder()
            .method("POST")
            .uri("/v1/predict/by-id/7")
            .header("x-api-key", "wrong")
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = send(
        &router,
        Request::builder()
            .method("POST")
            .uri("/v1/predict/by-id/7")
            .header("x-api-key", "sekret")
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn latest_limit_is_validated_and_clamped() {
    let router = app(0.5);
    let resp = get(&router, "/v1/predictions/latest?limit=abc").await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let resp = get(&router, "/v1/predictions/latest?limit=999999").await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let router = app(0.5);
    let resp = get(&router, "/healthz").await;
    assert!(resp.headers().contains_key("x-request-id"));

    let resp = send(
        &router,
        Request::builder()
            .uri("/healthz")
            .header("x-request-id", "trace-me")
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(
        resp.headers().get("x-request-id").expect("header"),
        "trace-me"
    );
}
