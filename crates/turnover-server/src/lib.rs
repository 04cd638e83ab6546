// SPDX-License-Identifier: Apache-2.0

//! HTTP boundary: routing, API-key enforcement, error-to-status mapping and
//! per-request audit writes. All prediction semantics live below this crate.

#![forbid(unsafe_code)]

pub mod config;
pub mod error_mapping;
pub mod http;
pub mod metrics;
pub mod security;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;
use tokio::sync::Mutex;
use turnover_inference::InferenceAdapter;
use turnover_store::FeatureStore;

use crate::config::ApiConfig;
use crate::metrics::RequestMetrics;

#[derive(Clone)]
pub struct AppState {
    pub adapter: Arc<InferenceAdapter>,
    pub store: Arc<Mutex<FeatureStore>>,
    pub api: ApiConfig,
    /// True from startup until graceful shutdown begins; `/readyz` reports
    /// 503 once it flips so load balancers stop routing to a draining server.
    pub ready: Arc<AtomicBool>,
    pub(crate) metrics: Arc<RequestMetrics>,
    pub(crate) request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(adapter: Arc<InferenceAdapter>, store: Arc<Mutex<FeatureStore>>, api: ApiConfig) -> Self {
        Self {
            adapter,
            store,
            api,
            ready: Arc::new(AtomicBool::new(true)),
            metrics: Arc::new(RequestMetrics::default()),
            request_id_seed: Arc::new(AtomicU64::new(1)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(http::handlers::root_handler))
        .route("/healthz", get(http::handlers::healthz_handler))
        .route("/readyz", get(http::handlers::readyz_handler))
        .route("/metrics", get(http::handlers::metrics_handler))
        .route("/v1/version", get(http::handlers::version_handler))
        .route(
            "/v1/predict/by-id/{employee_id}",
            post(http::handlers::predict_by_id_handler),
        )
        .route(
            "/v1/predict/by-features",
            post(http::handlers::predict_by_features_handler),
        )
        .route(
            "/v1/predictions/latest",
            get(http::handlers::latest_predictions_handler),
        )
        .layer(DefaultBodyLimit::max(state.api.max_body_bytes))
        .with_state(state)
}
