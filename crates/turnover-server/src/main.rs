// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::Mutex;
use turnover_inference::{load_classifier, load_threshold, ArtifactConfig, InferenceAdapter};
use turnover_server::config::{validate_startup_config_contract, ApiConfig};
use turnover_server::{build_router, AppState};
use turnover_store::FeatureStore;

fn env_str(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_keys(name: &str) -> Vec<String> {
    std::env::var(name)
        .ok()
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if env_bool("TURNOVER_LOG_JSON", false) {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn api_config_from_env() -> ApiConfig {
    let defaults = ApiConfig::default();
    ApiConfig {
        require_api_key: env_bool("TURNOVER_REQUIRE_API_KEY", defaults.require_api_key),
        api_keys: env_keys("TURNOVER_API_KEYS"),
        max_body_bytes: env_usize("TURNOVER_MAX_BODY_BYTES", defaults.max_body_bytes),
        latest_predictions_default_limit: env_u32(
            "TURNOVER_LATEST_LIMIT_DEFAULT",
            defaults.latest_predictions_default_limit,
        ),
        latest_predictions_max_limit: env_u32(
            "TURNOVER_LATEST_LIMIT_MAX",
            defaults.latest_predictions_max_limit,
        ),
    }
}

fn artifact_config_from_env() -> ArtifactConfig {
    let defaults = ArtifactConfig::default();
    ArtifactConfig {
        artifacts_dir: PathBuf::from(env_str(
            "TURNOVER_ARTIFACTS_DIR",
            &defaults.artifacts_dir.to_string_lossy(),
        )),
        remote_base_url: std::env::var("TURNOVER_ARTIFACTS_BASE_URL").ok(),
        ..defaults
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install ctrl-c handler");
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => tracing::error!(error = %err, "failed to install sigterm handler"),
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let api = api_config_from_env();
    validate_startup_config_contract(&api)?;

    let artifacts = artifact_config_from_env();
    let classifier = load_classifier(&artifacts).await?;
    let threshold = load_threshold(&artifacts).await?;
    let adapter = Arc::new(InferenceAdapter::new(Arc::new(classifier), threshold));
    tracing::info!(
        model_version = adapter.model_version(),
        threshold,
        "inference adapter ready"
    );

    let db_path = PathBuf::from(env_str("TURNOVER_DB_PATH", "turnover.db"));
    let store = FeatureStore::open(&db_path)?;
    store.init_schema()?;
    tracing::info!(db = %db_path.display(), "feature store opened");

    let state = AppState::new(adapter, Arc::new(Mutex::new(store)), api);
    let ready = state.ready.clone();
    let router = build_router(state);

    let bind_addr = env_str("TURNOVER_BIND_ADDR", "0.0.0.0:8000");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Fail the readiness probe while in-flight requests drain.
            ready.store(false, Ordering::Relaxed);
        })
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "server failed to start");
            ExitCode::FAILURE
        }
    }
}
