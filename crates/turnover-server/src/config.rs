// SPDX-License-Identifier: Apache-2.0

/// Request-facing server configuration, fully resolved before the listener
/// binds. Artifact locations and the database path live in `main`, not here.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub require_api_key: bool,
    pub api_keys: Vec<String>,
    pub max_body_bytes: usize,
    pub latest_predictions_default_limit: u32,
    pub latest_predictions_max_limit: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            require_api_key: false,
            api_keys: Vec::new(),
            max_body_bytes: 1 << 20,
            latest_predictions_default_limit: 20,
            latest_predictions_max_limit: 200,
        }
    }
}

/// Rejects configurations that would only fail at request time.
pub fn validate_startup_config_contract(cfg: &ApiConfig) -> Result<(), String> {
    if cfg.require_api_key && cfg.api_keys.is_empty() {
        return Err("api key required but no keys configured".to_string());
    }
    if cfg.api_keys.iter().any(|k| k.trim().is_empty()) {
        return Err("empty api key configured".to_string());
    }
    if cfg.max_body_bytes == 0 {
        return Err("max_body_bytes must be positive".to_string());
    }
    if cfg.latest_predictions_max_limit == 0 {
        return Err("latest_predictions_max_limit must be positive".to_string());
    }
    if cfg.latest_predictions_default_limit > cfg.latest_predictions_max_limit {
        return Err("latest_predictions_default_limit exceeds the max limit".to_string());
    }
    Ok(())
}
