// SPDX-License-Identifier: Apache-2.0

use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use serde_json::json;

use crate::error_mapping::{api_error_response, error_json};
use crate::AppState;

/// Enforces the `x-api-key` header when key auth is enabled.
///
/// A server that requires keys but has none configured answers 500, not 401:
/// the defect is operational, not the caller's. Startup validation normally
/// refuses such a config before we get here.
pub(crate) fn check_api_key(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    if !state.api.require_api_key {
        return Ok(());
    }
    if state.api.api_keys.is_empty() {
        return Err(api_error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            error_json("internal", "api key auth misconfigured", json!({})),
        ));
    }
    let provided = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or("");
    if !provided.is_empty() && state.api.api_keys.iter().any(|key| key == provided) {
        Ok(())
    } else {
        Err(api_error_response(
            StatusCode::UNAUTHORIZED,
            error_json("unauthorized", "invalid or missing api key", json!({})),
        ))
    }
}
