// SPDX-License-Identifier: Apache-2.0

//! Pure mapping from the prediction error taxonomy to transport statuses.
//! Keeping this free of handler context makes the table testable on its own.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use turnover_model::{ErrorKind, PredictError};

#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
}

#[must_use]
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[must_use]
pub fn error_code(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Validation => "validation_failed",
        ErrorKind::NotFound => "not_found",
        ErrorKind::Internal => "internal",
    }
}

pub(crate) fn api_error_response(status: StatusCode, err: ApiError) -> Response {
    (status, Json(json!({ "error": err }))).into_response()
}

pub(crate) fn error_json(code: &'static str, message: &str, details: Value) -> ApiError {
    ApiError {
        code,
        message: message.to_string(),
        details,
    }
}

/// Renders a prediction failure. Validation errors enumerate the offending
/// fields; internal errors are logged but never leak their cause to callers.
pub(crate) fn predict_error_response(err: &PredictError) -> Response {
    let kind = err.kind();
    let status = status_for(kind);
    let (message, details) = match err {
        PredictError::MissingFeatures(_) | PredictError::UnexpectedFeatures(_) => {
            (err.to_string(), json!({ "fields": err.field_names() }))
        }
        PredictError::NoFeatureRow { employee_id } => {
            (err.to_string(), json!({ "employee_id": employee_id }))
        }
        PredictError::Classifier(_) | PredictError::Storage(_) => {
            tracing::error!(error = %err, "prediction failed");
            ("internal error".to_string(), json!({}))
        }
        _ => ("internal error".to_string(), json!({})),
    };
    api_error_response(status, error_json(error_code(kind), &message, details))
}
