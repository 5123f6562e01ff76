use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use liteaidetect_core::DomainError;
use liteaidetect_infra::{jobs::JobStoreError, LifecycleError};

pub fn lifecycle_error_to_response(err: LifecycleError) -> axum::response::Response {
    match err {
        LifecycleError::NotFound(id) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("job {id} not found"))
        }
        LifecycleError::Domain(e) => domain_error_to_response(e),
        LifecycleError::Store(JobStoreError::NotFound(id)) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("job {id} not found"))
        }
        LifecycleError::Store(e @ JobStoreError::AlreadyExists(_)) => {
            json_error(StatusCode::CONFLICT, "conflict", e.to_string())
        }
        LifecycleError::NoRuntime => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "lifecycle runtime unavailable",
        ),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg)
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        e @ DomainError::InvalidTransition { .. } => {
            json_error(StatusCode::CONFLICT, "conflict", e.to_string())
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
