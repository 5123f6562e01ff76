use std::sync::Arc;

use axum::{
    extract::{Extension, Multipart, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use axum_extra::extract::{Query, QueryRejection};

use liteaidetect_infra::UploadedFile;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// Filename used for parts that arrive without one.
const FALLBACK_FILENAME: &str = "upload.bin";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_jobs))
        .route("/batch", post(create_batch))
        .route("/:id", get(get_job))
        .route("/:id/cancel", post(cancel_job))
        .route("/:id/rerun", post(rerun_job))
}

/// Multipart upload: every `files` part becomes a job, an optional `language`
/// text part applies to the whole batch. File contents are only measured.
pub async fn create_batch(
    Extension(services): Extension<Arc<AppServices>>,
    mut multipart: Multipart,
) -> axum::response::Response {
    let mut files = Vec::new();
    let mut language = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return errors::json_error(e.status(), "invalid_multipart", e.body_text()),
        };

        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("files") => {
                let filename = field
                    .file_name()
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or(FALLBACK_FILENAME)
                    .to_string();
                match field.bytes().await {
                    Ok(bytes) => files.push(UploadedFile::new(filename, bytes.len() as u64)),
                    Err(e) => {
                        return errors::json_error(e.status(), "invalid_multipart", e.body_text());
                    }
                }
            }
            Some("language") => match field.text().await {
                Ok(text) => language = Some(text),
                Err(e) => {
                    return errors::json_error(e.status(), "invalid_multipart", e.body_text());
                }
            },
            _ => {}
        }
    }

    match services.jobs.create_jobs(files, language) {
        Ok(jobs) => (StatusCode::CREATED, Json(jobs)).into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

pub async fn list_jobs(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::ListJobsParams>, QueryRejection>,
) -> axum::response::Response {
    let Query(params) = match params {
        Ok(params) => params,
        Err(e) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_query", e.to_string());
        }
    };
    let query = match params.into_query() {
        Ok(q) => q,
        Err(resp) => return resp,
    };

    match services.jobs.list_jobs(&query) {
        Ok(page) => Json(page).into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

pub async fn get_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let job_id = match dto::parse_job_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.jobs.get_job(job_id) {
        Ok(Some(job)) => Json(job).into_response(),
        Ok(None) => errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("job {job_id} not found"),
        ),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

pub async fn cancel_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let job_id = match dto::parse_job_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.jobs.cancel_job(job_id) {
        Ok(report) => Json(dto::TransitionResponse::from(report)).into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

pub async fn rerun_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let job_id = match dto::parse_job_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.jobs.rerun_job(job_id) {
        Ok(report) => Json(dto::TransitionResponse::from(report)).into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}
