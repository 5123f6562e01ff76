use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, Json};

use crate::app::errors;
use crate::app::services::AppServices;

pub async fn get_dashboard(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.jobs.dashboard() {
        Ok(metrics) => Json(metrics).into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}
