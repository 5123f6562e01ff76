use std::sync::Arc;

use axum::{extract::Extension, response::{sse::Event as SseEvent, IntoResponse}, Json};

use crate::app::services::{self, AppServices};

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn events(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Sse<impl tokio_stream::Stream<Item = Result<SseEvent, std::convert::Infallible>>> {
    services::job_sse_stream(services)
}
