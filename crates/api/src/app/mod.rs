//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: job service construction and the SSE event stream
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and query parsing
//! - `errors.rs`: consistent error responses

use std::future::Future;
use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::get, Extension, Router};
use tokio::net::TcpListener;
use tower::ServiceBuilder;

use liteaidetect_infra::LifecycleError;

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Must be called from inside a tokio runtime; lifecycle timers are spawned on it.
pub async fn build_app(config: ApiConfig) -> Result<Router, LifecycleError> {
    let services = Arc::new(services::build_services(&config)?);
    Ok(router_with(services, config.max_upload_bytes))
}

/// Router over already-built services.
pub fn router_with(services: Arc<services::AppServices>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", routes::router())
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::request_logging))
                .layer(Extension(services))
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}

/// Serve until `shutdown` resolves, then revoke every pending lifecycle timer.
pub async fn serve<F>(
    listener: TcpListener,
    services: Arc<services::AppServices>,
    max_upload_bytes: usize,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router_with(Arc::clone(&services), max_upload_bytes);
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    let revoked = services.jobs.shutdown();
    tracing::info!(revoked, "server stopped");
    result
}
