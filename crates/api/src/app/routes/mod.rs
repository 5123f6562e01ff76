use axum::{routing::get, Router};

pub mod dashboard;
pub mod jobs;
pub mod system;

/// Router for everything under `/api`.
pub fn router() -> Router {
    Router::new()
        .route("/events", get(system::events))
        .route("/dashboard", get(dashboard::get_dashboard))
        .nest("/jobs", jobs::router())
}
