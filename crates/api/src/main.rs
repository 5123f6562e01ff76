use std::sync::Arc;

use anyhow::Context;

use liteaidetect_api::app::{self, services};
use liteaidetect_api::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::from_env().context("invalid configuration")?;
    liteaidetect_observability::init_with(config.log_format);

    let services = Arc::new(services::build_services(&config)?);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    app::serve(listener, services, config.max_upload_bytes, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
