use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};

use liteaidetect_ai::SyntheticClassifier;
use liteaidetect_infra::{InMemoryJobStore, JobService, LifecycleError};

use crate::config::ApiConfig;

/// Shared state handed to every handler.
pub struct AppServices {
    pub jobs: JobService<Arc<InMemoryJobStore>>,
}

pub fn build_services(config: &ApiConfig) -> Result<AppServices, LifecycleError> {
    let classifier = SyntheticClassifier::new(config.simulator.seed)
        .with_model_version(config.model_version.clone());
    let jobs = JobService::in_memory(Arc::new(classifier), config.simulator.clone())?;

    tracing::info!(
        model_version = %config.model_version,
        queue_delay = %config.simulator.queue_delay,
        run_delay = %config.simulator.run_delay,
        "job services ready"
    );
    Ok(AppServices { jobs })
}

/// SSE stream of job lifecycle events. The SSE event name is the new status.
pub fn job_sse_stream(
    services: Arc<AppServices>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.jobs.subscribe();
    // Lagged receivers skip what they missed; the stream stays open.
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(event) => {
            let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(event.status.as_str()).data(data)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
