pub mod events;
pub mod metrics;
pub mod params;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    config::ServiceConfig,
    repository::{DuckDbMetricsRepository, MetricsRepository},
    telemetry,
    validation::EventValidator,
    MonitorError, Result,
};

#[derive(Clone)]
pub struct ApiState {
    pub repo: Arc<dyn MetricsRepository>,
    pub validator: Arc<EventValidator>,
    pub region: String,
}

impl ApiState {
    pub fn new(
        repo: Arc<dyn MetricsRepository>,
        validator: EventValidator,
        region: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            validator: Arc::new(validator),
            region: region.into(),
        }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/v2.0/events", post(events::post_event))
        .route("/v2.0/metrics", get(metrics::list_metrics))
        .route("/v2.0/metrics/measurements", get(metrics::list_measurements))
        .route("/v2.0/metrics/statistics", get(metrics::get_statistics))
        .route("/healthcheck", get(healthcheck))
        .route("/internal/prometheus", get(prometheus_text))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthcheck() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

async fn prometheus_text() -> Result<String> {
    telemetry::render()
}

pub async fn start_server(config: ServiceConfig) -> Result<()> {
    let repo = match &config.database_path {
        Some(path) => {
            info!("Opening metrics database at {}", path.display());
            DuckDbMetricsRepository::open(path)?
        }
        None => {
            info!("Using in-memory metrics database");
            DuckDbMetricsRepository::open_in_memory()?
        }
    };

    let state = ApiState::new(
        Arc::new(repo),
        EventValidator::new(config.sequence_policy),
        config.region.clone(),
    );
    let app = router(state);

    let addr = config.bind_addr();
    info!(
        "Starting monitor API on {} for region {} (event sequences: {:?})",
        addr, config.region, config.sequence_policy
    );

    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        MonitorError::Internal(format!("Failed to bind to address {}: {}", addr, e))
    })?;

    axum::serve(listener, app)
        .await
        .map_err(|e| MonitorError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
