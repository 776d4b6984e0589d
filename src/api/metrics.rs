use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use tracing::info;

use super::{params, ApiState};
use crate::models::{Measurement, Metric, StatisticsResponse};
use crate::telemetry::RequestTimer;
use crate::Result;

#[derive(Debug, Default, Deserialize)]
pub struct MetricsQuery {
    pub name: Option<String>,
    pub dimensions: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MeasurementsQuery {
    pub name: Option<String>,
    pub dimensions: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatisticsQuery {
    pub name: Option<String>,
    pub dimensions: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub statistics: Option<String>,
    pub period: Option<String>,
}

pub async fn list_metrics(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<MetricsQuery>,
) -> Result<Json<Vec<Metric>>> {
    let _timer = RequestTimer::new("list_metrics");
    let tenant_id = params::tenant_id(&headers)?;
    let name = params::parse_name(query.name.as_deref())?;
    let dimensions = params::parse_dimensions(query.dimensions.as_deref())?;

    info!("Listing metrics for tenant {}", tenant_id);
    let metrics = state
        .repo
        .list_metrics(&tenant_id, &state.region, name.as_deref(), dimensions.as_ref())
        .await?;

    Ok(Json(metrics))
}

pub async fn list_measurements(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<MeasurementsQuery>,
) -> Result<Json<Vec<Measurement>>> {
    let _timer = RequestTimer::new("list_measurements");
    let tenant_id = params::tenant_id(&headers)?;
    let name = params::parse_name(query.name.as_deref())?;
    let dimensions = params::parse_dimensions(query.dimensions.as_deref())?;
    let start = params::require_time(query.start_time.as_deref(), "start_time")?;
    let end = params::parse_time(query.end_time.as_deref(), "end_time")?;
    params::validate_times(start, end)?;

    info!("Listing measurements for tenant {}", tenant_id);
    let measurements = state
        .repo
        .measurement_list(
            &tenant_id,
            &state.region,
            name.as_deref(),
            dimensions.as_ref(),
            start,
            end,
        )
        .await?;

    Ok(Json(measurements))
}

pub async fn get_statistics(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<StatisticsQuery>,
) -> Result<Json<StatisticsResponse>> {
    let _timer = RequestTimer::new("get_statistics");
    let tenant_id = params::tenant_id(&headers)?;
    let name = params::parse_name(query.name.as_deref())?;
    let dimensions = params::parse_dimensions(query.dimensions.as_deref())?;
    let start = params::require_time(query.start_time.as_deref(), "start_time")?;
    let end = params::parse_time(query.end_time.as_deref(), "end_time")?;
    params::validate_times(start, end)?;
    let kinds = params::parse_statistics(query.statistics.as_deref())?;
    let period = params::parse_period(query.period.as_deref())?;

    info!("Computing statistics for tenant {}", tenant_id);
    let rows = state
        .repo
        .metrics_statistics(
            &tenant_id,
            &state.region,
            name.as_deref(),
            dimensions.as_ref(),
            start,
            end,
            &kinds,
            period,
        )
        .await?;

    Ok(Json(StatisticsResponse::new(
        name,
        dimensions.unwrap_or_default(),
        period,
        &kinds,
        rows,
    )))
}
