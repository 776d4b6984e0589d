//! Metrics query contract and its storage backends.
//!
//! Callers depend on [`MetricsRepository`] only; [`DuckDbMetricsRepository`]
//! is the embedded reference backend.

pub mod duckdb_store;
pub mod series;
pub mod statistics;

pub use self::duckdb_store::DuckDbMetricsRepository;
pub use self::series::SeriesName;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::models::{Dimensions, Measurement, Metric, StatisticKind, StatisticsRow};
use crate::Result;

#[async_trait]
pub trait MetricsRepository: Send + Sync {
    /// Every metric of `tenant_id` in `region` whose name equals `name` (when
    /// given) and whose dimensions include all of `dimensions`. No match is an
    /// empty result, not an error.
    async fn list_metrics(
        &self,
        tenant_id: &str,
        region: &str,
        name: Option<&str>,
        dimensions: Option<&Dimensions>,
    ) -> Result<Vec<Metric>>;

    /// Raw points within `[start_timestamp, end_timestamp]`, ascending by
    /// timestamp. A missing end means now.
    async fn measurement_list(
        &self,
        tenant_id: &str,
        region: &str,
        name: Option<&str>,
        dimensions: Option<&Dimensions>,
        start_timestamp: DateTime<Utc>,
        end_timestamp: Option<DateTime<Utc>>,
    ) -> Result<Vec<Measurement>>;

    /// One row per `period`-second bucket of the range, carrying a value for
    /// each requested statistic.
    #[allow(clippy::too_many_arguments)]
    async fn metrics_statistics(
        &self,
        tenant_id: &str,
        region: &str,
        name: Option<&str>,
        dimensions: Option<&Dimensions>,
        start_timestamp: DateTime<Utc>,
        end_timestamp: Option<DateTime<Utc>>,
        statistics: &BTreeSet<StatisticKind>,
        period: u64,
    ) -> Result<Vec<StatisticsRow>>;
}
