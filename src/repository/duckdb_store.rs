use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duckdb::{params, Connection};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::series::{self, SeriesName};
use super::statistics;
use super::MetricsRepository;
use crate::models::{Dimensions, Measurement, Metric, StatisticKind, StatisticsRow};
use crate::telemetry::record_storage_operation;
use crate::{MonitorError, Result};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS measurements (
        series VARCHAR NOT NULL,
        tenant_id VARCHAR NOT NULL,
        region VARCHAR NOT NULL,
        name VARCHAR NOT NULL,
        timestamp_ms BIGINT NOT NULL,
        value DOUBLE NOT NULL
    );
";

/// Metrics repository backed by an embedded DuckDB database.
#[derive(Clone)]
pub struct DuckDbMetricsRepository {
    db: Arc<Mutex<Connection>>,
}

impl DuckDbMetricsRepository {
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    /// Store one raw point. Writes arrive from the persister, not through the
    /// query contract.
    pub async fn record_measurement(
        &self,
        tenant_id: &str,
        region: &str,
        name: &str,
        dimensions: &Dimensions,
        timestamp: DateTime<Utc>,
        value: f64,
    ) -> Result<()> {
        if tenant_id.is_empty() || region.is_empty() || name.is_empty() {
            return Err(MonitorError::InvalidQuery(
                "Tenant, region and metric name must not be empty".to_string(),
            ));
        }
        if dimensions.iter().any(|(k, v)| k.is_empty() || v.is_empty()) {
            return Err(MonitorError::InvalidQuery(
                "Dimension names and values must not be empty".to_string(),
            ));
        }

        let series = series::encode(tenant_id, region, name, dimensions);
        record_storage_operation("record_measurement");

        let conn = self.db.lock().await;
        conn.execute(
            "INSERT INTO measurements (series, tenant_id, region, name, timestamp_ms, value)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                series,
                tenant_id,
                region,
                name,
                timestamp.timestamp_millis(),
                value
            ],
        )?;

        Ok(())
    }

    async fn matching_series(
        &self,
        tenant_id: &str,
        region: &str,
        name: Option<&str>,
        dimensions: Option<&Dimensions>,
    ) -> Result<Vec<SeriesName>> {
        let encoded = {
            let conn = self.db.lock().await;
            select_series(&conn, tenant_id, region, name)?
        };

        let mut matched = Vec::with_capacity(encoded.len());
        for raw in encoded {
            match SeriesName::decode(&raw) {
                Ok(series) if series.matches(name, dimensions) => matched.push(series),
                Ok(_) => {}
                Err(e) => warn!("Skipping series: {}", e),
            }
        }
        Ok(matched)
    }

    /// Matching series with their points in `[start_ms, end_ms]`. Fails with
    /// `NotFound` when the identity resolves to no series at all.
    async fn series_points(
        &self,
        tenant_id: &str,
        region: &str,
        name: Option<&str>,
        dimensions: Option<&Dimensions>,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<(SeriesName, Vec<(i64, f64)>)>> {
        let matched = self
            .matching_series(tenant_id, region, name, dimensions)
            .await?;
        if matched.is_empty() {
            return Err(MonitorError::NotFound(format!(
                "No metric matches name {} and dimensions {:?}",
                name.unwrap_or("*"),
                dimensions.cloned().unwrap_or_default()
            )));
        }

        let conn = self.db.lock().await;
        let mut result = Vec::with_capacity(matched.len());
        for series in matched {
            let points = select_points(&conn, &series.encode(), start_ms, end_ms)?;
            result.push((series, points));
        }
        Ok(result)
    }
}

fn resolve_range(
    start_timestamp: DateTime<Utc>,
    end_timestamp: Option<DateTime<Utc>>,
) -> Result<(i64, i64)> {
    let end_timestamp = end_timestamp.unwrap_or_else(Utc::now);
    if end_timestamp < start_timestamp {
        return Err(MonitorError::InvalidQuery(format!(
            "End time {} is before start time {}",
            end_timestamp.to_rfc3339(),
            start_timestamp.to_rfc3339()
        )));
    }
    Ok((
        start_timestamp.timestamp_millis(),
        end_timestamp.timestamp_millis(),
    ))
}

fn select_series(
    conn: &Connection,
    tenant_id: &str,
    region: &str,
    name: Option<&str>,
) -> Result<Vec<String>> {
    let mut series = Vec::new();
    match name {
        Some(name) => {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT series FROM measurements
                 WHERE tenant_id = ? AND region = ? AND name = ?
                 ORDER BY series",
            )?;
            let rows = stmt.query_map(params![tenant_id, region, name], |row| {
                row.get::<_, String>(0)
            })?;
            for row in rows {
                series.push(row?);
            }
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT series FROM measurements
                 WHERE tenant_id = ? AND region = ?
                 ORDER BY series",
            )?;
            let rows =
                stmt.query_map(params![tenant_id, region], |row| row.get::<_, String>(0))?;
            for row in rows {
                series.push(row?);
            }
        }
    }
    Ok(series)
}

fn select_points(
    conn: &Connection,
    series: &str,
    start_ms: i64,
    end_ms: i64,
) -> Result<Vec<(i64, f64)>> {
    let mut stmt = conn.prepare(
        "SELECT timestamp_ms, value FROM measurements
         WHERE series = ? AND timestamp_ms >= ? AND timestamp_ms <= ?
         ORDER BY timestamp_ms",
    )?;
    let rows = stmt.query_map(params![series, start_ms, end_ms], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?))
    })?;

    let mut points = Vec::new();
    for row in rows {
        points.push(row?);
    }
    Ok(points)
}

#[async_trait]
impl MetricsRepository for DuckDbMetricsRepository {
    async fn list_metrics(
        &self,
        tenant_id: &str,
        region: &str,
        name: Option<&str>,
        dimensions: Option<&Dimensions>,
    ) -> Result<Vec<Metric>> {
        debug!("Listing metrics for tenant {} in {}", tenant_id, region);
        record_storage_operation("list_metrics");

        let matched = self
            .matching_series(tenant_id, region, name, dimensions)
            .await?;
        Ok(matched
            .into_iter()
            .map(|series| Metric {
                name: series.name,
                dimensions: series.dimensions,
            })
            .collect())
    }

    async fn measurement_list(
        &self,
        tenant_id: &str,
        region: &str,
        name: Option<&str>,
        dimensions: Option<&Dimensions>,
        start_timestamp: DateTime<Utc>,
        end_timestamp: Option<DateTime<Utc>>,
    ) -> Result<Vec<Measurement>> {
        debug!("Listing measurements for tenant {} in {}", tenant_id, region);
        record_storage_operation("measurement_list");

        let (start_ms, end_ms) = resolve_range(start_timestamp, end_timestamp)?;
        let per_series = self
            .series_points(tenant_id, region, name, dimensions, start_ms, end_ms)
            .await?;

        let mut measurements = Vec::new();
        for (series, points) in per_series {
            for (timestamp, value) in points {
                measurements.push(Measurement {
                    name: series.name.clone(),
                    dimensions: series.dimensions.clone(),
                    timestamp: statistics::from_millis(timestamp)?,
                    value,
                });
            }
        }
        // Stable: equal timestamps keep series order.
        measurements.sort_by_key(|m| m.timestamp);
        Ok(measurements)
    }

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
    ) -> Result<Vec<StatisticsRow>> {
        debug!(
            "Computing {:?} over {}s buckets for tenant {} in {}",
            statistics, period, tenant_id, region
        );
        record_storage_operation("metrics_statistics");

        statistics::validate_request(statistics, period)?;
        let (start_ms, end_ms) = resolve_range(start_timestamp, end_timestamp)?;
        let per_series = self
            .series_points(tenant_id, region, name, dimensions, start_ms, end_ms)
            .await?;

        let points: Vec<(i64, f64)> = per_series
            .into_iter()
            .flat_map(|(_, points)| points)
            .collect();
        statistics::aggregate(&points, start_ms, end_ms, statistics, period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tokio_test::{assert_err, assert_ok};

    fn dims(pairs: &[(&str, &str)]) -> Dimensions {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0).unwrap()
    }

    async fn seeded() -> DuckDbMetricsRepository {
        let repo = DuckDbMetricsRepository::open_in_memory().unwrap();
        for i in 0..=10 {
            let ts = at(1_000 + i * 30);
            repo.record_measurement("t1", "r1", "cpu.util", &dims(&[("host", "a")]), ts, i as f64)
                .await
                .unwrap();
        }
        repo.record_measurement("t1", "r1", "cpu.util", &dims(&[("host", "b")]), at(1_015), 50.0)
            .await
            .unwrap();
        repo.record_measurement("t1", "r1", "mem.free", &Dimensions::new(), at(1_000), 512.0)
            .await
            .unwrap();
        repo.record_measurement("t2", "r1", "cpu.util", &dims(&[("host", "a")]), at(1_000), 99.0)
            .await
            .unwrap();
        repo
    }

    #[test_log::test(tokio::test)]
    async fn test_list_metrics_filters() {
        let repo = seeded().await;

        let metrics = assert_ok!(
            repo.list_metrics("t1", "r1", Some("cpu.util"), Some(&dims(&[("host", "a")])))
                .await
        );
        assert_eq!(
            metrics,
            vec![Metric {
                name: "cpu.util".to_string(),
                dimensions: dims(&[("host", "a")]),
            }]
        );

        let missing = assert_ok!(
            repo.list_metrics("t1", "r1", Some("missing"), Some(&Dimensions::new()))
                .await
        );
        assert!(missing.is_empty());

        let all = assert_ok!(repo.list_metrics("t1", "r1", None, None).await);
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_list_metrics_is_tenant_and_region_scoped() {
        let repo = seeded().await;

        let t2 = repo.list_metrics("t2", "r1", None, None).await.unwrap();
        assert_eq!(t2.len(), 1);
        assert!(repo.list_metrics("t1", "r2", None, None).await.unwrap().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_measurement_list_ordered_within_range() {
        let repo = seeded().await;

        let start = at(1_060);
        let end = at(1_180);
        let measurements = assert_ok!(
            repo.measurement_list("t1", "r1", Some("cpu.util"), None, start, Some(end))
                .await
        );

        assert!(!measurements.is_empty());
        assert!(measurements
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp));
        assert!(measurements
            .iter()
            .all(|m| m.timestamp >= start && m.timestamp <= end));
        // Both range ends are inclusive.
        assert_eq!(measurements.first().unwrap().timestamp, start);
        assert_eq!(measurements.last().unwrap().timestamp, end);
    }

    #[tokio::test]
    async fn test_measurement_list_merges_series_by_timestamp() {
        let repo = seeded().await;

        let measurements = repo
            .measurement_list("t1", "r1", Some("cpu.util"), None, at(1_000), Some(at(1_030)))
            .await
            .unwrap();
        let hosts: Vec<&str> = measurements
            .iter()
            .map(|m| m.dimensions["host"].as_str())
            .collect();
        assert_eq!(hosts, vec!["a", "b", "a"]);
    }

    #[tokio::test]
    async fn test_measurement_list_open_end_means_now() {
        let repo = seeded().await;

        let measurements = repo
            .measurement_list("t1", "r1", Some("mem.free"), None, at(0), None)
            .await
            .unwrap();
        assert_eq!(measurements.len(), 1);
        assert_eq!(measurements[0].value, 512.0);
    }

    #[tokio::test]
    async fn test_measurement_list_not_found_and_empty_range() {
        let repo = seeded().await;

        let err = assert_err!(
            repo.measurement_list("t1", "r1", Some("missing"), None, at(0), Some(at(5_000)))
                .await
        );
        assert!(matches!(err, MonitorError::NotFound(_)));

        let empty = repo
            .measurement_list("t1", "r1", Some("cpu.util"), None, at(0), Some(at(10)))
            .await
            .unwrap();
        assert!(empty.is_empty());

        let err = assert_err!(
            repo.measurement_list("t1", "r1", Some("cpu.util"), None, at(10), Some(at(0)))
                .await
        );
        assert!(matches!(err, MonitorError::InvalidQuery(_)));
    }

    #[test_log::test(tokio::test)]
    async fn test_statistics_five_buckets() {
        let repo = seeded().await;

        let kinds: BTreeSet<_> = [StatisticKind::Avg, StatisticKind::Count].into_iter().collect();
        let rows = assert_ok!(
            repo.metrics_statistics(
                "t1",
                "r1",
                Some("cpu.util"),
                Some(&dims(&[("host", "a")])),
                at(1_000),
                Some(at(1_300)),
                &kinds,
                60,
            )
            .await
        );

        assert_eq!(rows.len(), 5);
        let starts: Vec<i64> = rows.iter().map(|r| r.timestamp.timestamp()).collect();
        assert_eq!(starts, vec![1_000, 1_060, 1_120, 1_180, 1_240]);
        assert_eq!(rows[0].statistics[&StatisticKind::Avg], 0.5);
        assert_eq!(rows[4].statistics[&StatisticKind::Count], 3.0);
        assert!(rows.iter().all(|r| r.statistics.len() == 2));
    }

    #[tokio::test]
    async fn test_statistics_merges_matching_series() {
        let repo = seeded().await;

        let kinds: BTreeSet<_> = [StatisticKind::Max].into_iter().collect();
        let rows = repo
            .metrics_statistics("t1", "r1", Some("cpu.util"), None, at(1_000), Some(at(1_059)), &kinds, 60)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].statistics[&StatisticKind::Max], 50.0);
    }

    #[tokio::test]
    async fn test_statistics_rejects_bad_requests() {
        let repo = seeded().await;

        let err = repo
            .metrics_statistics("t1", "r1", Some("cpu.util"), None, at(0), Some(at(60)), &BTreeSet::new(), 60)
            .await
            .unwrap_err();
        assert!(matches!(err, MonitorError::InvalidQuery(_)));

        let kinds: BTreeSet<_> = [StatisticKind::Sum].into_iter().collect();
        let err = repo
            .metrics_statistics("t1", "r1", Some("nope"), None, at(0), Some(at(60)), &kinds, 60)
            .await
            .unwrap_err();
        assert!(matches!(err, MonitorError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_record_rejects_empty_identity() {
        let repo = DuckDbMetricsRepository::open_in_memory().unwrap();
        assert!(repo
            .record_measurement("", "r1", "cpu", &Dimensions::new(), at(0), 1.0)
            .await
            .is_err());
        assert!(repo
            .record_measurement("t1", "r1", "cpu", &dims(&[("host", "")]), at(0), 1.0)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_usable_as_trait_object() {
        let repo: Arc<dyn MetricsRepository> = Arc::new(seeded().await);
        let metrics = repo.list_metrics("t2", "r1", Some("cpu.util"), None).await.unwrap();
        assert_eq!(metrics.len(), 1);
    }
}
