//! Fixed-width bucket aggregation of raw points.
//!
//! The range `[start, end]` is cut into `max(1, ceil((end - start) / period))`
//! buckets starting at `start`. A point at exactly `end` lands in the last
//! bucket, so a trailing partial bucket is kept. Buckets without points are
//! omitted.

use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{StatisticKind, StatisticsRow};
use crate::{MonitorError, Result};

#[derive(Debug, Clone)]
pub struct BucketAggregate {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for BucketAggregate {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::MAX,
            max: f64::MIN,
        }
    }
}

impl BucketAggregate {
    pub fn record(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    pub fn get(&self, kind: StatisticKind) -> f64 {
        match kind {
            StatisticKind::Avg => self.average(),
            StatisticKind::Min => self.min,
            StatisticKind::Max => self.max,
            StatisticKind::Count => self.count as f64,
            StatisticKind::Sum => self.sum,
        }
    }
}

pub fn validate_request(statistics: &BTreeSet<StatisticKind>, period: u64) -> Result<()> {
    if statistics.is_empty() {
        return Err(MonitorError::InvalidQuery(
            "At least one statistic is required".to_string(),
        ));
    }
    if period == 0 {
        return Err(MonitorError::InvalidQuery(
            "Period must be a positive number of seconds".to_string(),
        ));
    }
    Ok(())
}

pub fn bucket_count(start_ms: i64, end_ms: i64, period: u64) -> u64 {
    let period_ms = period.saturating_mul(1000);
    let span = end_ms.saturating_sub(start_ms).max(0) as u64;
    span.div_ceil(period_ms).max(1)
}

/// Aggregate `(timestamp_ms, value)` points into statistics rows ordered by
/// bucket start. Points outside `[start_ms, end_ms]` are ignored.
pub fn aggregate(
    points: &[(i64, f64)],
    start_ms: i64,
    end_ms: i64,
    statistics: &BTreeSet<StatisticKind>,
    period: u64,
) -> Result<Vec<StatisticsRow>> {
    validate_request(statistics, period)?;

    let period_ms = period.saturating_mul(1000);
    let last_bucket = bucket_count(start_ms, end_ms, period) - 1;

    let mut buckets: BTreeMap<u64, BucketAggregate> = BTreeMap::new();
    for &(timestamp, value) in points {
        if timestamp < start_ms || timestamp > end_ms {
            continue;
        }
        let index = ((timestamp - start_ms) as u64 / period_ms).min(last_bucket);
        buckets.entry(index).or_default().record(value);
    }

    buckets
        .into_iter()
        .map(|(index, aggregate)| {
            let offset = index * period_ms;
            let bucket_start = i64::try_from(offset)
                .ok()
                .and_then(|offset| start_ms.checked_add(offset))
                .ok_or_else(|| MonitorError::InvalidQuery("Bucket out of range".to_string()))?;
            Ok(StatisticsRow {
                timestamp: from_millis(bucket_start)?,
                statistics: statistics
                    .iter()
                    .map(|&kind| (kind, aggregate.get(kind)))
                    .collect(),
            })
        })
        .collect()
}

pub fn from_millis(timestamp_ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .ok_or_else(|| MonitorError::Internal(format!("Timestamp out of range: {}", timestamp_ms)))
}
