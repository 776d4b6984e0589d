use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::MonitorError;

/// Dimension name to dimension value.
pub type Dimensions = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub dimensions: Dimensions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub name: String,
    pub dimensions: Dimensions,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatisticKind {
    Avg,
    Min,
    Max,
    Count,
    Sum,
}

impl StatisticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatisticKind::Avg => "avg",
            StatisticKind::Min => "min",
            StatisticKind::Max => "max",
            StatisticKind::Count => "count",
            StatisticKind::Sum => "sum",
        }
    }
}

impl fmt::Display for StatisticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatisticKind {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "avg" => Ok(StatisticKind::Avg),
            "min" => Ok(StatisticKind::Min),
            "max" => Ok(StatisticKind::Max),
            "count" => Ok(StatisticKind::Count),
            "sum" => Ok(StatisticKind::Sum),
            other => Err(MonitorError::InvalidQuery(format!(
                "Statistic {} is not one of avg, min, max, count, sum",
                other
            ))),
        }
    }
}

/// One aggregation bucket. `timestamp` is the bucket start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsRow {
    pub timestamp: DateTime<Utc>,
    pub statistics: BTreeMap<StatisticKind, f64>,
}

/// Response body for the statistics endpoint.
#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub name: Option<String>,
    pub dimensions: Dimensions,
    pub period: u64,
    pub columns: Vec<String>,
    pub statistics: Vec<StatisticsRow>,
}

impl StatisticsResponse {
    pub fn new(
        name: Option<String>,
        dimensions: Dimensions,
        period: u64,
        kinds: &BTreeSet<StatisticKind>,
        statistics: Vec<StatisticsRow>,
    ) -> Self {
        let mut columns = vec!["timestamp".to_string()];
        columns.extend(kinds.iter().map(|k| k.to_string()));
        Self {
            name,
            dimensions,
            period,
            columns,
            statistics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_statistic_kind_parsing() {
        assert_eq!("AVG".parse::<StatisticKind>().unwrap(), StatisticKind::Avg);
        assert_eq!(" count ".parse::<StatisticKind>().unwrap(), StatisticKind::Count);
        assert!("median".parse::<StatisticKind>().is_err());
    }

    #[test]
    fn test_statistics_row_serializes_lowercase_keys() {
        let mut statistics = BTreeMap::new();
        statistics.insert(StatisticKind::Max, 3.0);
        let row = StatisticsRow {
            timestamp: Utc.timestamp_opt(0, 0).unwrap(),
            statistics,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["statistics"]["max"], 3.0);
    }

    #[test]
    fn test_statistics_response_columns_follow_kind_order() {
        let kinds: BTreeSet<_> = [StatisticKind::Sum, StatisticKind::Avg].into_iter().collect();
        let resp = StatisticsResponse::new(None, Dimensions::new(), 60, &kinds, vec![]);
        assert_eq!(resp.columns, vec!["timestamp", "avg", "sum"]);
    }
}
