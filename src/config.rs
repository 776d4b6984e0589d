//! Environment-based service configuration.
//!
//! Environment variables:
//! - BIND_HOST: listen address (default: 0.0.0.0)
//! - PORT: listen port (default: 8080)
//! - REGION: region served by this instance (default: useast)
//! - DATABASE_PATH: DuckDB file; unset means an in-memory database
//! - EVENTS_SEQUENCE_POLICY: "empty_only" (default) or "scalars"

use std::path::PathBuf;

use crate::validation::SequencePolicy;
use crate::{MonitorError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub bind_host: String,
    pub port: u16,
    pub region: String,
    pub database_path: Option<PathBuf>,
    pub sequence_policy: SequencePolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 8080,
            region: "useast".to_string(),
            database_path: None,
            sequence_policy: SequencePolicy::default(),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(port) => port
                .trim()
                .parse::<u16>()
                .map_err(|_| MonitorError::Config(format!("Invalid PORT: {}", port)))?,
            None => defaults.port,
        };

        let sequence_policy = match var("EVENTS_SEQUENCE_POLICY") {
            Some(policy) => policy.parse::<SequencePolicy>()?,
            None => defaults.sequence_policy,
        };

        Ok(Self {
            bind_host: var("BIND_HOST").unwrap_or(defaults.bind_host),
            port,
            region: var("REGION").unwrap_or(defaults.region),
            database_path: var("DATABASE_PATH").map(PathBuf::from),
            sequence_policy,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_overrides() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("PORT", "9090"),
            ("REGION", "uswest"),
            ("DATABASE_PATH", "/var/lib/monitor/metrics.db"),
            ("EVENTS_SEQUENCE_POLICY", "scalars"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.region, "uswest");
        assert_eq!(
            config.database_path,
            Some(PathBuf::from("/var/lib/monitor/metrics.db"))
        );
        assert_eq!(config.sequence_policy, SequencePolicy::Scalars);
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&[("REGION", "  ")])).unwrap();
        assert_eq!(config.region, "useast");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            ServiceConfig::from_lookup(lookup(&[("PORT", "eighty")])),
            Err(MonitorError::Config(_))
        ));
        assert!(matches!(
            ServiceConfig::from_lookup(lookup(&[("EVENTS_SEQUENCE_POLICY", "all")])),
            Err(MonitorError::Config(_))
        ));
    }
}
