use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder,
    HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};
use std::time::Instant;

use crate::{MonitorError, Result};

lazy_static! {
    // Request metrics
    pub static ref REQUEST_COUNTER: IntCounterVec = register_int_counter_vec!(
        "monitor_api_requests_total",
        "Total number of requests received",
        &["endpoint"]
    ).unwrap();

    pub static ref REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "monitor_api_request_duration_seconds",
        "Request duration in seconds",
        &["endpoint"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
    ).unwrap();

    // Event gate
    pub static ref EVENT_VALIDATION_FAILURES: IntCounter = register_int_counter!(
        "monitor_api_event_validation_failures_total",
        "Total number of event bodies rejected by validation"
    ).unwrap();

    // Storage metrics
    pub static ref STORAGE_OPERATIONS: IntCounterVec = register_int_counter_vec!(
        "monitor_api_storage_operations_total",
        "Total number of repository operations",
        &["operation"]
    ).unwrap();
}

/// Counts a request on creation and observes its duration on drop.
pub struct RequestTimer {
    endpoint: &'static str,
    start: Instant,
}

impl RequestTimer {
    pub fn new(endpoint: &'static str) -> Self {
        REQUEST_COUNTER.with_label_values(&[endpoint]).inc();
        Self {
            endpoint,
            start: Instant::now(),
        }
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        REQUEST_DURATION
            .with_label_values(&[self.endpoint])
            .observe(duration);
    }
}

pub fn record_validation_failure() {
    EVENT_VALIDATION_FAILURES.inc();
}

pub fn record_storage_operation(operation: &str) {
    STORAGE_OPERATIONS.with_label_values(&[operation]).inc();
}

/// Render every registered metric in the prometheus text format.
pub fn render() -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| MonitorError::Internal(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| MonitorError::Internal(format!("Metrics are not UTF-8: {}", e)))
}
