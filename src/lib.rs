pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod repository;
pub mod telemetry;
pub mod validation;

pub use error::{MonitorError, Result, ValidationError};
pub use repository::{DuckDbMetricsRepository, MetricsRepository};
pub use validation::{validate, EventValidator, SequencePolicy};
