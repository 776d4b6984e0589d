use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Rejection of an event body. Every structural failure collapses into this
/// one kind; only the message differs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        ValidationError(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Series name is not decodable: {0}")]
    SeriesDecode(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<duckdb::Error> for MonitorError {
    fn from(err: duckdb::Error) -> Self {
        MonitorError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Serialization(err.to_string())
    }
}

impl MonitorError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            MonitorError::Validation(_) | MonitorError::InvalidQuery(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            MonitorError::Serialization(_) => StatusCode::BAD_REQUEST,
            MonitorError::NotFound(_) => StatusCode::NOT_FOUND,
            MonitorError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            MonitorError::SeriesDecode(_)
            | MonitorError::Database(_)
            | MonitorError::Config(_)
            | MonitorError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MonitorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = match &self {
            // Clients get the diagnostic as-is, without the category prefix.
            MonitorError::Validation(err) => err.message().to_string(),
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
