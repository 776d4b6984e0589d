use axum::{body::Bytes, extract::State, http::HeaderMap, http::StatusCode};
use serde_json::Value;
use tracing::info;

use super::{params, ApiState};
use crate::telemetry::RequestTimer;
use crate::Result;

/// Accept an event body after structural validation. Forwarding to the
/// event pipeline happens downstream of this gate.
pub async fn post_event(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode> {
    let _timer = RequestTimer::new("post_event");
    let tenant_id = params::tenant_id(&headers)?;

    let body: Value = serde_json::from_slice(&body)?;
    state.validator.validate(&body)?;
    info!("Accepted event for tenant {}", tenant_id);

    Ok(StatusCode::NO_CONTENT)
}
