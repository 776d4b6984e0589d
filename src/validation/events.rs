//! Structural gate for event submission bodies.
//!
//! An event is a flat object: string keys of at most 255 characters mapped
//! to null, strings, booleans, numbers, nested objects or empty arrays.
//! Nested objects are accepted without inspection. The rule is a Draft 7
//! JSON Schema compiled once per [`SequencePolicy`].

use jsonschema::{Draft, JSONSchema};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;
use tracing::debug;

use crate::{telemetry, MonitorError, ValidationError};

pub const MAX_KEY_LENGTH: usize = 255;

/// Which array values an event may carry.
///
/// `EmptyOnly` keeps the historical rule that only `[]` is accepted. Whether
/// that restriction is intended is unresolved, so `Scalars` (arrays of
/// null/string/bool/number) is available behind configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequencePolicy {
    #[default]
    EmptyOnly,
    Scalars,
}

impl FromStr for SequencePolicy {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "empty_only" => Ok(SequencePolicy::EmptyOnly),
            "scalars" => Ok(SequencePolicy::Scalars),
            other => Err(MonitorError::Config(format!(
                "Unknown sequence policy: {}. Use 'empty_only' or 'scalars'",
                other
            ))),
        }
    }
}

lazy_static! {
    static ref EMPTY_ONLY_SCHEMA: JSONSchema = compile(SequencePolicy::EmptyOnly);
    static ref SCALARS_SCHEMA: JSONSchema = compile(SequencePolicy::Scalars);
}

/// The event rule as a JSON Schema document.
pub fn event_schema(policy: SequencePolicy) -> Value {
    let sequence = match policy {
        SequencePolicy::EmptyOnly => json!({"type": "array", "maxItems": 0}),
        SequencePolicy::Scalars => json!({
            "type": "array",
            "items": {"type": ["null", "string", "boolean", "number"]}
        }),
    };

    json!({
        "type": "object",
        "propertyNames": {"maxLength": MAX_KEY_LENGTH},
        "additionalProperties": {
            "anyOf": [
                {"type": ["null", "string", "boolean", "integer", "number", "object"]},
                sequence
            ]
        }
    })
}

fn compile(policy: SequencePolicy) -> JSONSchema {
    let schema = event_schema(policy);
    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&schema)
        .expect("built-in event schema must compile")
}

#[derive(Debug, Clone)]
pub struct EventValidator {
    policy: SequencePolicy,
    schema: &'static JSONSchema,
}

impl EventValidator {
    pub fn new(policy: SequencePolicy) -> Self {
        let schema: &'static JSONSchema = match policy {
            SequencePolicy::EmptyOnly => &*EMPTY_ONLY_SCHEMA,
            SequencePolicy::Scalars => &*SCALARS_SCHEMA,
        };
        Self { policy, schema }
    }

    pub fn policy(&self) -> SequencePolicy {
        self.policy
    }

    /// Accept `body` as-is or reject it with a single normalized error.
    pub fn validate(&self, body: &Value) -> Result<(), ValidationError> {
        match self.schema.validate(body) {
            Ok(()) => Ok(()),
            Err(errors) => {
                let messages: Vec<String> = errors
                    .map(|e| {
                        let message = e.to_string().replace('\n', " ");
                        let path = e.instance_path.to_string();
                        if path.is_empty() {
                            message
                        } else {
                            format!("{} at {}", message, path)
                        }
                    })
                    .collect();
                Err(reject(messages.join("; ")))
            }
        }
    }
}

impl Default for EventValidator {
    fn default() -> Self {
        EventValidator::new(SequencePolicy::default())
    }
}

/// Validate `body` with the default policy.
pub fn validate(body: &Value) -> Result<(), ValidationError> {
    EventValidator::default().validate(body)
}

fn reject(message: String) -> ValidationError {
    debug!(error = %message, "event body rejected");
    telemetry::record_validation_failure();
    ValidationError::new(message)
}
