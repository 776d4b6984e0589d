pub mod events;

pub use events::{event_schema, validate, EventValidator, SequencePolicy, MAX_KEY_LENGTH};
