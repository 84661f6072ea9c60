use serde_json::Value;

use crate::{error::EncodeError, events::Event};

/// Serialized form of one event, as handed to a [`Sink`](crate::sink::Sink).
pub type Payload = Value;

/// Builds the self-contained document sent for each event.
pub trait EventEncoder: Send + Sync {
    fn encode(&self, event: &Event) -> Result<Payload, EncodeError>;
}

/// Encodes every event attribute into a flat JSON object.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonEncoder;

impl EventEncoder for JsonEncoder {
    fn encode(&self, event: &Event) -> Result<Payload, EncodeError> {
        serde_json::to_value(event).map_err(|e| EncodeError {
            sequence: event.sequence(),
            reason: e.to_string(),
        })
    }
}

/// Read the sequence number back out of an encoded payload.
pub fn payload_sequence(payload: &Payload) -> Option<u64> {
    payload.get("position").and_then(Value::as_u64)
}
