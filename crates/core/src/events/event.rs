use std::{borrow::Cow, fmt, time::SystemTime};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of interaction an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// A value was set (a parameter, a filter, an environment observation).
    Set,
    /// A button or menu entry was clicked.
    Click,
    /// A toggle was switched.
    Switch,
}

/// Optional scalar attached to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for EventValue {
    fn from(v: bool) -> Self {
        EventValue::Bool(v)
    }
}

impl From<i64> for EventValue {
    fn from(v: i64) -> Self {
        EventValue::Int(v)
    }
}

impl From<i32> for EventValue {
    fn from(v: i32) -> Self {
        EventValue::Int(v.into())
    }
}

impl From<u32> for EventValue {
    fn from(v: u32) -> Self {
        EventValue::Int(v.into())
    }
}

impl From<u64> for EventValue {
    fn from(v: u64) -> Self {
        EventValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<usize> for EventValue {
    fn from(v: usize) -> Self {
        EventValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for EventValue {
    fn from(v: f64) -> Self {
        EventValue::Float(v)
    }
}

impl From<&str> for EventValue {
    fn from(v: &str) -> Self {
        EventValue::Text(v.to_string())
    }
}

impl From<String> for EventValue {
    fn from(v: String) -> Self {
        EventValue::Text(v)
    }
}

/// Where in the hosting application an event happened.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Location(Cow<'static, str>);

impl Location {
    pub const GENERAL: Location = Location(Cow::Borrowed("General"));
    pub const INFO: Location = Location(Cow::Borrowed("Info"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Location {
    fn from(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }
}

impl From<String> for Location {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

/// One recorded usage occurrence.
///
/// Events are only minted by [`EventFactory`](crate::events::EventFactory), which
/// owns the sequence counter. The sequence is serialized as `position`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    kind: EventKind,
    name: String,
    location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<EventValue>,
    session_id: Uuid,
    #[serde(rename = "position")]
    sequence: u64,
    timestamp: SystemTime,
}

impl Event {
    pub(crate) fn new(
        kind: EventKind,
        name: String,
        location: Location,
        value: Option<EventValue>,
        session_id: Uuid,
        sequence: u64,
    ) -> Self {
        Self {
            kind,
            name,
            location,
            value,
            session_id,
            sequence,
            timestamp: SystemTime::now(),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn value(&self) -> Option<&EventValue> {
        self.value.as_ref()
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }
}

#[cfg(test)]
pub(crate) fn test_event(sequence: u64) -> Event {
    Event::new(
        EventKind::Click,
        format!("event-{sequence}"),
        Location::GENERAL,
        None,
        Uuid::nil(),
        sequence,
    )
}
