use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

mod mitigation;

pub use mitigation::{
    CommonDetails, EmailInfos, FileInfos, MitigationAction, MitigationEvent, MitigationInfo,
    MitigationInfoType, MitigationReason, UrlInfos,
};

/// Current Unix time in seconds, as carried by every event.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Kind of error reported to the connector manager.
///
/// This is an open set: connectors may introduce their own kinds, so it is a
/// string newtype rather than an enum.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorKind(Cow<'static, str>);

impl ErrorKind {
    /// Errors of the malware detection client.
    pub const GMALWARE: ErrorKind = ErrorKind(Cow::Borrowed("gmalware"));
    /// Malware detection client configuration or reconfiguration errors.
    pub const GMALWARE_CONFIG: ErrorKind = ErrorKind(Cow::Borrowed("gmalware-bad-config"));

    pub fn new(kind: impl Into<Cow<'static, str>>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for ErrorKind {
    fn from(s: &'static str) -> Self {
        Self(Cow::Borrowed(s))
    }
}

impl From<String> for ErrorKind {
    fn from(s: String) -> Self {
        Self(Cow::Owned(s))
    }
}

/// Wire tag of an event. Each tag maps to exactly one [`Event`] variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum EventType {
    TaskAck,
    Mitigation,
    Log,
    Error,
    Resolution,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::TaskAck => "task",
            EventType::Mitigation => "mitigation",
            EventType::Log => "log",
            EventType::Error => "error",
            EventType::Resolution => "resolution",
        }
    }
}

impl FromStr for EventType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "task" => Ok(EventType::TaskAck),
            "mitigation" => Ok(EventType::Mitigation),
            "log" => Ok(EventType::Log),
            "error" => Ok(EventType::Error),
            "resolution" => Ok(EventType::Resolution),
            other => Err(Error::InvalidEventType(other.to_string())),
        }
    }
}

impl TryFrom<String> for EventType {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<EventType> for &'static str {
    fn from(t: EventType) -> Self {
        t.as_str()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acknowledgement of a dispatched task. An empty `error_message` means success.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskAckEvent {
    pub task_id: String,
    #[serde(default)]
    pub error_message: String,
    pub time: i64,
}

impl TaskAckEvent {
    pub fn new(task_id: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            error_message: error_message.into(),
            time: unix_now(),
        }
    }
}

/// A structured log record forwarded to the connector manager.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    /// One of "debug", "info", "warn", "error"
    pub level: String,
    pub message: String,
    pub time: i64,
    /// Nested attribute tree: groups are JSON objects
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub error: String,
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub time: i64,
}

impl ErrorEvent {
    pub fn new(kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind,
            time: unix_now(),
        }
    }
}

/// Resolution of one or more previously reported error kinds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolutionEvent {
    #[serde(rename = "type")]
    pub kinds: Vec<ErrorKind>,
    pub resolution: String,
    pub time: i64,
}

impl ResolutionEvent {
    pub fn new(kinds: Vec<ErrorKind>, resolution: impl Into<String>) -> Self {
        Self {
            kinds,
            resolution: resolution.into(),
            time: unix_now(),
        }
    }
}

/// Every event the connector can push to the manager.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Mitigation(MitigationEvent),
    TaskAck(TaskAckEvent),
    Log(LogEvent),
    Error(ErrorEvent),
    Resolution(ResolutionEvent),
}

impl Event {
    pub fn event_type(&self) -> EventType {
        match self {
            Event::Mitigation(_) => EventType::Mitigation,
            Event::TaskAck(_) => EventType::TaskAck,
            Event::Log(_) => EventType::Log,
            Event::Error(_) => EventType::Error,
            Event::Resolution(_) => EventType::Resolution,
        }
    }

    pub fn time(&self) -> i64 {
        match self {
            Event::Mitigation(e) => e.time,
            Event::TaskAck(e) => e.time,
            Event::Log(e) => e.time,
            Event::Error(e) => e.time,
            Event::Resolution(e) => e.time,
        }
    }

    /// Serializes the payload alone (without its tag).
    pub fn payload(&self) -> Result<Box<RawValue>> {
        let raw = match self {
            Event::Mitigation(e) => serde_json::value::to_raw_value(e)?,
            Event::TaskAck(e) => serde_json::value::to_raw_value(e)?,
            Event::Log(e) => serde_json::value::to_raw_value(e)?,
            Event::Error(e) => serde_json::value::to_raw_value(e)?,
            Event::Resolution(e) => serde_json::value::to_raw_value(e)?,
        };
        Ok(raw)
    }

    /// Decodes a payload according to its wire tag.
    pub fn decode(tag: &str, payload: &RawValue) -> Result<Self> {
        let raw = payload.get();
        let event = match tag.parse::<EventType>()? {
            EventType::Mitigation => Event::Mitigation(serde_json::from_str(raw)?),
            EventType::TaskAck => Event::TaskAck(serde_json::from_str(raw)?),
            EventType::Log => Event::Log(serde_json::from_str(raw)?),
            EventType::Error => Event::Error(serde_json::from_str(raw)?),
            EventType::Resolution => Event::Resolution(serde_json::from_str(raw)?),
        };
        Ok(event)
    }
}

impl From<MitigationEvent> for Event {
    fn from(e: MitigationEvent) -> Self {
        Event::Mitigation(e)
    }
}

impl From<TaskAckEvent> for Event {
    fn from(e: TaskAckEvent) -> Self {
        Event::TaskAck(e)
    }
}

impl From<LogEvent> for Event {
    fn from(e: LogEvent) -> Self {
        Event::Log(e)
    }
}

impl From<ErrorEvent> for Event {
    fn from(e: ErrorEvent) -> Self {
        Event::Error(e)
    }
}

impl From<ResolutionEvent> for Event {
    fn from(e: ResolutionEvent) -> Self {
        Event::Resolution(e)
    }
}

/// Body of `POST .../events`: the tagged, serialized event.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub event: Box<RawValue>,
}

impl Envelope {
    pub fn wrap(event: &Event) -> Result<Self> {
        Ok(Self {
            event_type: event.event_type(),
            event: event.payload()?,
        })
    }

    pub fn into_event(self) -> Result<Event> {
        Event::decode(self.event_type.as_str(), &self.event)
    }
}
