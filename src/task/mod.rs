use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt;


/// A unit of work issued by the connector manager.
///
/// Tasks are created and mutated server-side only. The client reads them,
/// dispatches the action and answers with a task acknowledgement event.
///
/// Every field has a default so one incomplete task never makes the whole
/// batch unreadable; a task without an action is acknowledged as a no-op.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub connector_id: String,
    #[serde(default)]
    pub action: ActionType,

    /// Unix timestamps in seconds, 0 = unset
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub started: i64,
    #[serde(default)]
    pub completed: i64,

    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub original_id: String,

    /// Action-specific payload (e.g. `{"id": "..."}` for restore)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Box<RawValue>>,
}

impl Task {
    /// Lifecycle status, derived from the timestamps and flags.
    pub fn status(&self) -> TaskStatus {
        if self.started == 0 && self.archived {
            TaskStatus::Cancelled
        } else if self.started == 0 {
            TaskStatus::Pending
        } else if self.started > 0 && self.completed == 0 {
            TaskStatus::ToAck
        } else if self.error && !self.archived {
            TaskStatus::Error
        } else if self.archived {
            TaskStatus::Archived
        } else {
            TaskStatus::Unknown
        }
    }
}

/// Task action. Unknown actions are kept verbatim so newer servers can
/// issue them without breaking older connectors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionType {
    UpdateConfig,
    Stop,
    Start,
    Restore,
    Other(String),
}

impl ActionType {
    pub fn as_str(&self) -> &str {
        match self {
            ActionType::UpdateConfig => "update-config",
            ActionType::Stop => "stop",
            ActionType::Start => "start",
            ActionType::Restore => "restore",
            ActionType::Other(s) => s,
        }
    }
}

impl Default for ActionType {
    fn default() -> Self {
        ActionType::Other(String::new())
    }
}

impl From<String> for ActionType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "update-config" => ActionType::UpdateConfig,
            "stop" => ActionType::Stop,
            "start" => ActionType::Start,
            "restore" => ActionType::Restore,
            _ => ActionType::Other(s),
        }
    }
}

impl From<ActionType> for String {
    fn from(action: ActionType) -> Self {
        match action {
            ActionType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a `restore` task.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreActionContent {
    /// Identifier of the element to restore (required)
    #[serde(default)]
    pub id: String,
}

/// Derived task status. Never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    ToAck,
    Error,
    Archived,
    Cancelled,
    Unknown,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::ToAck => "toack",
            TaskStatus::Error => "error",
            TaskStatus::Archived => "archived",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
