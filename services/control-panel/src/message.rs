//! Messages pushed by Polypheny-Control over the WebSocket
//!
//! Every frame is a JSON object whose keys are topics. The server serialises
//! all values through string maps, so `{"clientId":"3"}` and
//! `{"benchmarkerConnected":"false"}` are the normal shapes; plain JSON
//! numbers and booleans are accepted as well. A frame is decoded once into a
//! list of [`ServerEvent`]s in a fixed processing order.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ControlPanelError, Result};

/// Identifier the server assigns to each socket connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operating mode of the controlled Polypheny instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Idling,
    Running,
    Updating,
    Polyfier,
    /// A value this client does not know, e.g. from a newer server
    Unrecognized(String),
}

impl Status {
    pub fn as_str(&self) -> &str {
        match self {
            Status::Idling => "idling",
            Status::Running => "running",
            Status::Updating => "updating",
            Status::Polyfier => "polyfier",
            Status::Unrecognized(other) => other,
        }
    }
}

impl From<&str> for Status {
    fn from(s: &str) -> Self {
        match s {
            "idling" => Status::Idling,
            "running" => Status::Running,
            "updating" => Status::Updating,
            "polyfier" => Status::Polyfier,
            other => Status::Unrecognized(other.to_string()),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output panel a chunk of process output belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputPanel {
    Start,
    Stop,
    Restart,
    Update,
    Log,
    Polyfier,
}

impl OutputPanel {
    /// Panels in the order their topics are processed within a frame
    pub const ALL: [OutputPanel; 6] = [
        OutputPanel::Start,
        OutputPanel::Stop,
        OutputPanel::Restart,
        OutputPanel::Update,
        OutputPanel::Log,
        OutputPanel::Polyfier,
    ];

    /// Topic name used on the wire
    pub fn topic(&self) -> &'static str {
        match self {
            OutputPanel::Start => "startOutput",
            OutputPanel::Stop => "stopOutput",
            OutputPanel::Restart => "restartOutput",
            OutputPanel::Update => "updateOutput",
            OutputPanel::Log => "logOutput",
            OutputPanel::Polyfier => "polyfierOutput",
        }
    }
}

/// Checked-out branches and commits of Polypheny-DB and Polypheny-UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub pdb_branch: String,
    pub pdb_commit: String,
    pub pdb_behind: u64,
    pub pui_branch: String,
    pub pui_commit: String,
    pub pui_behind: u64,
}

impl VersionInfo {
    pub(crate) fn from_object(object: &Map<String, Value>) -> Self {
        let text = |key: &str, fallback: &str| {
            object
                .get(key)
                .and_then(scalar_string)
                .unwrap_or_else(|| fallback.to_string())
        };
        let behind = |key: &str| {
            object
                .get(key)
                .and_then(scalar_string)
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(0)
        };

        Self {
            pdb_branch: text("pdb-branch", "Unknown"),
            pdb_commit: text("pdb-commit", "--------"),
            pdb_behind: behind("pdb-behind"),
            pui_branch: text("pui-branch", "Unknown"),
            pui_commit: text("pui-commit", "--------"),
            pui_behind: behind("pui-behind"),
        }
    }
}

/// One decoded topic of a server frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    ClientId(ClientId),
    Status(Status),
    BenchmarkerConnected(bool),
    OtherInstances(u64),
    Version(VersionInfo),
    Output { panel: OutputPanel, text: String },
}

const KNOWN_TOPICS: [&str; 11] = [
    "clientId",
    "status",
    "benchmarkerConnected",
    "numberOfOtherRunningPolyphenyInstances",
    "version",
    "startOutput",
    "stopOutput",
    "restartOutput",
    "updateOutput",
    "logOutput",
    "polyfierOutput",
];

/// Decode one WebSocket text frame
///
/// Only a frame that is not a JSON object fails as a whole. Unknown topics
/// are skipped, and a known topic with an unusable value is logged and
/// skipped without affecting the other topics of the frame.
pub fn decode_frame(frame: &str) -> Result<Vec<ServerEvent>> {
    let value: Value = serde_json::from_str(frame)?;
    let object = value.as_object().ok_or_else(|| {
        ControlPanelError::InvalidMessage(format!("expected a JSON object, got: {}", frame))
    })?;

    for key in object.keys() {
        if !KNOWN_TOPICS.contains(&key.as_str()) {
            tracing::trace!("Ignoring unknown topic '{}'", key);
        }
    }

    let mut events = Vec::new();
    for topic in STATE_TOPICS {
        if let Some(value) = object.get(topic) {
            keep(&mut events, topic, decode_state_topic(topic, value));
        }
    }
    for panel in OutputPanel::ALL {
        if let Some(value) = object.get(panel.topic()) {
            keep(&mut events, panel.topic(), decode_output(panel, value));
        }
    }

    Ok(events)
}

/// Non-output topics in processing order
const STATE_TOPICS: [&str; 5] = [
    "clientId",
    "status",
    "benchmarkerConnected",
    "numberOfOtherRunningPolyphenyInstances",
    "version",
];

fn keep(events: &mut Vec<ServerEvent>, topic: &str, decoded: Result<ServerEvent>) {
    match decoded {
        Ok(event) => events.push(event),
        Err(e) => tracing::warn!("Skipping topic '{}': {}", topic, e),
    }
}

fn decode_state_topic(topic: &str, value: &Value) -> Result<ServerEvent> {
    match topic {
        "clientId" => scalar_string(value)
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(|id| ServerEvent::ClientId(ClientId(id)))
            .ok_or_else(|| invalid(topic, value)),
        "status" => scalar_string(value)
            .map(|s| ServerEvent::Status(Status::from(s.as_str())))
            .ok_or_else(|| invalid(topic, value)),
        "benchmarkerConnected" => {
            let connected = match value {
                Value::Bool(b) => *b,
                Value::String(s) => s == "true",
                _ => false,
            };
            Ok(ServerEvent::BenchmarkerConnected(connected))
        }
        "numberOfOtherRunningPolyphenyInstances" => scalar_string(value)
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(ServerEvent::OtherInstances)
            .ok_or_else(|| invalid(topic, value)),
        "version" => value
            .as_object()
            .map(|v| ServerEvent::Version(VersionInfo::from_object(v)))
            .ok_or_else(|| invalid(topic, value)),
        other => Err(ControlPanelError::InvalidMessage(format!(
            "not a state topic: {}",
            other
        ))),
    }
}

fn decode_output(panel: OutputPanel, value: &Value) -> Result<ServerEvent> {
    let text = match value {
        Value::Null => "null".to_string(),
        other => scalar_string(other).ok_or_else(|| invalid(panel.topic(), other))?,
    };
    Ok(ServerEvent::Output { panel, text })
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn invalid(topic: &str, value: &Value) -> ControlPanelError {
    ControlPanelError::InvalidMessage(format!("unusable value for '{}': {}", topic, value))
}
