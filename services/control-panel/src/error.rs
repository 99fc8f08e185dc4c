//! Error types for the control panel client

/// Errors that can occur while talking to Polypheny-Control
#[derive(Debug, thiserror::Error)]
pub enum ControlPanelError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Polypheny-DB is {status}, expected idling")]
    NotIdle { status: String },

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for control panel operations
pub type Result<T> = std::result::Result<T, ControlPanelError>;
