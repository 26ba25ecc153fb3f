use std::time::Duration;

use thiserror::Error;

/// Top-level error type surfaced by the session API.
#[derive(Debug, Error)]
pub enum AvatarError {
    /// Non-2xx response from the remote negotiation API. Carries the raw
    /// response body; never retried automatically.
    #[error("API request failed with status {status}")]
    Api { status: u16, body: String },

    #[error("there is already an active session")]
    AlreadyActive,

    #[error("no active session")]
    NoActiveSession,

    #[error("invalid base path: {0}")]
    InvalidBasePath(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Errors from the real-time transports (room or socket).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The push channel was already closing or closed. Expected during
    /// teardown races; callers tearing down swallow this class.
    #[error("channel already closed")]
    ChannelClosed,

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("connection timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport not connected")]
    NotConnected,

    #[error("room error: {0}")]
    Room(String),
}

/// Errors from the device/media layer.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("audio capture unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("device enumeration failed: {0}")]
    Enumeration(String),
}
