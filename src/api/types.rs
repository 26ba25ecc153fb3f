use serde::{Deserialize, Serialize};

/// Response from `streaming.new`: everything needed to open the transports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionResponse {
    /// Opaque session identifier assigned by the service.
    pub session_id: String,

    /// Access token for the room transport.
    pub access_token: String,

    /// Room connection URL.
    pub url: String,

    #[serde(default)]
    pub is_paid: bool,

    #[serde(default)]
    pub session_duration_limit: u64,
}
