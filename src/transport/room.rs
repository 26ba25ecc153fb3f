//! Boundary types for the vendor's multi-party room protocol.
//!
//! The room SDK itself is an external collaborator; the session core drives it
//! through these traits and consumes its events over broadcast channels. Fake
//! implementations back the integration tests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::TransportError;
use crate::media::CaptureTrack;

/// Media kind of a remote track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// Handle to a track subscribed from the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    /// Server-assigned track identifier.
    pub sid: String,
    pub kind: TrackKind,
}

/// Vendor-level connection quality report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomQualityLevel {
    Excellent,
    Good,
    Poor,
    Lost,
}

/// Vendor-level connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomConnectionState {
    Connected,
    Disconnected,
    Reconnecting,
    SignalReconnecting,
}

/// Per-direction MOS-like network scores sampled from the peer connection.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NetworkScores {
    pub inbound: Option<f64>,
    pub outbound: Option<f64>,
}

/// Events surfaced by a room connection.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    TrackSubscribed(RemoteTrack),
    TrackUnsubscribed(RemoteTrack),
    /// Payload published on the room data channel.
    DataReceived(Vec<u8>),
    Disconnected { reason: String },
    QualityChanged(RoomQualityLevel),
    StateChanged(RoomConnectionState),
}

/// The room transport as the session core consumes it.
#[async_trait]
pub trait RoomConnection: Send + Sync {
    /// Connect to the room service. Events begin flowing afterwards.
    async fn connect(&self, url: &str, token: &str) -> Result<(), TransportError>;

    /// Publish a payload on the reliable data channel.
    async fn publish_data(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Publish a local audio capture track.
    async fn publish_track(&self, track: Arc<dyn CaptureTrack>) -> Result<(), TransportError>;

    /// Stop publishing the local audio track, if any.
    async fn unpublish_audio(&self) -> Result<(), TransportError>;

    /// Subscribe to room events. Each call returns an independent receiver.
    fn subscribe(&self) -> broadcast::Receiver<RoomEvent>;

    /// Subscribe to peer-connection network score samples.
    fn subscribe_stats(&self) -> broadcast::Receiver<NetworkScores>;

    async fn disconnect(&self);
}

/// Creates one unconnected room per session.
#[async_trait]
pub trait RoomProvider: Send + Sync {
    async fn create(&self) -> Result<Arc<dyn RoomConnection>, TransportError>;
}

/// Read-only handle to the combined remote media output.
///
/// Owned by the session; the UI receives clones and must not mutate the
/// underlying track set.
#[derive(Debug, Clone, Default)]
pub struct MediaStream {
    pub audio_tracks: Vec<RemoteTrack>,
    pub video_tracks: Vec<RemoteTrack>,
}

impl MediaStream {
    pub fn has_audio(&self) -> bool {
        !self.audio_tracks.is_empty()
    }

    pub fn has_video(&self) -> bool {
        !self.video_tracks.is_empty()
    }
}
