//! Voice chat: the local microphone-capture lifecycle bound to one transport.
//!
//! One `VoiceChatTransport` implementation exists per transport kind; the
//! [`VoiceChat`] facade owns the shared state machine and mute bookkeeping so
//! the variants only deal with their capture resources.

mod chat;
mod room;
mod socket;

use async_trait::async_trait;

pub use chat::{VoiceChat, VoiceChatState};
pub use room::RoomVoiceChat;
pub use socket::SocketVoiceChat;

use crate::config::VoiceChatOptions;
use crate::error::AvatarError;

/// Transport-specific capture operations, driven by the [`VoiceChat`] facade.
///
/// Implementations acquire exactly one capture resource in `start` and release
/// it in `stop`; the facade guarantees the calls are sequenced (never two
/// starts in flight, stop before restart).
#[async_trait]
pub trait VoiceChatTransport: Send + Sync {
    /// Acquire the capture resource, apply `opts.muted`, and begin streaming.
    /// Must not return before the remote side can be assumed ready.
    async fn start(&mut self, opts: &VoiceChatOptions) -> Result<(), AvatarError>;

    /// Release the capture resource and any processing graph. Tolerates
    /// partial state from a failed start.
    async fn stop(&mut self);

    /// Apply a mute state to the live capture resource.
    fn set_muted(&self, muted: bool);

    /// Switch the capture device, preserving the given mute state.
    async fn set_device(&mut self, device_id: &str, muted: bool) -> Result<(), AvatarError>;

    async fn device_id(&self) -> Option<String>;
}
