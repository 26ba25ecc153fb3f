use tracing::{debug, warn};

use super::VoiceChatTransport;
use crate::config::VoiceChatOptions;
use crate::error::AvatarError;

/// Lifecycle of one voice-chat instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceChatState {
    #[default]
    Inactive,
    Starting,
    Active,
    Stopping,
}

/// One voice-chat instance: a transport implementation plus the shared state
/// machine.
///
/// Starting while already active fully stops the previous capture first, so at
/// most one capture resource is live at a time. A failed start tears down
/// partial state before the error propagates, leaving the instance inactive.
pub struct VoiceChat {
    transport: Box<dyn VoiceChatTransport>,
    state: VoiceChatState,
    muted: bool,
}

impl VoiceChat {
    pub fn new(transport: Box<dyn VoiceChatTransport>) -> Self {
        Self {
            transport,
            state: VoiceChatState::Inactive,
            muted: true,
        }
    }

    pub fn state(&self) -> VoiceChatState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != VoiceChatState::Inactive
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub async fn start(&mut self, opts: VoiceChatOptions) -> Result<(), AvatarError> {
        if self.state != VoiceChatState::Inactive {
            debug!("Voice chat already running, stopping before restart");
            self.stop().await;
        }

        self.state = VoiceChatState::Starting;
        match self.transport.start(&opts).await {
            Ok(()) => {
                self.muted = opts.muted;
                self.state = VoiceChatState::Active;
                Ok(())
            }
            Err(e) => {
                self.state = VoiceChatState::Stopping;
                self.transport.stop().await;
                self.muted = true;
                self.state = VoiceChatState::Inactive;
                Err(e)
            }
        }
    }

    /// No-op when already inactive.
    pub async fn stop(&mut self) {
        if self.state == VoiceChatState::Inactive {
            return;
        }
        self.state = VoiceChatState::Stopping;
        self.transport.stop().await;
        self.muted = true;
        self.state = VoiceChatState::Inactive;
    }

    /// No-op unless active.
    pub fn mute(&mut self) {
        if self.state != VoiceChatState::Active {
            return;
        }
        self.transport.set_muted(true);
        self.muted = true;
    }

    /// No-op unless active.
    pub fn unmute(&mut self) {
        if self.state != VoiceChatState::Active {
            return;
        }
        self.transport.set_muted(false);
        self.muted = false;
    }

    pub async fn device_id(&self) -> Option<String> {
        self.transport.device_id().await
    }

    /// Switch the capture device. Only valid while active; the current mute
    /// state carries over.
    pub async fn set_device_id(&mut self, device_id: &str) -> Result<(), AvatarError> {
        if self.state != VoiceChatState::Active {
            warn!("Cannot set device id when voice chat is not active");
            return Ok(());
        }
        self.transport.set_device(device_id, self.muted).await
    }
}
