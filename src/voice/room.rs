//! Room-transport voice chat: a processed capture track published to the room.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use super::VoiceChatTransport;
use crate::config::VoiceChatOptions;
use crate::error::AvatarError;
use crate::media::{CaptureConstraints, CaptureTrack, MediaDevices};
use crate::transport::RoomConnection;

/// Wait after publishing before reporting ready, absorbing server-side stream
/// setup latency.
const DEFAULT_PUBLISH_SETTLE: Duration = Duration::from_secs(4);

const ROOM_CAPTURE_SAMPLE_RATE: u32 = 48_000;

pub struct RoomVoiceChat {
    room: Arc<dyn RoomConnection>,
    devices: Arc<dyn MediaDevices>,
    settle: Duration,
    track: Option<Arc<dyn CaptureTrack>>,
}

impl RoomVoiceChat {
    pub fn new(room: Arc<dyn RoomConnection>, devices: Arc<dyn MediaDevices>) -> Self {
        Self {
            room,
            devices,
            settle: DEFAULT_PUBLISH_SETTLE,
            track: None,
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }
}

#[async_trait]
impl VoiceChatTransport for RoomVoiceChat {
    async fn start(&mut self, opts: &VoiceChatOptions) -> Result<(), AvatarError> {
        let constraints = CaptureConstraints {
            device_id: opts.device_id.clone(),
            sample_rate: ROOM_CAPTURE_SAMPLE_RATE,
            ..CaptureConstraints::default()
        };
        let track = self.devices.open_track(&constraints).await?;
        self.track = Some(Arc::clone(&track));

        self.room.publish_track(Arc::clone(&track)).await?;
        track.set_enabled(!opts.muted);

        info!("Published voice chat track");
        tokio::time::sleep(self.settle).await;
        Ok(())
    }

    async fn stop(&mut self) {
        if let Err(e) = self.room.unpublish_audio().await {
            warn!("Failed to unpublish voice chat track: {}", e);
        }
        if let Some(track) = self.track.take() {
            track.stop();
        }
    }

    fn set_muted(&self, muted: bool) {
        if let Some(track) = &self.track {
            track.set_enabled(!muted);
        }
    }

    async fn set_device(&mut self, device_id: &str, _muted: bool) -> Result<(), AvatarError> {
        if let Some(track) = &self.track {
            track.set_device(device_id).await?;
        }
        Ok(())
    }

    async fn device_id(&self) -> Option<String> {
        self.track.as_ref().and_then(|t| t.device_id())
    }
}
