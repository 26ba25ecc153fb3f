//! Socket-transport voice chat: raw capture encoded to binary audio frames.
//!
//! The processing graph is hand-built from raw capture callbacks, so there is
//! no in-place device swap: switching devices is a full stop and restart with
//! the previous mute state carried over.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::VoiceChatTransport;
use crate::config::VoiceChatOptions;
use crate::error::{AvatarError, TransportError};
use crate::media::{CaptureConstraints, CaptureHandle, MediaDevices};
use crate::transport::frames::{
    convert_f32_to_s16_pcm, encode_audio_frame, SOCKET_SAMPLE_RATE,
};
use crate::transport::FrameSink;

/// Wait after wiring the capture graph before reporting ready; the socket is
/// open but the remote stream may not be.
const DEFAULT_STREAM_SETTLE: Duration = Duration::from_secs(2);

pub struct SocketVoiceChat {
    sink: Arc<dyn FrameSink>,
    devices: Arc<dyn MediaDevices>,
    settle: Duration,
    muted: Arc<AtomicBool>,
    capture: Option<Box<dyn CaptureHandle>>,
    pump: Option<JoinHandle<()>>,
}

impl SocketVoiceChat {
    pub fn new(sink: Arc<dyn FrameSink>, devices: Arc<dyn MediaDevices>) -> Self {
        Self {
            sink,
            devices,
            settle: DEFAULT_STREAM_SETTLE,
            muted: Arc::new(AtomicBool::new(true)),
            capture: None,
            pump: None,
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }
}

#[async_trait]
impl VoiceChatTransport for SocketVoiceChat {
    async fn start(&mut self, opts: &VoiceChatOptions) -> Result<(), AvatarError> {
        let constraints = CaptureConstraints {
            device_id: opts.device_id.clone(),
            sample_rate: SOCKET_SAMPLE_RATE,
            channels: 1,
            ..CaptureConstraints::default()
        };
        let crate::media::RawCapture { mut frames, handle } =
            self.devices.open_raw_capture(&constraints).await?;
        self.muted.store(opts.muted, Ordering::SeqCst);
        self.capture = Some(handle);

        let sink = Arc::clone(&self.sink);
        let muted = Arc::clone(&self.muted);
        let pump = tokio::spawn(async move {
            while let Some(buffer) = frames.recv().await {
                // While muted, a silence buffer of identical size goes out so
                // the frame cadence and remote VAD state are unchanged.
                let samples = if muted.load(Ordering::SeqCst) {
                    convert_f32_to_s16_pcm(&vec![0.0; buffer.len()])
                } else {
                    convert_f32_to_s16_pcm(&buffer)
                };
                match sink.send_frame(encode_audio_frame(&samples)).await {
                    Ok(()) => {}
                    Err(TransportError::ChannelClosed) => {
                        debug!("Chat channel closed, stopping audio pump");
                        break;
                    }
                    Err(e) => {
                        warn!("Failed to send audio frame: {}", e);
                    }
                }
            }
            debug!("Audio pump finished");
        });
        self.pump = Some(pump);

        info!("Socket voice chat streaming");
        tokio::time::sleep(self.settle).await;
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        if let Some(capture) = self.capture.take() {
            capture.stop();
        }
    }

    fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }

    async fn set_device(&mut self, device_id: &str, muted: bool) -> Result<(), AvatarError> {
        self.stop().await;
        self.start(&VoiceChatOptions {
            device_id: Some(device_id.to_string()),
            muted,
        })
        .await
    }

    async fn device_id(&self) -> Option<String> {
        self.capture.as_ref().and_then(|c| c.device_id())
    }
}
