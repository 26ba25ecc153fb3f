//! Device and capture boundary for the execution environment.
//!
//! The crate does not own microphone access; the embedder supplies a
//! [`MediaDevices`] implementation. Two capture shapes are consumed: a
//! processed track the room transport publishes directly, and a raw callback
//! stream the socket transport encodes by hand.

pub mod devices;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use crate::error::MediaError;

pub use devices::{
    resolve_default_device, AudioInputDevice, AudioInputDevices, DeviceInfo, ResolvedDevice,
    DEFAULT_DEVICE_ID,
};

/// Constraints applied when acquiring a capture resource.
#[derive(Debug, Clone)]
pub struct CaptureConstraints {
    /// Specific device to bind, or the environment default when `None`.
    pub device_id: Option<String>,
    pub sample_rate: u32,
    pub channels: u16,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            device_id: None,
            sample_rate: 16000,
            channels: 1,
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

/// A processed local audio track, publishable on the room transport.
#[async_trait]
pub trait CaptureTrack: Send + Sync {
    /// Enable or disable the track. Disabled tracks transmit silence.
    fn set_enabled(&self, enabled: bool);

    fn is_enabled(&self) -> bool;

    fn device_id(&self) -> Option<String>;

    /// Swap the underlying capture device without rebuilding the track.
    async fn set_device(&self, device_id: &str) -> Result<(), MediaError>;

    /// Release the capture resource.
    fn stop(&self);
}

/// Handle to a raw capture stream's device resource.
pub trait CaptureHandle: Send + Sync {
    fn stop(&self);
    fn device_id(&self) -> Option<String>;
}

/// Raw capture: fixed-size float buffers delivered over a channel, plus the
/// handle that releases the device.
pub struct RawCapture {
    /// One buffer per capture callback, `CAPTURE_BUFFER_SAMPLES` samples each.
    pub frames: mpsc::Receiver<Vec<f32>>,
    pub handle: Box<dyn CaptureHandle>,
}

/// The environment's device/media API surface.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// List audio input devices, including the environment's synthetic
    /// "default" entry when it has one.
    async fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, MediaError>;

    /// Acquire a processed capture track.
    async fn open_track(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Arc<dyn CaptureTrack>, MediaError>;

    /// Acquire a raw capture stream.
    async fn open_raw_capture(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<RawCapture, MediaError>;

    /// Notified on every device hot-plug change.
    fn subscribe_device_changes(&self) -> broadcast::Receiver<()>;
}
