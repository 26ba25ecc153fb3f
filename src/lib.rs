pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod media;
pub mod quality;
pub mod session;
pub mod transport;
pub mod voice;

pub use api::{ApiClient, StartSessionResponse};
pub use config::{
    ApiConfig, AvatarQuality, SpeakRequest, StartAvatarRequest, SttProvider, SttSettings,
    TaskMode, TaskType, TransportKind, VoiceChatOptions, VoiceEmotion, VoiceSettings,
};
pub use error::{AvatarError, MediaError, TransportError};
pub use events::{EventEmitter, HandlerId, StreamingEvent, StreamingEventKind};
pub use media::{
    AudioInputDevice, AudioInputDevices, CaptureConstraints, CaptureHandle, CaptureTrack,
    DeviceInfo, MediaDevices, RawCapture, ResolvedDevice,
};
pub use quality::{
    ConnectionQuality, IndicatorFactory, QualityCallback, QualityIndicator, QualityMixer,
    RoomQualityIndicator, RtcQualityIndicator,
};
pub use session::{SessionPhase, StreamingAvatar};
pub use transport::{
    ChatSocket, FrameSink, MediaStream, NetworkScores, RemoteTrack, RoomConnection,
    RoomConnectionState, RoomEvent, RoomProvider, RoomQualityLevel, TrackKind,
};
pub use voice::{RoomVoiceChat, SocketVoiceChat, VoiceChat, VoiceChatState, VoiceChatTransport};
