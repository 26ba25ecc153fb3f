use serde::{Deserialize, Serialize};

/// Default remote API base path.
pub const DEFAULT_BASE_PATH: &str = "https://api.avatarlink.io";

/// Credentials and endpoint for the remote avatar service.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bearer token used for every negotiation call and the chat socket.
    pub token: String,

    /// Base URL of the negotiation REST API.
    pub base_path: String,
}

impl ApiConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_path: DEFAULT_BASE_PATH.to_string(),
        }
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }
}

/// Which real-time transport carries media and control messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Multi-party room protocol with published tracks and a data channel.
    Room,
    /// Raw WebSocket carrying length-delimited binary frames.
    Socket,
}

/// Rendering quality requested from the avatar service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvatarQuality {
    Low,
    Medium,
    High,
}

/// Voice emotion presets supported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceEmotion {
    Excited,
    Serious,
    Friendly,
    Soothing,
    Broadcaster,
}

/// Speech-to-text provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SttProvider {
    Deepgram,
    Gladia,
}

/// Voice synthesis settings for the avatar.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,

    /// Speech rate multiplier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion: Option<VoiceEmotion>,
}

/// Speech-to-text settings for the user side of the conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SttSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<SttProvider>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

/// Parameters for negotiating a new streaming session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartAvatarRequest {
    /// Avatar to render.
    pub avatar_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<AvatarQuality>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<VoiceSettings>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge_base: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(default)]
    pub disable_idle_timeout: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stt_settings: Option<SttSettings>,

    /// Ask the service to prompt the user after sustained silence.
    #[serde(default)]
    pub use_silence_prompt: bool,

    /// Transport carrying voice chat; the socket pipe is the default.
    #[serde(default = "default_transport")]
    pub transport: TransportKind,
}

fn default_transport() -> TransportKind {
    TransportKind::Socket
}

impl StartAvatarRequest {
    pub fn new(avatar_name: impl Into<String>) -> Self {
        Self {
            avatar_name: avatar_name.into(),
            quality: None,
            voice: None,
            knowledge_id: None,
            knowledge_base: None,
            language: None,
            disable_idle_timeout: false,
            stt_settings: None,
            use_silence_prompt: false,
            transport: TransportKind::Socket,
        }
    }
}

/// How a speak task is queued on the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// Conversational response generated from the text.
    Talk,
    /// Verbatim repetition of the text.
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskMode {
    Sync,
    Async,
}

/// A request to route text to the avatar.
#[derive(Debug, Clone)]
pub struct SpeakRequest {
    pub text: String,
    /// Defaults to [`TaskType::Talk`] when unset.
    pub task_type: Option<TaskType>,
    /// Defaults to [`TaskMode::Async`] when unset.
    pub task_mode: Option<TaskMode>,
}

impl SpeakRequest {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            task_type: None,
            task_mode: None,
        }
    }
}

/// Options for starting voice chat on the active session.
#[derive(Debug, Clone)]
pub struct VoiceChatOptions {
    /// Specific input device to bind, or the resolved default when `None`.
    pub device_id: Option<String>,

    /// Initial mute state. Capture starts muted unless the caller opts out.
    pub muted: bool,
}

impl Default for VoiceChatOptions {
    fn default() -> Self {
        Self {
            device_id: None,
            muted: true,
        }
    }
}
