use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::api::{ApiClient, StartSessionResponse};
use crate::config::{
    ApiConfig, SpeakRequest, StartAvatarRequest, TaskMode, TaskType, TransportKind,
    VoiceChatOptions,
};
use crate::error::{AvatarError, TransportError};
use crate::events::{EventEmitter, HandlerId, StreamingEvent, StreamingEventKind};
use crate::media::MediaDevices;
use crate::quality::{ConnectionQuality, QualityIndicator, QualityMixer};
use crate::transport::frames::encode_text_frame;
use crate::transport::socket::SocketEventHandler;
use crate::transport::{
    ChatSocket, FrameSink, MediaStream, RemoteTrack, RoomConnection, RoomEvent, RoomProvider,
    SocketEvent, TrackKind,
};
use crate::voice::{RoomVoiceChat, SocketVoiceChat, VoiceChat};

/// Session lifecycle as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Inactive,
    Connecting,
    Connected,
}

/// Remote tracks collected until the combined output is ready.
#[derive(Default)]
struct MediaAssembly {
    audio: Vec<RemoteTrack>,
    video: Vec<RemoteTrack>,
    /// Set once both kinds are present; short-circuits re-emission.
    ready: Option<MediaStream>,
}

#[derive(Default)]
struct SessionState {
    phase: SessionPhase,
    session_id: Option<String>,
    transport: Option<TransportKind>,
    room: Option<Arc<dyn RoomConnection>>,
    socket: Option<Arc<ChatSocket>>,
    voice_chat: Option<VoiceChat>,
    media: Option<Arc<StdMutex<MediaAssembly>>>,
    pump: Option<JoinHandle<()>>,
}

struct SessionInner {
    token: String,
    base_path: String,
    api: ApiClient,
    emitter: Arc<EventEmitter>,
    rooms: Arc<dyn RoomProvider>,
    devices: Arc<dyn MediaDevices>,
    quality: QualityMixer,
    state: Mutex<SessionState>,
    /// Overrides the voice-chat stabilization wait when set.
    voice_settle: StdMutex<Option<Duration>>,
}

/// One end-to-end streaming session with the remote avatar service.
///
/// Constructed with an auth token; `create_start_avatar` negotiates a session,
/// opens the selected transport and begins surfacing events. Callers drive the
/// session through its methods and subscribe to events by name.
pub struct StreamingAvatar {
    inner: Arc<SessionInner>,
}

impl StreamingAvatar {
    pub fn new(
        config: ApiConfig,
        rooms: Arc<dyn RoomProvider>,
        devices: Arc<dyn MediaDevices>,
    ) -> Self {
        let emitter = Arc::new(EventEmitter::new());
        let quality_emitter = Arc::clone(&emitter);
        let quality = QualityMixer::new(Arc::new(move |quality| {
            quality_emitter.emit(&StreamingEvent::ConnectionQualityChanged(quality));
        }));

        Self {
            inner: Arc::new(SessionInner {
                api: ApiClient::new(config.base_path.clone(), config.token.clone()),
                token: config.token,
                base_path: config.base_path,
                emitter,
                rooms,
                devices,
                quality,
                state: Mutex::new(SessionState::default()),
                voice_settle: StdMutex::new(None),
            }),
        }
    }

    /// Override the stabilization wait applied after voice chat starts.
    pub fn set_voice_chat_settle(&self, settle: Duration) {
        *self.inner.voice_settle.lock().unwrap() = Some(settle);
    }

    /// Subscribe to an event by kind. Returns the id used to unsubscribe.
    pub fn on<F>(&self, kind: StreamingEventKind, handler: F) -> HandlerId
    where
        F: Fn(&StreamingEvent) + Send + Sync + 'static,
    {
        self.inner.emitter.on(kind, handler)
    }

    pub fn off(&self, kind: StreamingEventKind, id: HandlerId) {
        self.inner.emitter.off(kind, id)
    }

    pub fn connection_quality(&self) -> ConnectionQuality {
        self.inner.quality.quality()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.inner.state.lock().await.phase
    }

    /// The combined media output, once ready.
    pub async fn media_stream(&self) -> Option<MediaStream> {
        let state = self.inner.state.lock().await;
        let media = state.media.as_ref()?;
        let assembly = media.lock().unwrap();
        assembly.ready.clone()
    }

    /// Negotiate and start a session, open the transports, and wire events.
    ///
    /// Fails if a session is already active, if negotiation fails, or if the
    /// transport or chat socket fails to connect; failure leaves the session
    /// inactive with all partial state released.
    pub async fn create_start_avatar(
        &self,
        request: StartAvatarRequest,
    ) -> Result<StartSessionResponse, AvatarError> {
        let inner = &self.inner;
        let mut state = inner.state.lock().await;
        if state.phase != SessionPhase::Inactive {
            return Err(AvatarError::AlreadyActive);
        }
        state.phase = SessionPhase::Connecting;

        match SessionInner::connect(inner, &mut state, &request).await {
            Ok(response) => {
                info!("Session {} connecting", response.session_id);
                Ok(response)
            }
            Err(e) => {
                SessionInner::release_transports(&mut state, &inner.quality).await;
                if let Some(room) = state.room.take() {
                    room.disconnect().await;
                }
                state.media = None;
                state.transport = None;
                state.session_id = None;
                if let Some(pump) = state.pump.take() {
                    pump.abort();
                }
                state.phase = SessionPhase::Inactive;
                Err(e)
            }
        }
    }

    /// Route text to the avatar.
    ///
    /// The async talk combination rides the standing low-latency channel; any
    /// other type/mode needs server-side queuing and falls back to REST.
    pub async fn speak(&self, request: SpeakRequest) -> Result<Option<Value>, AvatarError> {
        let task_type = request.task_type.unwrap_or(TaskType::Talk);
        let task_mode = request.task_mode.unwrap_or(TaskMode::Async);

        let state = self.inner.state.lock().await;
        let session_id = state
            .session_id
            .clone()
            .ok_or(AvatarError::NoActiveSession)?;

        if task_type == TaskType::Talk && task_mode == TaskMode::Async {
            match state.transport {
                Some(TransportKind::Room) => {
                    if let Some(room) = &state.room {
                        let data = serde_json::to_vec(&request.text)?;
                        room.publish_data(&data).await?;
                        return Ok(None);
                    }
                }
                Some(TransportKind::Socket) => {
                    if let Some(socket) = &state.socket {
                        socket.send_binary(encode_text_frame(&request.text)).await?;
                        return Ok(None);
                    }
                }
                None => {}
            }
        }
        drop(state);

        let value = self
            .inner
            .api
            .task(
                &session_id,
                &request.text,
                request.task_type,
                request.task_mode,
            )
            .await?;
        Ok(Some(value))
    }

    pub async fn start_listening(&self) -> Result<Value, AvatarError> {
        let session_id = self.require_session().await?;
        self.inner.api.start_listening(&session_id).await
    }

    pub async fn stop_listening(&self) -> Result<Value, AvatarError> {
        let session_id = self.require_session().await?;
        self.inner.api.stop_listening(&session_id).await
    }

    pub async fn interrupt(&self) -> Result<Value, AvatarError> {
        let session_id = self.require_session().await?;
        self.inner.api.interrupt(&session_id).await
    }

    /// Start voice chat on the active session. No-op when no session holds a
    /// voice chat instance.
    pub async fn start_voice_chat(&self, options: VoiceChatOptions) -> Result<(), AvatarError> {
        let mut state = self.inner.state.lock().await;
        match state.voice_chat.as_mut() {
            Some(voice_chat) => voice_chat.start(options).await,
            None => {
                warn!("No active session, ignoring voice chat start");
                Ok(())
            }
        }
    }

    pub async fn close_voice_chat(&self) {
        let mut state = self.inner.state.lock().await;
        if let Some(voice_chat) = state.voice_chat.as_mut() {
            voice_chat.stop().await;
        }
    }

    /// No-op when voice chat is absent or inactive.
    pub async fn mute_input_audio(&self) {
        let mut state = self.inner.state.lock().await;
        if let Some(voice_chat) = state.voice_chat.as_mut() {
            voice_chat.mute();
        }
    }

    /// No-op when voice chat is absent or inactive.
    pub async fn unmute_input_audio(&self) {
        let mut state = self.inner.state.lock().await;
        if let Some(voice_chat) = state.voice_chat.as_mut() {
            voice_chat.unmute();
        }
    }

    pub async fn is_input_audio_muted(&self) -> bool {
        let state = self.inner.state.lock().await;
        state
            .voice_chat
            .as_ref()
            .map(|vc| vc.is_muted())
            .unwrap_or(true)
    }

    pub async fn voice_chat_device_id(&self) -> Option<String> {
        let state = self.inner.state.lock().await;
        match state.voice_chat.as_ref() {
            Some(voice_chat) => voice_chat.device_id().await,
            None => None,
        }
    }

    pub async fn set_voice_chat_device_id(&self, device_id: &str) -> Result<(), AvatarError> {
        let mut state = self.inner.state.lock().await;
        match state.voice_chat.as_mut() {
            Some(voice_chat) => voice_chat.set_device_id(device_id).await,
            None => Ok(()),
        }
    }

    /// Tear the session down and notify the remote service.
    ///
    /// Safe to call repeatedly and from the disconnect path: only the first
    /// call on an active session issues the REST stop, later calls no-op.
    pub async fn stop_avatar(&self) -> Result<(), AvatarError> {
        self.inner.stop_session().await
    }

    async fn require_session(&self) -> Result<String, AvatarError> {
        let state = self.inner.state.lock().await;
        state
            .session_id
            .clone()
            .ok_or(AvatarError::NoActiveSession)
    }
}

impl SessionInner {
    async fn connect(
        inner: &Arc<Self>,
        state: &mut SessionState,
        request: &StartAvatarRequest,
    ) -> Result<StartSessionResponse, AvatarError> {
        let response = inner.api.new_session(request).await?;
        state.session_id = Some(response.session_id.clone());
        state.transport = Some(request.transport);

        let room = inner.rooms.create().await?;
        state.room = Some(Arc::clone(&room));

        let assembly = Arc::new(StdMutex::new(MediaAssembly::default()));
        state.media = Some(Arc::clone(&assembly));
        state.pump = Some(tokio::spawn(Self::pump_room_events(
            Arc::clone(inner),
            room.subscribe(),
            assembly,
        )));

        inner.api.start_session(&response.session_id).await?;
        room.connect(&response.url, &response.access_token).await?;

        let socket = inner.connect_socket(&response.session_id, request).await?;
        state.socket = Some(Arc::clone(&socket));

        let settle = *inner.voice_settle.lock().unwrap();
        state.voice_chat = Some(match request.transport {
            TransportKind::Socket => {
                let sink: Arc<dyn FrameSink> = socket;
                let mut variant = SocketVoiceChat::new(sink, Arc::clone(&inner.devices));
                if let Some(settle) = settle {
                    variant = variant.with_settle(settle);
                }
                VoiceChat::new(Box::new(variant))
            }
            TransportKind::Room => {
                let mut variant =
                    RoomVoiceChat::new(Arc::clone(&room), Arc::clone(&inner.devices));
                if let Some(settle) = settle {
                    variant = variant.with_settle(settle);
                }
                VoiceChat::new(Box::new(variant))
            }
        });

        inner.quality.start(&room);

        Ok(response)
    }

    /// Open the chat socket at the endpoint derived from the base path. The
    /// socket carries user talking/silence control events for both transports.
    async fn connect_socket(
        &self,
        session_id: &str,
        request: &StartAvatarRequest,
    ) -> Result<Arc<ChatSocket>, AvatarError> {
        let base =
            Url::parse(&self.base_path).map_err(|e| AvatarError::InvalidBasePath(e.to_string()))?;
        let scheme = if base.scheme() == "http" { "ws" } else { "wss" };
        let host = base
            .host_str()
            .ok_or_else(|| AvatarError::InvalidBasePath("missing host".to_string()))?;
        let authority = match base.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        let mut url = format!(
            "{scheme}://{authority}/v1/ws/streaming.chat?session_id={session_id}&session_token={}",
            self.token
        );
        if request.transport == TransportKind::Room {
            url.push_str("&arch_version=v2");
        }
        url.push_str(&format!("&silence_response={}", request.use_silence_prompt));

        let emitter = Arc::clone(&self.emitter);
        let handler: SocketEventHandler = Arc::new(move |event| match event {
            SocketEvent::Event { kind, payload } => match kind.parse::<StreamingEventKind>() {
                Ok(kind) => emitter.emit(&StreamingEvent::Message { kind, payload }),
                Err(()) => debug!("Unknown chat socket event type: {}", kind),
            },
            SocketEvent::Closed => {}
        });

        Ok(Arc::new(ChatSocket::connect(&url, handler).await?))
    }

    async fn pump_room_events(
        inner: Arc<Self>,
        mut events: broadcast::Receiver<RoomEvent>,
        assembly: Arc<StdMutex<MediaAssembly>>,
    ) {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Room event pump lagged, skipped {} events", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match event {
                RoomEvent::DataReceived(data) => match serde_json::from_slice::<Value>(&data) {
                    Ok(message) => {
                        let Some(kind) = message.get("type").and_then(|v| v.as_str()) else {
                            debug!("Room message without a type field");
                            continue;
                        };
                        match kind.parse::<StreamingEventKind>() {
                            Ok(kind) => inner.emitter.emit(&StreamingEvent::Message {
                                kind,
                                payload: message.clone(),
                            }),
                            Err(()) => debug!("Unknown room event type: {}", kind),
                        }
                    }
                    Err(e) => error!("Failed to decode room message: {}", e),
                },
                RoomEvent::TrackSubscribed(track) => {
                    let ready = {
                        let mut assembly = assembly.lock().unwrap();
                        match track.kind {
                            TrackKind::Audio => assembly.audio.push(track),
                            TrackKind::Video => assembly.video.push(track),
                        }
                        // Ready when both kinds are present, exactly once.
                        if assembly.ready.is_none()
                            && !assembly.audio.is_empty()
                            && !assembly.video.is_empty()
                        {
                            let stream = MediaStream {
                                audio_tracks: assembly.audio.clone(),
                                video_tracks: assembly.video.clone(),
                            };
                            assembly.ready = Some(stream.clone());
                            Some(stream)
                        } else {
                            None
                        }
                    };
                    if let Some(stream) = ready {
                        {
                            let mut state = inner.state.lock().await;
                            if state.phase == SessionPhase::Connecting {
                                state.phase = SessionPhase::Connected;
                            }
                        }
                        info!("Media stream ready");
                        inner.emitter.emit(&StreamingEvent::StreamReady(stream));
                    }
                }
                RoomEvent::TrackUnsubscribed(track) => {
                    let mut assembly = assembly.lock().unwrap();
                    assembly.audio.retain(|t| t.sid != track.sid);
                    assembly.video.retain(|t| t.sid != track.sid);
                }
                RoomEvent::Disconnected { reason } => {
                    info!("Room disconnected: {}", reason);
                    inner
                        .emitter
                        .emit(&StreamingEvent::StreamDisconnected(reason));
                    if let Err(e) = inner.stop_session().await {
                        warn!("Error stopping session after disconnect: {}", e);
                    }
                }
                RoomEvent::QualityChanged(_) | RoomEvent::StateChanged(_) => {
                    // Consumed by the quality indicators on their own receivers.
                }
            }
        }
    }

    /// The single teardown path, shared by callers and the disconnect handler.
    async fn stop_session(&self) -> Result<(), AvatarError> {
        let mut state = self.state.lock().await;
        if state.phase == SessionPhase::Inactive {
            debug!("Stop requested with no active session");
            return Ok(());
        }
        state.phase = SessionPhase::Inactive;
        let session_id = state.session_id.take();

        let teardown_error = Self::release_transports(&mut state, &self.quality).await;

        let rest_result = match &session_id {
            Some(session_id) => {
                info!("Stopping session {}", session_id);
                self.api.stop_session(session_id).await.map(|_| ())
            }
            None => Ok(()),
        };

        if let Some(room) = state.room.take() {
            room.disconnect().await;
        }
        state.media = None;
        state.transport = None;
        if let Some(pump) = state.pump.take() {
            pump.abort();
        }

        rest_result?;
        match teardown_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Close voice chat, quality fusion and the socket; expected teardown
    /// races (an already-closed channel) are swallowed, everything else is
    /// logged and reported.
    async fn release_transports(
        state: &mut SessionState,
        quality: &QualityMixer,
    ) -> Option<AvatarError> {
        let mut teardown_error = None;

        if let Some(mut voice_chat) = state.voice_chat.take() {
            voice_chat.stop().await;
        }
        quality.stop(false);

        if let Some(socket) = state.socket.take() {
            match socket.close().await {
                Ok(()) => {}
                Err(TransportError::ChannelClosed) => {
                    debug!("Chat socket already closed");
                }
                Err(e) => {
                    error!("Error closing chat socket: {}", e);
                    teardown_error = Some(e.into());
                }
            }
        }

        teardown_error
    }
}
