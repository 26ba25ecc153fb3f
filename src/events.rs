//! Typed event bus for the streaming session.
//!
//! Subscribers register per event name and are dispatched synchronously in
//! subscription order. There is no replay: a late subscriber only sees events
//! emitted after it registered.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::quality::ConnectionQuality;
use crate::transport::MediaStream;

/// Named events emitted by a streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamingEventKind {
    AvatarStartTalking,
    AvatarStopTalking,
    AvatarTalkingMessage,
    AvatarEndMessage,
    UserTalkingMessage,
    UserEndMessage,
    UserStart,
    UserStop,
    UserSilence,
    StreamReady,
    StreamDisconnected,
    ConnectionQualityChanged,
}

impl StreamingEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AvatarStartTalking => "avatar_start_talking",
            Self::AvatarStopTalking => "avatar_stop_talking",
            Self::AvatarTalkingMessage => "avatar_talking_message",
            Self::AvatarEndMessage => "avatar_end_message",
            Self::UserTalkingMessage => "user_talking_message",
            Self::UserEndMessage => "user_end_message",
            Self::UserStart => "user_start",
            Self::UserStop => "user_stop",
            Self::UserSilence => "user_silence",
            Self::StreamReady => "stream_ready",
            Self::StreamDisconnected => "stream_disconnected",
            Self::ConnectionQualityChanged => "connection_quality_changed",
        }
    }
}

impl FromStr for StreamingEventKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "avatar_start_talking" => Ok(Self::AvatarStartTalking),
            "avatar_stop_talking" => Ok(Self::AvatarStopTalking),
            "avatar_talking_message" => Ok(Self::AvatarTalkingMessage),
            "avatar_end_message" => Ok(Self::AvatarEndMessage),
            "user_talking_message" => Ok(Self::UserTalkingMessage),
            "user_end_message" => Ok(Self::UserEndMessage),
            "user_start" => Ok(Self::UserStart),
            "user_stop" => Ok(Self::UserStop),
            "user_silence" => Ok(Self::UserSilence),
            "stream_ready" => Ok(Self::StreamReady),
            "stream_disconnected" => Ok(Self::StreamDisconnected),
            "connection_quality_changed" => Ok(Self::ConnectionQualityChanged),
            _ => Err(()),
        }
    }
}

/// Event payloads delivered to subscribers.
#[derive(Debug, Clone)]
pub enum StreamingEvent {
    /// Combined audio+video output is ready. Fired once per session.
    StreamReady(MediaStream),
    /// The transport disconnected; carries the remote reason.
    StreamDisconnected(String),
    ConnectionQualityChanged(ConnectionQuality),
    /// Talking/message events re-emitted verbatim from the transport payload.
    Message {
        kind: StreamingEventKind,
        payload: serde_json::Value,
    },
}

impl StreamingEvent {
    pub fn kind(&self) -> StreamingEventKind {
        match self {
            Self::StreamReady(_) => StreamingEventKind::StreamReady,
            Self::StreamDisconnected(_) => StreamingEventKind::StreamDisconnected,
            Self::ConnectionQualityChanged(_) => StreamingEventKind::ConnectionQualityChanged,
            Self::Message { kind, .. } => *kind,
        }
    }
}

/// Identifies one subscription for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerId(u64);

pub type EventHandler = Arc<dyn Fn(&StreamingEvent) + Send + Sync>;

/// Plain observer list keyed by event kind.
#[derive(Default)]
pub struct EventEmitter {
    listeners: Mutex<HashMap<StreamingEventKind, Vec<(HandlerId, EventHandler)>>>,
    next_id: AtomicU64,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind.
    pub fn on<F>(&self, kind: StreamingEventKind, handler: F) -> HandlerId
    where
        F: Fn(&StreamingEvent) + Send + Sync + 'static,
    {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut listeners = self.listeners.lock().unwrap();
        listeners
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Remove a previously registered handler. Unknown ids are ignored.
    pub fn off(&self, kind: StreamingEventKind, id: HandlerId) {
        let mut listeners = self.listeners.lock().unwrap();
        if let Some(handlers) = listeners.get_mut(&kind) {
            handlers.retain(|(handler_id, _)| *handler_id != id);
        }
    }

    /// Dispatch an event to all subscribers of its kind, in subscription
    /// order. Handlers run on the caller's task.
    pub fn emit(&self, event: &StreamingEvent) {
        let handlers: Vec<EventHandler> = {
            let listeners = self.listeners.lock().unwrap();
            listeners
                .get(&event.kind())
                .map(|handlers| handlers.iter().map(|(_, h)| h.clone()).collect())
                .unwrap_or_default()
        };
        for handler in handlers {
            handler(event);
        }
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter").finish_non_exhaustive()
    }
}
