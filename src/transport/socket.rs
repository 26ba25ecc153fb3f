//! Raw WebSocket chat channel.
//!
//! Carries binary frames (see [`super::frames`]) upstream and JSON control
//! events (`event_type`-keyed) downstream. The connect call resolves only
//! after the WebSocket handshake completes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::error::TransportError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Downstream events parsed off the socket.
#[derive(Debug, Clone)]
pub enum SocketEvent {
    /// A JSON control message; `kind` is the message's `event_type` field.
    Event {
        kind: String,
        payload: serde_json::Value,
    },
    /// The remote side closed the connection.
    Closed,
}

pub type SocketEventHandler = Arc<dyn Fn(SocketEvent) + Send + Sync>;

/// Anything that accepts encoded binary frames. The socket voice chat writes
/// through this seam so tests can collect frames without a live socket.
#[async_trait]
pub trait FrameSink: Send + Sync {
    async fn send_frame(&self, frame: Vec<u8>) -> Result<(), TransportError>;
}

/// One connected chat socket.
pub struct ChatSocket {
    writer: Mutex<WsSink>,
    read_task: Mutex<Option<JoinHandle<()>>>,
    closed: Arc<AtomicBool>,
}

impl ChatSocket {
    /// Connect and await the WebSocket handshake. Incoming control events are
    /// delivered to `on_event` from a background read task.
    pub async fn connect(url: &str, on_event: SocketEventHandler) -> Result<Self, TransportError> {
        info!("Connecting chat socket to {}", url.split('?').next().unwrap_or(url));

        let (stream, _response) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url))
            .await
            .map_err(|_| TransportError::Timeout(CONNECT_TIMEOUT))??;

        let (writer, mut reader) = stream.split();
        let closed = Arc::new(AtomicBool::new(false));

        let read_closed = Arc::clone(&closed);
        let read_task = tokio::spawn(async move {
            while let Some(message) = reader.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        let parsed: serde_json::Value = match serde_json::from_str(text.as_str()) {
                            Ok(value) => value,
                            Err(e) => {
                                warn!("Failed to parse chat socket message: {}", e);
                                continue;
                            }
                        };
                        let Some(kind) = parsed
                            .get("event_type")
                            .and_then(|v| v.as_str())
                            .map(str::to_string)
                        else {
                            debug!("Chat socket message without event_type");
                            continue;
                        };
                        on_event(SocketEvent::Event {
                            kind,
                            payload: parsed,
                        });
                    }
                    Ok(Message::Close(_)) => {
                        info!("Chat socket closed by remote");
                        break;
                    }
                    Err(e) => {
                        warn!("Chat socket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
            read_closed.store(true, Ordering::SeqCst);
            on_event(SocketEvent::Closed);
        });

        Ok(Self {
            writer: Mutex::new(writer),
            read_task: Mutex::new(Some(read_task)),
            closed,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Send one encoded binary frame.
    pub async fn send_binary(&self, data: Vec<u8>) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::ChannelClosed);
        }
        let mut writer = self.writer.lock().await;
        writer
            .send(Message::Binary(data.into()))
            .await
            .map_err(map_ws_error)
    }

    /// Close the socket. Safe to call repeatedly; an already-closed channel is
    /// not an error.
    pub async fn close(&self) -> Result<(), TransportError> {
        let was_closed = self.closed.swap(true, Ordering::SeqCst);

        if !was_closed {
            let mut writer = self.writer.lock().await;
            match writer.send(Message::Close(None)).await {
                Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => {}
                Err(e) => {
                    warn!("Error closing chat socket: {}", e);
                    return Err(TransportError::WebSocket(e));
                }
            }
        }

        if let Some(task) = self.read_task.lock().await.take() {
            task.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl FrameSink for ChatSocket {
    async fn send_frame(&self, frame: Vec<u8>) -> Result<(), TransportError> {
        self.send_binary(frame).await
    }
}

fn map_ws_error(error: WsError) -> TransportError {
    match error {
        WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::ChannelClosed,
        other => TransportError::WebSocket(other),
    }
}

impl std::fmt::Debug for ChatSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSocket")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
