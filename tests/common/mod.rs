// Shared fakes for integration tests: an in-process mock of the remote
// REST+WebSocket API, a fake room transport, and fake media devices.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::{broadcast, mpsc};

use avatarlink::error::{MediaError, TransportError};
use avatarlink::media::{
    CaptureConstraints, CaptureHandle, CaptureTrack, DeviceInfo, MediaDevices, RawCapture,
};
use avatarlink::transport::{
    NetworkScores, RoomConnection, RoomEvent, RoomProvider,
};

// ---------------------------------------------------------------------------
// Mock remote API
// ---------------------------------------------------------------------------

pub struct MockServer {
    counters: Mutex<HashMap<String, usize>>,
    bodies: Mutex<Vec<(String, Value)>>,
    frames: Mutex<Vec<Vec<u8>>>,
    fail_endpoints: Mutex<HashSet<String>>,
    pub ws_connections: AtomicUsize,
}

impl MockServer {
    fn new() -> Self {
        Self {
            counters: Mutex::new(HashMap::new()),
            bodies: Mutex::new(Vec::new()),
            frames: Mutex::new(Vec::new()),
            fail_endpoints: Mutex::new(HashSet::new()),
            ws_connections: AtomicUsize::new(0),
        }
    }

    pub fn count(&self, endpoint: &str) -> usize {
        *self.counters.lock().unwrap().get(endpoint).unwrap_or(&0)
    }

    pub fn bodies_for(&self, endpoint: &str) -> Vec<Value> {
        self.bodies
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, _)| e == endpoint)
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().unwrap().clone()
    }

    pub fn fail_endpoint(&self, endpoint: &str) {
        self.fail_endpoints
            .lock()
            .unwrap()
            .insert(endpoint.to_string());
    }
}

async fn rest_handler(
    Path(endpoint): Path<String>,
    State(server): State<Arc<MockServer>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    *server
        .counters
        .lock()
        .unwrap()
        .entry(endpoint.clone())
        .or_insert(0) += 1;
    server.bodies.lock().unwrap().push((endpoint.clone(), body));

    if server.fail_endpoints.lock().unwrap().contains(&endpoint) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "injected failure" })),
        );
    }

    let data = match endpoint.as_str() {
        "streaming.new" => json!({
            "session_id": "sess-1",
            "access_token": "room-token",
            "url": "wss://room.example/rtc",
            "is_paid": true,
            "session_duration_limit": 600,
        }),
        _ => json!({}),
    };
    (StatusCode::OK, Json(json!({ "data": data })))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(server): State<Arc<MockServer>>,
) -> impl IntoResponse {
    server.ws_connections.fetch_add(1, Ordering::SeqCst);
    ws.on_upgrade(move |socket| collect_ws(socket, server))
}

async fn collect_ws(mut socket: WebSocket, server: Arc<MockServer>) {
    while let Some(Ok(message)) = socket.recv().await {
        if let WsMessage::Binary(data) = message {
            server.frames.lock().unwrap().push(data.to_vec());
        }
    }
}

/// Log test output when RUST_LOG asks for it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Serve the mock API on an ephemeral port; returns the http base url.
pub async fn spawn_mock_server() -> (String, Arc<MockServer>) {
    let server = Arc::new(MockServer::new());
    let app = Router::new()
        .route("/v1/ws/streaming.chat", get(ws_handler))
        .route("/v1/:endpoint", post(rest_handler))
        .with_state(Arc::clone(&server));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), server)
}

// ---------------------------------------------------------------------------
// Fake room transport
// ---------------------------------------------------------------------------

pub struct FakeRoom {
    events: broadcast::Sender<RoomEvent>,
    stats: broadcast::Sender<NetworkScores>,
    pub connected: AtomicBool,
    pub connect_args: Mutex<Option<(String, String)>>,
    pub published_data: Mutex<Vec<Vec<u8>>>,
    pub published_tracks: AtomicUsize,
    pub unpublish_calls: AtomicUsize,
    pub fail_connect: AtomicBool,
}

impl FakeRoom {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        let (stats, _) = broadcast::channel(64);
        Self {
            events,
            stats,
            connected: AtomicBool::new(false),
            connect_args: Mutex::new(None),
            published_data: Mutex::new(Vec::new()),
            published_tracks: AtomicUsize::new(0),
            unpublish_calls: AtomicUsize::new(0),
            fail_connect: AtomicBool::new(false),
        }
    }

    pub fn emit(&self, event: RoomEvent) {
        let _ = self.events.send(event);
    }

    pub fn emit_stats(&self, scores: NetworkScores) {
        let _ = self.stats.send(scores);
    }
}

#[async_trait]
impl RoomConnection for FakeRoom {
    async fn connect(&self, url: &str, token: &str) -> Result<(), TransportError> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(TransportError::Room("injected connect failure".into()));
        }
        *self.connect_args.lock().unwrap() = Some((url.to_string(), token.to_string()));
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn publish_data(&self, data: &[u8]) -> Result<(), TransportError> {
        self.published_data.lock().unwrap().push(data.to_vec());
        Ok(())
    }

    async fn publish_track(
        &self,
        _track: Arc<dyn CaptureTrack>,
    ) -> Result<(), TransportError> {
        self.published_tracks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn unpublish_audio(&self) -> Result<(), TransportError> {
        self.unpublish_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.events.subscribe()
    }

    fn subscribe_stats(&self) -> broadcast::Receiver<NetworkScores> {
        self.stats.subscribe()
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

pub struct FakeRoomProvider {
    pub last: Mutex<Option<Arc<FakeRoom>>>,
    pub fail_connect: AtomicBool,
}

impl FakeRoomProvider {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(None),
            fail_connect: AtomicBool::new(false),
        }
    }

    pub fn last_room(&self) -> Arc<FakeRoom> {
        self.last.lock().unwrap().clone().expect("no room created")
    }
}

#[async_trait]
impl RoomProvider for FakeRoomProvider {
    async fn create(&self) -> Result<Arc<dyn RoomConnection>, TransportError> {
        let room = Arc::new(FakeRoom::new());
        if self.fail_connect.load(Ordering::SeqCst) {
            room.fail_connect.store(true, Ordering::SeqCst);
        }
        *self.last.lock().unwrap() = Some(Arc::clone(&room));
        Ok(room)
    }
}

// ---------------------------------------------------------------------------
// Fake media devices
// ---------------------------------------------------------------------------

pub struct FakeCaptureTrack {
    pub enabled: AtomicBool,
    pub device: Mutex<String>,
    pub stopped: AtomicBool,
    live: Arc<AtomicUsize>,
}

#[async_trait]
impl CaptureTrack for FakeCaptureTrack {
    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn device_id(&self) -> Option<String> {
        Some(self.device.lock().unwrap().clone())
    }

    async fn set_device(&self, device_id: &str) -> Result<(), MediaError> {
        *self.device.lock().unwrap() = device_id.to_string();
        Ok(())
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

pub struct FakeCaptureHandle {
    device: Option<String>,
    stopped: AtomicBool,
    live: Arc<AtomicUsize>,
}

impl CaptureHandle for FakeCaptureHandle {
    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn device_id(&self) -> Option<String> {
        self.device.clone()
    }
}

pub struct FakeMediaDevices {
    devices: Mutex<Vec<DeviceInfo>>,
    changes: broadcast::Sender<()>,
    pub live_captures: Arc<AtomicUsize>,
    pub opens: AtomicUsize,
    pub opened_device_ids: Mutex<Vec<Option<String>>>,
    pub fail_next_open: AtomicBool,
    raw_sender: Mutex<Option<mpsc::Sender<Vec<f32>>>>,
    pub last_track: Mutex<Option<Arc<FakeCaptureTrack>>>,
}

impl FakeMediaDevices {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            devices: Mutex::new(Vec::new()),
            changes,
            live_captures: Arc::new(AtomicUsize::new(0)),
            opens: AtomicUsize::new(0),
            opened_device_ids: Mutex::new(Vec::new()),
            fail_next_open: AtomicBool::new(false),
            raw_sender: Mutex::new(None),
            last_track: Mutex::new(None),
        }
    }

    pub fn with_devices(devices: Vec<DeviceInfo>) -> Self {
        let fake = Self::new();
        *fake.devices.lock().unwrap() = devices;
        fake
    }

    pub fn set_devices(&self, devices: Vec<DeviceInfo>) {
        *self.devices.lock().unwrap() = devices;
    }

    pub fn notify_devices_changed(&self) {
        let _ = self.changes.send(());
    }

    pub fn live(&self) -> usize {
        self.live_captures.load(Ordering::SeqCst)
    }

    /// Sender feeding the most recently opened raw capture.
    pub fn raw_sender(&self) -> mpsc::Sender<Vec<f32>> {
        self.raw_sender
            .lock()
            .unwrap()
            .clone()
            .expect("no raw capture open")
    }

    pub fn last_track(&self) -> Arc<FakeCaptureTrack> {
        self.last_track
            .lock()
            .unwrap()
            .clone()
            .expect("no track open")
    }

    fn check_fail(&self) -> Result<(), MediaError> {
        if self.fail_next_open.swap(false, Ordering::SeqCst) {
            return Err(MediaError::CaptureUnavailable("injected failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MediaDevices for FakeMediaDevices {
    async fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, MediaError> {
        Ok(self.devices.lock().unwrap().clone())
    }

    async fn open_track(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Arc<dyn CaptureTrack>, MediaError> {
        self.check_fail()?;
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.opened_device_ids
            .lock()
            .unwrap()
            .push(constraints.device_id.clone());
        self.live_captures.fetch_add(1, Ordering::SeqCst);

        let track = Arc::new(FakeCaptureTrack {
            enabled: AtomicBool::new(false),
            device: Mutex::new(
                constraints
                    .device_id
                    .clone()
                    .unwrap_or_else(|| "fake-default".to_string()),
            ),
            stopped: AtomicBool::new(false),
            live: Arc::clone(&self.live_captures),
        });
        *self.last_track.lock().unwrap() = Some(Arc::clone(&track));
        Ok(track)
    }

    async fn open_raw_capture(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<RawCapture, MediaError> {
        self.check_fail()?;
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.opened_device_ids
            .lock()
            .unwrap()
            .push(constraints.device_id.clone());
        self.live_captures.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(64);
        *self.raw_sender.lock().unwrap() = Some(tx);

        Ok(RawCapture {
            frames: rx,
            handle: Box::new(FakeCaptureHandle {
                device: constraints.device_id.clone(),
                stopped: AtomicBool::new(false),
                live: Arc::clone(&self.live_captures),
            }),
        })
    }

    fn subscribe_device_changes(&self) -> broadcast::Receiver<()> {
        self.changes.subscribe()
    }
}

/// Frame sink that records every frame it is handed.
pub struct CollectingSink {
    pub frames: Mutex<Vec<Vec<u8>>>,
    pub closed: AtomicBool,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self {
            frames: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().unwrap().clone()
    }
}

#[async_trait]
impl avatarlink::transport::FrameSink for CollectingSink {
    async fn send_frame(&self, frame: Vec<u8>) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::ChannelClosed);
        }
        self.frames.lock().unwrap().push(frame);
        Ok(())
    }
}
