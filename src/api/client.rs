use serde_json::{json, Value};
use tracing::debug;

use super::types::StartSessionResponse;
use crate::config::{StartAvatarRequest, TaskMode, TaskType, TransportKind};
use crate::error::AvatarError;

/// Thin client over the negotiation endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_path: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_path: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_path: base_path.into(),
            token: token.into(),
        }
    }

    /// Negotiate a new session.
    pub async fn new_session(
        &self,
        request: &StartAvatarRequest,
    ) -> Result<StartSessionResponse, AvatarError> {
        let body = json!({
            "avatar_name": request.avatar_name,
            "quality": request.quality,
            "knowledge_base_id": request.knowledge_id,
            "knowledge_base": request.knowledge_base,
            "voice": request.voice,
            "language": request.language,
            "version": "v2",
            "video_encoding": "H264",
            "source": "sdk",
            "disable_idle_timeout": request.disable_idle_timeout,
            "stt_settings": request.stt_settings,
            "ia_is_room_transport": request.transport == TransportKind::Room,
            "silence_response": request.use_silence_prompt,
        });
        let data = self.post("/v1/streaming.new", body).await?;
        Ok(serde_json::from_value(data)?)
    }

    /// Begin streaming for a negotiated session.
    pub async fn start_session(&self, session_id: &str) -> Result<Value, AvatarError> {
        self.post("/v1/streaming.start", json!({ "session_id": session_id }))
            .await
    }

    /// Queue a speak task server-side.
    pub async fn task(
        &self,
        session_id: &str,
        text: &str,
        task_type: Option<TaskType>,
        task_mode: Option<TaskMode>,
    ) -> Result<Value, AvatarError> {
        self.post(
            "/v1/streaming.task",
            json!({
                "session_id": session_id,
                "text": text,
                "task_type": task_type,
                "task_mode": task_mode,
            }),
        )
        .await
    }

    pub async fn start_listening(&self, session_id: &str) -> Result<Value, AvatarError> {
        self.post(
            "/v1/streaming.start_listening",
            json!({ "session_id": session_id }),
        )
        .await
    }

    pub async fn stop_listening(&self, session_id: &str) -> Result<Value, AvatarError> {
        self.post(
            "/v1/streaming.stop_listening",
            json!({ "session_id": session_id }),
        )
        .await
    }

    pub async fn interrupt(&self, session_id: &str) -> Result<Value, AvatarError> {
        self.post(
            "/v1/streaming.interrupt",
            json!({ "session_id": session_id }),
        )
        .await
    }

    /// Notify the service that the session has ended.
    pub async fn stop_session(&self, session_id: &str) -> Result<Value, AvatarError> {
        self.post("/v1/streaming.stop", json!({ "session_id": session_id }))
            .await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, AvatarError> {
        let url = format!("{}{}", self.base_path, path);
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AvatarError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: Value = response.json().await?;
        Ok(envelope.get("data").cloned().unwrap_or(Value::Null))
    }
}
