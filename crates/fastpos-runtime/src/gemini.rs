//! Gemini Provider
//!
//! Implementation of `GenAiProvider` over the Gemini REST API: chat sessions,
//! inline-media content generation and Veo video operations.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fastpos_core::{
    credential::{ApiKey, KeyRing},
    error::{FastPosError, Result},
    media::{EncodedMedia, MediaBlob},
    provider::{
        ChatSession, ChatSpec, ContentPart, ContentRequest, ContentResponse, GenAiProvider,
        MediaReference, Operation, OperationHandle, ProviderInfo, Reply, ToolCapability,
        VideoRequest,
    },
    session::SessionId,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

use crate::wire::{
    Content, Empty, ErrorEnvelope, GenerateContentRequest, GenerateContentResponse, ImageInput,
    OperationResponse, Part, PredictRequest, Tool, VideoInstance, VideoParameters,
};

/// Environment variables checked for the API key, in order
pub const API_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Marker the service puts in errors for unknown or revoked keys
const ENTITY_NOT_FOUND: &str = "Requested entity was not found";

/// Gemini provider configuration
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    /// API root, without trailing slash
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Model reported by `info()`
    pub chat_model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: 120,
            chat_model: "gemini-2.5-flash".into(),
        }
    }
}

impl GeminiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let base_url = std::env::var("GEMINI_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);
        let timeout_secs = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(defaults.timeout_secs);

        Self {
            base_url,
            timeout_secs,
            ..defaults
        }
    }
}

/// HTTP plumbing shared by the provider and its sessions
struct GeminiHttp {
    client: Client,
    base_url: String,
    keys: Arc<KeyRing>,
}

impl GeminiHttp {
    fn key(&self) -> Result<ApiKey> {
        self.keys
            .current()
            .ok_or_else(|| FastPosError::Auth("no API key configured".into()))
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let key = self.key()?;
        let request = self.client.post(url).query(&[("key", key.expose())]).json(body);
        read_json(send(request).await?).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let key = self.key()?;
        let request = self.client.get(url).query(&[("key", key.expose())]);
        read_json(send(request).await?).await
    }
}

async fn send(request: RequestBuilder) -> Result<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| FastPosError::Communication(format!("request failed: {e}")))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(classify_failure(status, &body))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| FastPosError::Parse(format!("unexpected response body: {e}")))
}

/// Map a non-2xx answer to the error taxonomy
fn classify_failure(status: StatusCode, body: &str) -> FastPosError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|e| e.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string());

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        || message.contains(ENTITY_NOT_FOUND)
    {
        tracing::warn!(%status, "Gemini rejected the credential");
        FastPosError::Auth(message)
    } else {
        FastPosError::Communication(format!("HTTP {status}: {message}"))
    }
}

fn tools_for(spec: &ChatSpec) -> Vec<Tool> {
    spec.tools
        .iter()
        .map(|tool| match tool {
            ToolCapability::MapGrounding => Tool {
                google_maps: Some(Empty {}),
                ..Default::default()
            },
            ToolCapability::SearchGrounding => Tool {
                google_search: Some(Empty {}),
                ..Default::default()
            },
        })
        .collect()
}

fn to_parts(parts: &[ContentPart]) -> Vec<Part> {
    parts
        .iter()
        .map(|part| match part {
            ContentPart::Text { text } => Part::text(text.clone()),
            ContentPart::InlineMedia { media } => {
                Part::inline(media.mime_type.clone(), media.data.clone())
            }
        })
        .collect()
}

fn from_parts(parts: &[Part]) -> Vec<ContentPart> {
    let mut out = Vec::new();
    for part in parts {
        if let Some(text) = &part.text {
            out.push(ContentPart::text(text.clone()));
        }
        if let Some(blob) = &part.inline_data {
            out.push(ContentPart::media(EncodedMedia::new(
                blob.mime_type.clone(),
                blob.data.clone(),
            )));
        }
    }
    out
}

fn to_operation(response: OperationResponse) -> Result<Operation> {
    let handle = OperationHandle::new(response.name.clone());

    if let Some(status) = &response.error {
        if status.message.contains(ENTITY_NOT_FOUND) || matches!(status.code, 401 | 403) {
            return Err(FastPosError::Auth(status.message.clone()));
        }
    }

    Ok(Operation {
        handle,
        done: response.done,
        result: response.video_uri().map(|uri| MediaReference { uri }),
        error: response.error.map(|s| s.message),
    })
}

/// Chat session that replays its own history on every turn
pub struct GeminiChatSession {
    id: SessionId,
    http: Arc<GeminiHttp>,
    spec: ChatSpec,
    history: Vec<Content>,
}

impl GeminiChatSession {
    fn request(&self, turn: Content) -> GenerateContentRequest {
        let mut contents = self.history.clone();
        contents.push(turn);
        GenerateContentRequest {
            contents,
            system_instruction: self.spec.system_prompt.as_deref().map(Content::system),
            tools: tools_for(&self.spec),
        }
    }
}

#[async_trait]
impl ChatSession for GeminiChatSession {
    fn id(&self) -> &SessionId {
        &self.id
    }

    async fn send(&mut self, text: &str) -> Result<Reply> {
        let turn = Content::user(vec![Part::text(text)]);
        let request = self.request(turn.clone());
        let url = self.http.model_url(&self.spec.model, "generateContent");

        let response: GenerateContentResponse = self.http.post_json(&url, &request).await?;

        let reply = Reply {
            text: response.text(),
            links: response.links(),
        };
        self.history.push(turn);
        self.history.push(
            response
                .first_content()
                .cloned()
                .unwrap_or_else(|| Content::model(vec![Part::text(reply.text.clone())])),
        );
        tracing::debug!(session = %self.id, turns = self.history.len(), links = reply.links.len(), "Gemini reply");
        Ok(reply)
    }
}

/// Gemini provider
pub struct GeminiProvider {
    http: Arc<GeminiHttp>,
    config: GeminiConfig,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig, keys: Arc<KeyRing>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FastPosError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            http: Arc::new(GeminiHttp {
                client,
                base_url: config.base_url.clone(),
                keys,
            }),
            config,
        })
    }

    /// Create from environment variables
    pub fn from_env(keys: Arc<KeyRing>) -> Result<Self> {
        Self::new(GeminiConfig::from_env(), keys)
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }
}

#[async_trait]
impl GenAiProvider for GeminiProvider {
    async fn info(&self) -> Result<ProviderInfo> {
        Ok(ProviderInfo {
            name: "Gemini".into(),
            chat_model: self.config.chat_model.clone(),
            supports_video: true,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        let Ok(key) = self.http.key() else {
            return Ok(false);
        };
        let url = format!("{}/models", self.http.base_url);
        match send(self.http.client.get(&url).query(&[("key", key.expose())])).await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Gemini health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn start_chat(&self, spec: &ChatSpec) -> Result<Box<dyn ChatSession>> {
        Ok(Box::new(GeminiChatSession {
            id: SessionId::new(),
            http: self.http.clone(),
            spec: spec.clone(),
            history: Vec::new(),
        }))
    }

    async fn generate_content(&self, request: &ContentRequest) -> Result<ContentResponse> {
        let body = GenerateContentRequest {
            contents: vec![Content::user(to_parts(&request.parts))],
            ..Default::default()
        };
        let url = self.http.model_url(&request.model, "generateContent");
        let response: GenerateContentResponse = self.http.post_json(&url, &body).await?;

        Ok(ContentResponse {
            parts: response
                .first_content()
                .map(|c| from_parts(&c.parts))
                .unwrap_or_default(),
        })
    }

    async fn submit_video(&self, request: &VideoRequest) -> Result<Operation> {
        let body = PredictRequest {
            instances: vec![VideoInstance {
                prompt: request.prompt.clone(),
                image: ImageInput {
                    bytes_base64_encoded: request.image.data.clone(),
                    mime_type: request.image.mime_type.clone(),
                },
            }],
            parameters: VideoParameters {
                aspect_ratio: request.aspect_ratio.clone(),
                resolution: request.resolution.clone(),
                sample_count: request.number_of_videos,
            },
        };
        let url = self.http.model_url(&request.model, "predictLongRunning");
        let response: OperationResponse = self.http.post_json(&url, &body).await?;
        to_operation(response)
    }

    async fn poll_operation(&self, handle: &OperationHandle) -> Result<Operation> {
        let url = format!("{}/{}", self.http.base_url, handle.as_str());
        let response: OperationResponse = self.http.get_json(&url).await?;
        to_operation(response)
    }

    async fn fetch_media(&self, reference: &MediaReference) -> Result<MediaBlob> {
        let key = self.http.key()?;
        let request = self
            .http
            .client
            .get(&reference.uri)
            .query(&[("key", key.expose())]);
        let response = send(request).await?;

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or("video/mp4")
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FastPosError::Communication(format!("media download failed: {e}")))?;

        tracing::info!(bytes = bytes.len(), %mime_type, "Generated media downloaded");
        Ok(MediaBlob::new(mime_type, bytes.to_vec()))
    }
}
