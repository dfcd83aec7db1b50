//! Generative AI Provider Strategy
//!
//! A common interface over the hosted AI service so surfaces never depend on a
//! concrete backend. The runtime crate implements it for Gemini; tests plug in
//! scripted doubles.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fastpos_core::provider::{ChatSpec, GenAiProvider};
//!
//! let mut session = provider.start_chat(&ChatSpec::new("gemini-2.5-flash")).await?;
//! let reply = session.send("Văn phòng ở đâu?").await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::media::{EncodedMedia, MediaBlob};
use crate::session::SessionId;

/// Capability declared to the service when a chat session is created
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCapability {
    /// Ground answers on map/location data
    MapGrounding,
    /// Ground answers on web search
    SearchGrounding,
}

/// Everything needed to open a chat session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatSpec {
    /// Model identifier (e.g., "gemini-2.5-flash")
    pub model: String,

    /// System instruction sent with every turn
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Declared tool capabilities
    #[serde(default)]
    pub tools: Vec<ToolCapability>,
}

impl ChatSpec {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: None,
            tools: Vec::new(),
        }
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn tool(mut self, tool: ToolCapability) -> Self {
        self.tools.push(tool);
        self
    }
}

/// Reply to a single chat turn
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    /// Reply text (may be empty when the service only returned metadata)
    pub text: String,

    /// Grounding/citation URIs in the order the service listed them
    #[serde(default)]
    pub links: Vec<String>,
}

/// A live conversation context held by the service
///
/// Each handle is owned by exactly one surface. Dropping it releases it.
#[async_trait]
pub trait ChatSession: Send {
    /// Marker distinguishing this session from any other created before it
    fn id(&self) -> &SessionId;

    /// Send one user turn and wait for the reply
    async fn send(&mut self, text: &str) -> Result<Reply>;
}

/// One piece of a content-generation request or response
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ContentPart {
    Text { text: String },
    InlineMedia { media: EncodedMedia },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn media(media: EncodedMedia) -> Self {
        ContentPart::InlineMedia { media }
    }
}

/// One-shot content generation request
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContentRequest {
    pub model: String,
    pub parts: Vec<ContentPart>,
}

impl ContentRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            parts: Vec::new(),
        }
    }

    pub fn part(mut self, part: ContentPart) -> Self {
        self.parts.push(part);
        self
    }
}

/// Response to a one-shot content generation request
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentResponse {
    pub parts: Vec<ContentPart>,
}

impl ContentResponse {
    /// Concatenated text of all text parts
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::InlineMedia { .. } => None,
            })
            .collect()
    }

    /// First inline media part, if any
    pub fn first_media(&self) -> Option<&EncodedMedia> {
        self.parts.iter().find_map(|p| match p {
            ContentPart::InlineMedia { media } => Some(media),
            ContentPart::Text { .. } => None,
        })
    }
}

/// Video synthesis request seeded from an image
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VideoRequest {
    pub model: String,
    pub image: EncodedMedia,
    #[serde(default)]
    pub prompt: Option<String>,
    pub number_of_videos: u32,
    pub resolution: String,
    pub aspect_ratio: String,
}

/// Opaque reference to a long-running operation
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationHandle(String);

impl OperationHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Location of a generated media file held by the service
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaReference {
    pub uri: String,
}

/// Snapshot of a long-running operation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub handle: OperationHandle,
    pub done: bool,

    /// Present once done and successful
    #[serde(default)]
    pub result: Option<MediaReference>,

    /// Service-reported failure message, if any
    #[serde(default)]
    pub error: Option<String>,
}

impl Operation {
    pub fn pending(handle: OperationHandle) -> Self {
        Self {
            handle,
            done: false,
            result: None,
            error: None,
        }
    }
}

/// Provider metadata
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Provider name (e.g., "Gemini")
    pub name: String,

    /// Default chat model
    pub chat_model: String,

    /// Whether video generation is available
    pub supports_video: bool,
}

/// Strategy trait for hosted generative-AI services
///
/// Surfaces work exclusively through this interface.
#[async_trait]
pub trait GenAiProvider: Send + Sync {
    /// Get provider information and capabilities
    async fn info(&self) -> Result<ProviderInfo>;

    /// Check if the provider is reachable and configured correctly
    async fn health_check(&self) -> Result<bool>;

    /// Create a new conversational session
    async fn start_chat(&self, spec: &ChatSpec) -> Result<Box<dyn ChatSession>>;

    /// One-shot generation over text and inline media parts
    async fn generate_content(&self, request: &ContentRequest) -> Result<ContentResponse>;

    /// Submit a video synthesis request for background processing
    async fn submit_video(&self, request: &VideoRequest) -> Result<Operation>;

    /// Re-check the status of a submitted operation
    async fn poll_operation(&self, handle: &OperationHandle) -> Result<Operation>;

    /// Download a generated media file using the current credential
    async fn fetch_media(&self, reference: &MediaReference) -> Result<MediaBlob>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_spec_builder() {
        let spec = ChatSpec::new("gemini-2.5-flash")
            .system_prompt("Bạn là trợ lý AI")
            .tool(ToolCapability::MapGrounding);
        assert_eq!(spec.tools, vec![ToolCapability::MapGrounding]);
        assert!(spec.system_prompt.is_some());
    }

    #[test]
    fn test_content_response_accessors() {
        let media = EncodedMedia::new("image/png", "iVBORw0KGgo=");
        let response = ContentResponse {
            parts: vec![
                ContentPart::text("Here "),
                ContentPart::media(media.clone()),
                ContentPart::text("you go"),
            ],
        };
        assert_eq!(response.text(), "Here you go");
        assert_eq!(response.first_media(), Some(&media));
    }
}
