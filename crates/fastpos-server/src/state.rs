//! Application State

use std::sync::Arc;

use fastpos_core::{GenAiProvider, KeyRing, MediaStore, SurfaceHost};

use crate::config::ServerConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Hosted AI provider (Gemini)
    pub provider: Arc<dyn GenAiProvider>,

    /// API key shared by the provider and the video credential check
    pub keys: Arc<KeyRing>,

    /// Registry of open chatbot/playground surfaces
    pub host: Arc<SurfaceHost>,

    /// Previews and generated media served under `/media/{id}`
    pub media: Arc<MediaStore>,

    pub config: Arc<ServerConfig>,
}
