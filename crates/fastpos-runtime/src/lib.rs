//! # fastpos-runtime
//!
//! Hosted AI providers for the FastPOS AI layer.
//!
//! ## Providers
//!
//! - **Gemini** (default): Gemini REST API for chat, image editing and Veo video
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fastpos_runtime::gemini::{GeminiProvider, API_KEY_VARS};
//!
//! let keys = Arc::new(KeyRing::from_env(API_KEY_VARS));
//! let provider = GeminiProvider::from_env(keys)?;
//! let host = SurfaceHost::new(Arc::new(provider), credentials, sink, encoder);
//! ```

#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "gemini")]
mod wire;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiConfig, GeminiProvider, API_KEY_VARS};

// Re-export core types for convenience
pub use fastpos_core::{
    ChatSession, ChatSpec, FastPosError, GenAiProvider, KeyRing, Result, SurfaceHost,
};
