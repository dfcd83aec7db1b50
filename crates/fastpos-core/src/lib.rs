//! # fastpos-core
//!
//! AI interaction layer behind the FastPOS landing site: chat sessions, media
//! encoding, long-running operation polling and the headless surface
//! controllers the web shell drives.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        SurfaceHost                           │
//! │  ┌────────────┐  ┌──────────────────────────────────────┐    │
//! │  │  Chatbot   │  │ Playground (chat │ image │ video)    │    │
//! │  └─────┬──────┘  └────┬─────────────┬──────────┬────────┘    │
//! │        │ SessionSlot  │ MediaEncoder│ Operation│Poller       │
//! │  ┌─────┴──────────────┴─────────────┴──────────┴────────┐    │
//! │  │              GenAiProvider (Strategy)                 │    │
//! │  └───────────────────────────────────────────────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! `GenAiProvider`, `CredentialProvider` and `LeadSink` are the seams; the
//! Gemini REST implementation lives in `fastpos-runtime`.

pub mod credential;
pub mod error;
pub mod lead;
pub mod media;
pub mod message;
pub mod operation;
pub mod provider;
pub mod session;
pub mod surface;

#[cfg(test)]
mod testing;

pub use credential::{ApiKey, CredentialProvider, KeyRing};
pub use error::{FastPosError, Result};
pub use lead::{LeadAck, LeadForm, LeadRecord, LeadSink, MemoryLeadSink, TracingLeadSink};
pub use media::{EncodedMedia, MediaBlob, MediaEncoder, MediaId, MediaStore, UploadAsset, UploadFile, UploadPolicy};
pub use message::{Conversation, Speaker, Turn};
pub use operation::{cancellation, CancelHandle, CancelToken, OperationPoller, PollConfig};
pub use provider::{
    ChatSession, ChatSpec, ContentPart, ContentRequest, ContentResponse, GenAiProvider,
    MediaReference, Operation, OperationHandle, ProviderInfo, Reply, ToolCapability, VideoRequest,
};
pub use session::{SessionId, SessionSlot};
pub use surface::{Surface, SurfaceHost, SurfaceId, SurfaceKind};
