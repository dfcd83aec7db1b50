//! Surface controllers
//!
//! Headless state for every widget the site shows. A [`SurfaceHost`] opens,
//! looks up and closes surfaces on behalf of the shell.

pub mod chat;
pub mod image;
pub mod lead;
pub mod playground;
pub mod video;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::credential::CredentialProvider;
use crate::error::{FastPosError, Result};
use crate::lead::LeadSink;
use crate::media::MediaEncoder;
use crate::operation::{OperationPoller, PollConfig};
use crate::provider::GenAiProvider;

pub use chat::{ChatProfile, ChatSurface, ChatView};
pub use image::{ImageEditSurface, ImageEditView};
pub use lead::{LeadFormSurface, LeadOutcome, LeadStep};
pub use playground::{Playground, PlaygroundTab};
pub use video::{CredentialState, VideoSettings, VideoSurface, VideoView};

/// Clears a surface's busy marker when a request future is dropped mid-flight
///
/// Armed after the marker is set; the normal completion path calls
/// [`BusyGuard::disarm`] before taking the lock itself.
pub(crate) struct BusyGuard<'a, S, F: FnOnce(&mut S)> {
    state: &'a Mutex<S>,
    reset: Option<F>,
}

impl<'a, S, F: FnOnce(&mut S)> BusyGuard<'a, S, F> {
    pub(crate) fn new(state: &'a Mutex<S>, reset: F) -> Self {
        Self {
            state,
            reset: Some(reset),
        }
    }

    pub(crate) fn disarm(mut self) {
        self.reset = None;
    }
}

impl<S, F: FnOnce(&mut S)> Drop for BusyGuard<'_, S, F> {
    fn drop(&mut self) {
        if let Some(reset) = self.reset.take() {
            tracing::debug!("Request dropped before completion, clearing busy state");
            reset(&mut self.state.lock().unwrap_or_else(PoisonError::into_inner));
        }
    }
}

/// Unique identifier for an open surface
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceId(Uuid);

impl SurfaceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| FastPosError::NotFound(format!("surface {s}")))
    }
}

impl Default for SurfaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    Chatbot,
    Playground,
}

/// An open surface
#[derive(Clone)]
pub enum Surface {
    Chatbot(Arc<ChatSurface>),
    Playground(Arc<Playground>),
}

impl Surface {
    pub fn kind(&self) -> SurfaceKind {
        match self {
            Surface::Chatbot(_) => SurfaceKind::Chatbot,
            Surface::Playground(_) => SurfaceKind::Playground,
        }
    }

    /// The chat widget of either surface kind
    pub fn chat(&self) -> &ChatSurface {
        match self {
            Surface::Chatbot(chat) => chat,
            Surface::Playground(pg) => pg.chat(),
        }
    }

    pub fn playground(&self) -> Result<&Playground> {
        match self {
            Surface::Playground(pg) => Ok(pg),
            Surface::Chatbot(_) => Err(FastPosError::Rejected(
                "Tính năng này chỉ có trong AI Playground.".into(),
            )),
        }
    }

    /// Whether any request on this surface is still running
    pub fn is_busy(&self) -> bool {
        match self {
            Surface::Chatbot(chat) => chat.is_loading(),
            Surface::Playground(pg) => {
                pg.chat().is_loading() || pg.image().view().loading || pg.video().view().loading
            }
        }
    }

    pub fn close(&self) {
        match self {
            Surface::Chatbot(chat) => chat.close(),
            Surface::Playground(pg) => pg.close(),
        }
    }
}

struct Entry {
    surface: Surface,
    last_seen: Instant,
}

/// Shared collaborators plus the registry of open surfaces
pub struct SurfaceHost {
    provider: Arc<dyn GenAiProvider>,
    credentials: Arc<dyn CredentialProvider>,
    sink: Arc<dyn LeadSink>,
    encoder: MediaEncoder,
    poll: PollConfig,
    video: VideoSettings,
    surfaces: RwLock<HashMap<SurfaceId, Entry>>,
}

impl SurfaceHost {
    pub fn new(
        provider: Arc<dyn GenAiProvider>,
        credentials: Arc<dyn CredentialProvider>,
        sink: Arc<dyn LeadSink>,
        encoder: MediaEncoder,
    ) -> Self {
        Self {
            provider,
            credentials,
            sink,
            encoder,
            poll: PollConfig::default(),
            video: VideoSettings::default(),
            surfaces: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_video_settings(mut self, video: VideoSettings) -> Self {
        self.video = video;
        self
    }

    pub fn encoder(&self) -> &MediaEncoder {
        &self.encoder
    }

    /// Open a fresh surface; nothing is carried over from earlier ones
    pub fn open(&self, kind: SurfaceKind) -> (SurfaceId, Surface) {
        let surface = match kind {
            SurfaceKind::Chatbot => Surface::Chatbot(Arc::new(ChatSurface::new(
                self.provider.clone(),
                ChatProfile::chatbot(),
            ))),
            SurfaceKind::Playground => Surface::Playground(Arc::new(Playground::new(
                ChatSurface::new(self.provider.clone(), ChatProfile::playground()),
                ImageEditSurface::new(self.provider.clone(), self.encoder.clone()),
                VideoSurface::new(
                    OperationPoller::new(self.provider.clone(), self.poll.clone()),
                    self.encoder.clone(),
                    self.credentials.clone(),
                    self.video.clone(),
                ),
            ))),
        };

        let id = SurfaceId::new();
        self.surfaces
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                Entry {
                    surface: surface.clone(),
                    last_seen: Instant::now(),
                },
            );
        tracing::info!(surface = %id, ?kind, "Surface opened");
        (id, surface)
    }

    /// Look up an open surface and mark it as used
    pub fn get(&self, id: &SurfaceId) -> Result<Surface> {
        let mut surfaces = self.surfaces.write().unwrap_or_else(PoisonError::into_inner);
        let entry = surfaces
            .get_mut(id)
            .ok_or_else(|| FastPosError::NotFound(format!("surface {id}")))?;
        entry.last_seen = Instant::now();
        Ok(entry.surface.clone())
    }

    /// Remove and close a surface; running tasks are cancelled
    pub fn close(&self, id: &SurfaceId) -> Result<()> {
        let surface = self
            .surfaces
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .map(|entry| entry.surface)
            .ok_or_else(|| FastPosError::NotFound(format!("surface {id}")))?;
        surface.close();
        tracing::info!(surface = %id, kind = ?surface.kind(), "Surface closed");
        Ok(())
    }

    /// Close every surface unused for `max_idle`, unless a request is still
    /// running on it. Returns how many were closed.
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut expired = Vec::new();
        self.surfaces
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|id, entry| {
                let keep = now.duration_since(entry.last_seen) < max_idle || entry.surface.is_busy();
                if !keep {
                    expired.push((*id, entry.surface.clone()));
                }
                keep
            });

        for (id, surface) in &expired {
            surface.close();
            tracing::info!(surface = %id, kind = ?surface.kind(), "Idle surface closed");
        }
        expired.len()
    }

    pub fn open_count(&self) -> usize {
        self.surfaces.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// One-shot lead form for a call-to-action labelled `source`
    pub fn lead_form(&self, source: impl Into<String>) -> LeadFormSurface {
        LeadFormSurface::new(self.provider.clone(), self.sink.clone(), source)
    }
}
