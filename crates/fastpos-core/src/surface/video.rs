//! Video Generation Surface
//!
//! Playground tab that animates an uploaded image. Requires a paid credential,
//! allows a single generation in flight, and cancels polling when closed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::credential::CredentialProvider;
use crate::error::{FastPosError, Result};
use crate::media::{MediaEncoder, MediaId, UploadAsset, UploadFile};
use crate::operation::{cancellation, CancelHandle, OperationPoller};
use crate::provider::VideoRequest;

use super::BusyGuard;

/// Request parameters for video synthesis
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VideoSettings {
    pub model: String,
    pub resolution: String,
    pub aspect_ratio: String,
    pub number_of_videos: u32,
    #[serde(default)]
    pub prompt: Option<String>,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            model: "veo-3.1-fast-generate-preview".into(),
            resolution: "720p".into(),
            aspect_ratio: "16:9".into(),
            number_of_videos: 1,
            prompt: None,
        }
    }
}

/// Whether the surface may submit metered requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialState {
    Checking,
    Missing,
    Available,
}

#[derive(Clone, Debug, Serialize)]
pub struct VideoView {
    pub credential: CredentialState,
    pub preview_url: Option<String>,
    pub result_url: Option<String>,
    pub loading: bool,
}

struct VideoState {
    credential: CredentialState,
    asset: Option<UploadAsset>,
    result: Option<MediaId>,
    /// Present while a generation is in flight
    in_flight: Option<CancelHandle>,
    closed: bool,
}

pub struct VideoSurface {
    poller: OperationPoller,
    encoder: MediaEncoder,
    credentials: Arc<dyn CredentialProvider>,
    settings: VideoSettings,
    state: Mutex<VideoState>,
}

impl VideoSurface {
    pub fn new(
        poller: OperationPoller,
        encoder: MediaEncoder,
        credentials: Arc<dyn CredentialProvider>,
        settings: VideoSettings,
    ) -> Self {
        Self {
            poller,
            encoder,
            credentials,
            settings,
            state: Mutex::new(VideoState {
                credential: CredentialState::Checking,
                asset: None,
                result: None,
                in_flight: None,
                closed: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VideoState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn view(&self) -> VideoView {
        let state = self.lock();
        VideoView {
            credential: state.credential,
            preview_url: state.asset.as_ref().map(UploadAsset::preview_url),
            result_url: state.result.map(|id| id.url()),
            loading: state.in_flight.is_some(),
        }
    }

    pub fn credential_state(&self) -> CredentialState {
        self.lock().credential
    }

    /// Ask the credential capability whether a key is selected
    pub async fn check_credential(&self) -> CredentialState {
        let next = match self.credentials.has_credential().await {
            Ok(true) => CredentialState::Available,
            Ok(false) => CredentialState::Missing,
            Err(e) => {
                tracing::warn!(error = %e, "Credential check failed");
                CredentialState::Missing
            }
        };
        self.lock().credential = next;
        next
    }

    /// Prompt the host for a credential, then re-check
    pub async fn request_credential(&self) -> CredentialState {
        if let Err(e) = self.credentials.prompt_for_credential().await {
            tracing::warn!(error = %e, "Credential prompt failed");
        }
        self.check_credential().await
    }

    /// Replace the source image. The previous preview and video are released.
    pub async fn select(&self, file: UploadFile) -> Result<UploadAsset> {
        let asset = self.encoder.encode(file).await?;
        let store = self.encoder.store();

        let mut state = self.lock();
        if state.closed {
            asset.release(store);
            return Err(FastPosError::Cancelled);
        }
        if let Some(old) = state.asset.replace(asset.clone()) {
            old.release(store);
        }
        if let Some(result) = state.result.take() {
            store.release(&result);
        }
        Ok(asset)
    }

    /// Generate a video from the selected image and store it.
    ///
    /// Rejected with [`FastPosError::Busy`] while another generation runs.
    pub async fn generate(&self) -> Result<MediaId> {
        if self.credential_state() == CredentialState::Checking {
            self.check_credential().await;
        }

        let (request, mut token) = {
            let mut state = self.lock();
            if state.closed {
                return Err(FastPosError::Cancelled);
            }
            if state.credential != CredentialState::Available {
                return Err(FastPosError::CredentialRequired);
            }
            if state.in_flight.is_some() {
                return Err(FastPosError::Busy);
            }
            let image = state
                .asset
                .as_ref()
                .map(|a| a.encoded.clone())
                .ok_or_else(|| FastPosError::Rejected("Vui lòng tải ảnh gốc lên trước.".into()))?;

            let (handle, token) = cancellation();
            state.in_flight = Some(handle);

            let request = VideoRequest {
                model: self.settings.model.clone(),
                image,
                prompt: self.settings.prompt.clone(),
                number_of_videos: self.settings.number_of_videos,
                resolution: self.settings.resolution.clone(),
                aspect_ratio: self.settings.aspect_ratio.clone(),
            };
            (request, token)
        };

        // Dropping the request drops the poll loop with it
        let guard = BusyGuard::new(&self.state, |state: &mut VideoState| state.in_flight = None);
        let outcome = self.poller.run(&request, &mut token).await;
        guard.disarm();

        let mut state = self.lock();
        state.in_flight = None;

        match outcome {
            Ok(blob) => {
                if state.closed {
                    return Err(FastPosError::Cancelled);
                }
                let store = self.encoder.store();
                let id = store.insert(blob);
                if let Some(old) = state.result.replace(id) {
                    store.release(&old);
                }
                tracing::info!(result = %id, "Video generation completed");
                Ok(id)
            }
            Err(FastPosError::Auth(message)) => {
                tracing::warn!(%message, "Credential rejected during video generation");
                state.credential = CredentialState::Missing;
                Err(FastPosError::Auth(message))
            }
            Err(FastPosError::Cancelled) => Err(FastPosError::Cancelled),
            Err(e) => {
                tracing::error!(error = %e, "Video generation failed");
                Err(e)
            }
        }
    }

    /// Cancel any running generation and release media
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        if let Some(handle) = state.in_flight.take() {
            handle.cancel();
        }
        let store = self.encoder.store();
        if let Some(asset) = state.asset.take() {
            asset.release(store);
        }
        if let Some(result) = state.result.take() {
            store.release(&result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaStore, UploadPolicy};
    use crate::operation::PollConfig;
    use crate::testing::{png_upload, ScriptedProvider, StaticCredentials};

    fn surface(
        provider: &Arc<ScriptedProvider>,
        credentials: Arc<StaticCredentials>,
    ) -> (Arc<VideoSurface>, Arc<MediaStore>) {
        let store = Arc::new(MediaStore::new());
        let encoder = MediaEncoder::new(UploadPolicy::default(), store.clone());
        let poller = OperationPoller::new(provider.clone(), PollConfig::default());
        let surface = VideoSurface::new(poller, encoder, credentials, VideoSettings::default());
        (Arc::new(surface), store)
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_credential_blocks_submission() {
        let provider = Arc::new(ScriptedProvider::new());
        let (surface, _store) = surface(&provider, Arc::new(StaticCredentials::missing()));

        assert_eq!(surface.check_credential().await, CredentialState::Missing);
        surface.select(png_upload()).await.unwrap();

        let err = surface.generate().await.unwrap_err();
        assert!(matches!(err, FastPosError::CredentialRequired));
        assert_eq!(provider.submit_count(), 0);
        assert_eq!(surface.view().credential, CredentialState::Missing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prompt_then_recheck() {
        let provider = Arc::new(ScriptedProvider::new());
        let credentials = Arc::new(StaticCredentials::granted_on_prompt());
        let (surface, _store) = surface(&provider, credentials.clone());

        assert_eq!(surface.check_credential().await, CredentialState::Missing);
        assert_eq!(surface.request_credential().await, CredentialState::Available);
        assert_eq!(credentials.prompt_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_stores_video() {
        let provider = Arc::new(ScriptedProvider::new().pending_polls(2));
        let (surface, store) = surface(&provider, Arc::new(StaticCredentials::available()));

        surface.select(png_upload()).await.unwrap();
        let id = surface.generate().await.unwrap();

        assert_eq!(store.get(&id).unwrap().mime_type, "video/mp4");
        assert_eq!(provider.poll_times().len(), 3);
        let view = surface.view();
        assert_eq!(view.result_url, Some(id.url()));
        assert!(!view.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_request_rejected_while_in_flight() {
        let provider = Arc::new(ScriptedProvider::new().pending_polls(3));
        let (surface, _store) = surface(&provider, Arc::new(StaticCredentials::available()));
        surface.check_credential().await;
        surface.select(png_upload()).await.unwrap();

        let running = surface.clone();
        let first = tokio::spawn(async move { running.generate().await });
        while provider.submit_count() == 0 {
            tokio::task::yield_now().await;
        }

        assert!(surface.view().loading);
        assert!(matches!(surface.generate().await, Err(FastPosError::Busy)));
        assert_eq!(provider.submit_count(), 1);

        assert!(first.await.unwrap().is_ok());
        assert_eq!(provider.submit_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_cancels_polling() {
        let provider = Arc::new(ScriptedProvider::new().pending_polls(1_000));
        let (surface, store) = surface(&provider, Arc::new(StaticCredentials::available()));
        surface.check_credential().await;
        surface.select(png_upload()).await.unwrap();

        let running = surface.clone();
        let task = tokio::spawn(async move { running.generate().await });
        tokio::time::sleep(std::time::Duration::from_secs(11)).await;

        surface.close();
        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, FastPosError::Cancelled));

        let checks = provider.poll_times().len();
        tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        assert_eq!(provider.poll_times().len(), checks);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_failure_resets_credential() {
        let provider = Arc::new(ScriptedProvider::new().pending_polls(5).auth_failure_on_poll(1));
        let (surface, _store) = surface(&provider, Arc::new(StaticCredentials::available()));
        surface.select(png_upload()).await.unwrap();

        let err = surface.generate().await.unwrap_err();
        assert!(matches!(err, FastPosError::Auth(_)));
        assert_eq!(surface.credential_state(), CredentialState::Missing);
        assert!(!surface.view().loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_key_at_submission_needs_new_key() {
        let provider = Arc::new(ScriptedProvider::new().auth_failure_on_submit());
        let (surface, _store) = surface(&provider, Arc::new(StaticCredentials::available()));
        surface.select(png_upload()).await.unwrap();

        let err = surface.generate().await.unwrap_err();
        assert!(matches!(err, FastPosError::Auth(_)));
        assert!(provider.poll_times().is_empty());

        let err = surface.generate().await.unwrap_err();
        assert!(matches!(err, FastPosError::CredentialRequired));
        assert_eq!(provider.submit_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborted_request_frees_the_surface() {
        let provider = Arc::new(ScriptedProvider::new().pending_polls(3));
        let (surface, store) = surface(&provider, Arc::new(StaticCredentials::available()));
        surface.check_credential().await;
        surface.select(png_upload()).await.unwrap();

        let running = surface.clone();
        let task = tokio::spawn(async move { running.generate().await });
        tokio::time::sleep(std::time::Duration::from_secs(6)).await;
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());

        assert!(!surface.view().loading);
        let checks = provider.poll_times().len();
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        assert_eq!(provider.poll_times().len(), checks);

        let id = surface.generate().await.unwrap();
        assert!(store.get(&id).is_some());
        assert_eq!(provider.submit_count(), 2);
    }
}
