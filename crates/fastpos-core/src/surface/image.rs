//! Image Edit Surface
//!
//! Playground tab: upload an image, describe an edit, get an edited image back
//! from a single content-generation call.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::error::{FastPosError, Result};
use crate::media::{MediaBlob, MediaEncoder, MediaId, UploadAsset, UploadFile};
use crate::provider::{ContentPart, ContentRequest, GenAiProvider};

use super::BusyGuard;

/// Default image editing model
pub const IMAGE_EDIT_MODEL: &str = "gemini-2.5-flash-image";

#[derive(Clone, Debug, Serialize)]
pub struct ImageEditView {
    pub preview_url: Option<String>,
    pub result_url: Option<String>,
    pub loading: bool,
}

#[derive(Default)]
struct ImageState {
    asset: Option<UploadAsset>,
    result: Option<MediaId>,
    loading: bool,
    closed: bool,
}

pub struct ImageEditSurface {
    provider: Arc<dyn GenAiProvider>,
    encoder: MediaEncoder,
    model: String,
    state: Mutex<ImageState>,
}

impl ImageEditSurface {
    pub fn new(provider: Arc<dyn GenAiProvider>, encoder: MediaEncoder) -> Self {
        Self {
            provider,
            encoder,
            model: IMAGE_EDIT_MODEL.into(),
            state: Mutex::new(ImageState::default()),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn lock(&self) -> MutexGuard<'_, ImageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn view(&self) -> ImageEditView {
        let state = self.lock();
        ImageEditView {
            preview_url: state.asset.as_ref().map(UploadAsset::preview_url),
            result_url: state.result.map(|id| id.url()),
            loading: state.loading,
        }
    }

    /// Replace the selected image. The previous preview and result are released.
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

    /// Apply `prompt` to the selected image; returns the stored result
    pub async fn generate(&self, prompt: &str) -> Result<MediaId> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(FastPosError::Rejected("Vui lòng mô tả chỉnh sửa mong muốn.".into()));
        }

        let image = {
            let mut state = self.lock();
            if state.closed {
                return Err(FastPosError::Cancelled);
            }
            if state.loading {
                return Err(FastPosError::Busy);
            }
            let image = state
                .asset
                .as_ref()
                .map(|a| a.encoded.clone())
                .ok_or_else(|| FastPosError::Rejected("Vui lòng tải ảnh lên trước.".into()))?;
            state.loading = true;
            image
        };

        let request = ContentRequest::new(self.model.clone())
            .part(ContentPart::media(image))
            .part(ContentPart::text(prompt));
        let guard = BusyGuard::new(&self.state, |state: &mut ImageState| state.loading = false);
        let response = self.provider.generate_content(&request).await;
        guard.disarm();

        let mut state = self.lock();
        state.loading = false;
        if state.closed {
            return Err(FastPosError::Cancelled);
        }

        let response = response.inspect_err(|e| tracing::error!(error = %e, "Image edit failed"))?;
        let media = response.first_media().ok_or_else(|| {
            FastPosError::GenerationFailed("Không tìm thấy hình ảnh trong phản hồi.".into())
        })?;

        let store = self.encoder.store();
        let id = store.insert(MediaBlob::from_encoded(media)?);
        if let Some(old) = state.result.replace(id) {
            store.release(&old);
        }
        tracing::info!(result = %id, "Image edit completed");
        Ok(id)
    }

    /// Release every media resource held by this surface
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
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
    use crate::media::{EncodedMedia, MediaStore, UploadPolicy};
    use crate::provider::ContentResponse;
    use crate::testing::{png_upload, ScriptedProvider};

    fn surface(provider: &Arc<ScriptedProvider>) -> (ImageEditSurface, Arc<MediaStore>) {
        let store = Arc::new(MediaStore::new());
        let encoder = MediaEncoder::new(UploadPolicy::default(), store.clone());
        (ImageEditSurface::new(provider.clone(), encoder), store)
    }

    fn edited() -> ContentResponse {
        ContentResponse {
            parts: vec![
                ContentPart::text("Đây là ảnh đã chỉnh sửa"),
                ContentPart::media(EncodedMedia::from_bytes("image/png", &[7, 7, 7])),
            ],
        }
    }

    #[tokio::test]
    async fn test_generate_sends_image_then_prompt() {
        let provider = Arc::new(ScriptedProvider::new().content(edited()));
        let (surface, store) = surface(&provider);

        let asset = surface.select(png_upload()).await.unwrap();
        let id = surface.generate("Thêm hiệu ứng retro").await.unwrap();

        let request = &provider.content_requests()[0];
        assert_eq!(request.model, IMAGE_EDIT_MODEL);
        assert_eq!(request.parts[0], ContentPart::media(asset.encoded.clone()));
        assert_eq!(request.parts[1], ContentPart::text("Thêm hiệu ứng retro"));

        assert_eq!(store.get(&id).unwrap().bytes, vec![7, 7, 7]);
        assert_eq!(surface.view().result_url, Some(id.url()));
    }

    #[tokio::test]
    async fn test_text_only_response_is_generation_failure() {
        let provider = Arc::new(ScriptedProvider::new().content(ContentResponse {
            parts: vec![ContentPart::text("Không thể chỉnh sửa")],
        }));
        let (surface, _store) = surface(&provider);
        surface.select(png_upload()).await.unwrap();

        let err = surface.generate("Xóa nền").await.unwrap_err();
        assert!(matches!(err, FastPosError::GenerationFailed(_)));
        assert!(!surface.view().loading);
    }

    #[tokio::test]
    async fn test_generate_requires_image() {
        let provider = Arc::new(ScriptedProvider::new());
        let (surface, _store) = surface(&provider);
        let err = surface.generate("Xóa nền").await.unwrap_err();
        assert!(matches!(err, FastPosError::Rejected(_)));
        assert!(provider.content_requests().is_empty());
    }

    #[tokio::test]
    async fn test_reselect_releases_previous_media() {
        let provider = Arc::new(ScriptedProvider::new().content(edited()));
        let (surface, store) = surface(&provider);

        let first = surface.select(png_upload()).await.unwrap();
        surface.generate("retro").await.unwrap();
        assert_eq!(store.len(), 2);

        let second = surface.select(png_upload()).await.unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get(&first.preview).is_none());
        assert!(store.get(&second.preview).is_some());
        assert!(surface.view().result_url.is_none());
    }

    #[tokio::test]
    async fn test_close_releases_everything() {
        let provider = Arc::new(ScriptedProvider::new().content(edited()));
        let (surface, store) = surface(&provider);
        surface.select(png_upload()).await.unwrap();
        surface.generate("retro").await.unwrap();

        surface.close();
        assert!(store.is_empty());
        assert!(matches!(surface.select(png_upload()).await, Err(FastPosError::Cancelled)));
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_generate_frees_the_surface() {
        let provider = Arc::new(ScriptedProvider::new().stall_content().content(edited()));
        let (surface, _store) = surface(&provider);
        surface.select(png_upload()).await.unwrap();

        let abandoned =
            tokio::time::timeout(std::time::Duration::from_secs(30), surface.generate("retro")).await;
        assert!(abandoned.is_err());
        assert!(!surface.view().loading);

        surface.generate("retro").await.unwrap();
        assert_eq!(provider.content_requests().len(), 2);
    }
}
