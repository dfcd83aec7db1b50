//! Playground Surface
//!
//! Tabbed demo of the three AI features. Each tab keeps its own state while
//! the playground is open; closing the playground closes all of them.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use super::chat::ChatSurface;
use super::image::ImageEditSurface;
use super::video::VideoSurface;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaygroundTab {
    #[default]
    Chat,
    Image,
    Video,
}

pub struct Playground {
    chat: ChatSurface,
    image: ImageEditSurface,
    video: VideoSurface,
    tab: Mutex<PlaygroundTab>,
}

impl Playground {
    pub fn new(chat: ChatSurface, image: ImageEditSurface, video: VideoSurface) -> Self {
        Self {
            chat,
            image,
            video,
            tab: Mutex::new(PlaygroundTab::default()),
        }
    }

    pub fn chat(&self) -> &ChatSurface {
        &self.chat
    }

    pub fn image(&self) -> &ImageEditSurface {
        &self.image
    }

    pub fn video(&self) -> &VideoSurface {
        &self.video
    }

    pub fn tab(&self) -> PlaygroundTab {
        *self.tab.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Switching tabs keeps every tab's state
    pub fn select_tab(&self, tab: PlaygroundTab) {
        *self.tab.lock().unwrap_or_else(PoisonError::into_inner) = tab;
    }

    pub fn close(&self) {
        self.chat.close();
        self.image.close();
        self.video.close();
        tracing::debug!("Playground closed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::media::{MediaEncoder, MediaStore, UploadPolicy};
    use crate::operation::{OperationPoller, PollConfig};
    use crate::surface::chat::ChatProfile;
    use crate::surface::video::VideoSettings;
    use crate::testing::{png_upload, ScriptedProvider, StaticCredentials};

    fn playground(provider: &Arc<ScriptedProvider>, store: &Arc<MediaStore>) -> Playground {
        let encoder = MediaEncoder::new(UploadPolicy::default(), store.clone());
        Playground::new(
            ChatSurface::new(provider.clone(), ChatProfile::playground()),
            ImageEditSurface::new(provider.clone(), encoder.clone()),
            VideoSurface::new(
                OperationPoller::new(provider.clone(), PollConfig::default()),
                encoder,
                Arc::new(StaticCredentials::available()),
                VideoSettings::default(),
            ),
        )
    }

    #[tokio::test]
    async fn test_tabs_keep_state() {
        let provider = Arc::new(ScriptedProvider::new().reply("Xin chào", &[]));
        let store = Arc::new(MediaStore::new());
        let pg = playground(&provider, &store);

        pg.chat().send("hello").await.unwrap();
        pg.select_tab(PlaygroundTab::Image);
        pg.image().select(png_upload()).await.unwrap();
        pg.select_tab(PlaygroundTab::Chat);

        assert_eq!(pg.tab(), PlaygroundTab::Chat);
        assert_eq!(pg.chat().conversation().len(), 2);
        assert!(pg.image().view().preview_url.is_some());
    }

    #[tokio::test]
    async fn test_close_closes_every_tab() {
        let provider = Arc::new(ScriptedProvider::new());
        let store = Arc::new(MediaStore::new());
        let pg = playground(&provider, &store);

        pg.chat().send("hello").await.unwrap();
        pg.image().select(png_upload()).await.unwrap();
        pg.video().select(png_upload()).await.unwrap();
        assert_eq!(store.len(), 2);

        pg.close();
        assert!(store.is_empty());
        assert!(pg.chat().conversation().is_empty());
        assert!(pg.chat().session_id().is_none());
    }
}
