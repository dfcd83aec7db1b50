//! API Client

use std::sync::{Arc, Mutex, PoisonError};

use leptos::ev;
use leptos::prelude::*;
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

/// One conversation turn as rendered
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub speaker: String,
    pub text: String,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub fallback: bool,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: "user".into(),
            text: text.into(),
            links: Vec::new(),
            fallback: false,
        }
    }

    pub fn fallback(text: impl Into<String>) -> Self {
        Self {
            speaker: "agent".into(),
            text: text.into(),
            links: Vec::new(),
            fallback: true,
        }
    }

    pub fn is_user(&self) -> bool {
        self.speaker == "user"
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChatView {
    #[serde(default)]
    pub turns: Vec<ChatTurn>,
    #[serde(default)]
    pub loading: bool,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SurfaceInfo {
    pub id: String,
    pub chat: ChatView,
}

#[derive(Clone, Debug, Deserialize)]
struct ChatResponse {
    conversation: ChatView,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UploadInfo {
    pub preview_url: String,
}

#[derive(Clone, Debug, Deserialize)]
struct MediaResponse {
    url: String,
}

#[derive(Clone, Debug, Deserialize)]
struct CredentialResponse {
    state: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct LeadRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub note: String,
    pub source: String,
}

#[derive(Clone, Debug, Deserialize)]
struct LeadResponse {
    confirmation: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

const GENERIC_ERROR: &str = "Đã có lỗi xảy ra. Vui lòng thử lại.";

fn url(path: &str) -> String {
    let origin = web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_else(|| "http://localhost:3000".into());
    format!("{origin}{path}")
}

async fn read<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T, String> {
    if response.status().is_success() {
        response.json().await.map_err(|e| e.to_string())
    } else {
        let error = response
            .json::<ErrorBody>()
            .await
            .map(|b| b.error)
            .unwrap_or_else(|_| GENERIC_ERROR.into());
        Err(error)
    }
}

async fn post<T: for<'de> Deserialize<'de>>(path: &str, body: serde_json::Value) -> Result<T, String> {
    let response = reqwest::Client::new()
        .post(url(path))
        .json(&body)
        .send()
        .await
        .map_err(|e| e.to_string())?;
    read(response).await
}

async fn get<T: for<'de> Deserialize<'de>>(path: &str) -> Result<T, String> {
    let response = reqwest::get(url(path)).await.map_err(|e| e.to_string())?;
    read(response).await
}

/// Open a `chatbot` or `playground` surface
pub async fn open_surface(kind: &str) -> Result<SurfaceInfo, String> {
    post("/api/surfaces", serde_json::json!({ "kind": kind })).await
}

pub async fn close_surface(id: &str) -> Result<(), String> {
    reqwest::Client::new()
        .delete(url(&format!("/api/surfaces/{id}")))
        .send()
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}

fn spawn_close(id: String) {
    leptos::task::spawn_local(async move {
        let _ = close_surface(&id).await;
    });
}

#[derive(Default)]
struct LeaseState {
    id: Option<String>,
    released: bool,
}

/// The server surface a component owns. Closed when the component is
/// cleaned up or the page is hidden, including when that happens before
/// the open request came back.
#[derive(Clone, Default)]
pub struct SurfaceLease(Arc<Mutex<LeaseState>>);

impl SurfaceLease {
    /// Lease bound to the current reactive owner
    pub fn scoped() -> Self {
        let lease = Self::default();

        let on_hide = lease.clone();
        let listener = window_event_listener(ev::pagehide, move |_| on_hide.release_on_unload());

        let on_drop = lease.clone();
        on_cleanup(move || {
            listener.remove();
            on_drop.release();
        });
        lease
    }

    /// Record a freshly opened surface. Returns false if the owner is
    /// already gone; the surface is closed instead of kept.
    pub fn attach(&self, id: String) -> bool {
        let mut state = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if state.released {
            drop(state);
            spawn_close(id);
            return false;
        }
        state.id = Some(id);
        true
    }

    pub fn release(&self) {
        let id = {
            let mut state = self.0.lock().unwrap_or_else(PoisonError::into_inner);
            state.released = true;
            state.id.take()
        };
        if let Some(id) = id {
            spawn_close(id);
        }
    }

    /// Fetches are cut off while the page goes away, so the close goes out
    /// as a beacon. The lease stays usable in case the page is restored
    /// from the back/forward cache.
    pub fn release_on_unload(&self) {
        let id = self.0.lock().unwrap_or_else(PoisonError::into_inner).id.take();
        let Some(id) = id else {
            return;
        };
        let beacon = url(&format!("/api/surfaces/{id}/close"));
        let sent = web_sys::window()
            .and_then(|w| w.navigator().send_beacon(&beacon).ok())
            .unwrap_or(false);
        if !sent {
            spawn_close(id);
        }
    }

    pub fn is_attached(&self) -> bool {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).id.is_some()
    }
}

/// Send a turn; returns the updated conversation
pub async fn send_chat(id: &str, message: &str) -> Result<ChatView, String> {
    let response: ChatResponse = post(
        &format!("/api/surfaces/{id}/chat"),
        serde_json::json!({ "message": message }),
    )
    .await?;
    Ok(response.conversation)
}

pub async fn select_tab(id: &str, tab: &str) -> Result<(), String> {
    reqwest::Client::new()
        .post(url(&format!("/api/surfaces/{id}/tab")))
        .json(&serde_json::json!({ "tab": tab }))
        .send()
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Upload a picked file into the `image` or `video` slot.
///
/// Sent through the browser's own `fetch` so the `File` is streamed as is.
pub async fn upload(id: &str, slot: &str, file: web_sys::File) -> Result<UploadInfo, String> {
    let js_err = |e: wasm_bindgen::JsValue| e.as_string().unwrap_or_else(|| GENERIC_ERROR.into());

    let form = web_sys::FormData::new().map_err(js_err)?;
    form.append_with_blob_and_filename("file", &file, &file.name())
        .map_err(js_err)?;

    let init = web_sys::RequestInit::new();
    init.set_method("POST");
    init.set_body(&form);
    let request = web_sys::Request::new_with_str_and_init(
        &url(&format!("/api/surfaces/{id}/uploads/{slot}")),
        &init,
    )
    .map_err(js_err)?;

    let window = web_sys::window().ok_or_else(|| GENERIC_ERROR.to_string())?;
    let response: web_sys::Response = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(js_err)?
        .dyn_into()
        .map_err(js_err)?;
    let text = JsFuture::from(response.text().map_err(js_err)?)
        .await
        .map_err(js_err)?
        .as_string()
        .unwrap_or_default();

    if response.ok() {
        serde_json::from_str(&text).map_err(|e| e.to_string())
    } else {
        Err(serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.error)
            .unwrap_or_else(|_| GENERIC_ERROR.into()))
    }
}

/// Edit the uploaded image; returns the result URL
pub async fn edit_image(id: &str, prompt: &str) -> Result<String, String> {
    let response: MediaResponse = post(
        &format!("/api/surfaces/{id}/image"),
        serde_json::json!({ "prompt": prompt }),
    )
    .await?;
    Ok(response.url)
}

/// `checking`, `missing` or `available`
pub async fn credential_state(id: &str) -> Result<String, String> {
    let response: CredentialResponse = get(&format!("/api/surfaces/{id}/video/credential")).await?;
    Ok(response.state)
}

pub async fn request_credential(id: &str) -> Result<String, String> {
    let response: CredentialResponse = post(
        &format!("/api/surfaces/{id}/video/credential"),
        serde_json::Value::Null,
    )
    .await?;
    Ok(response.state)
}

/// Generate a video; resolves once the server finishes polling
pub async fn generate_video(id: &str) -> Result<String, String> {
    let response: MediaResponse =
        post(&format!("/api/surfaces/{id}/video"), serde_json::Value::Null).await?;
    Ok(response.url)
}

/// Submit a consultation request; returns the confirmation email
pub async fn submit_lead(request: &LeadRequest) -> Result<String, String> {
    let body = serde_json::to_value(request).map_err(|e| e.to_string())?;
    let response: LeadResponse = post("/api/leads", body).await?;
    Ok(response.confirmation)
}
