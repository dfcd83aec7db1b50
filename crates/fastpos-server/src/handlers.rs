//! HTTP Handlers

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use fastpos_core::{
    error::FastPosError,
    lead::LeadForm,
    media::{MediaId, UploadFile},
    message::Turn,
    surface::{
        ChatView, CredentialState, ImageEditView, PlaygroundTab, Surface, SurfaceId, SurfaceKind,
        VideoView,
    },
    CredentialProvider,
};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: String,
    pub provider_connected: bool,
    pub credential_available: bool,
    pub open_surfaces: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Deserialize)]
pub struct OpenSurfaceRequest {
    pub kind: SurfaceKind,
}

#[derive(Serialize)]
pub struct PlaygroundView {
    pub tab: PlaygroundTab,
    pub image: ImageEditView,
    pub video: VideoView,
}

#[derive(Serialize)]
pub struct SurfaceResponse {
    pub id: SurfaceId,
    pub kind: SurfaceKind,
    pub chat: ChatView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playground: Option<PlaygroundView>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub reply: Turn,
    pub conversation: ChatView,
}

#[derive(Debug, Deserialize)]
pub struct TabRequest {
    pub tab: PlaygroundTab,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadSlot {
    Image,
    Video,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub preview_url: String,
    pub file_name: String,
    pub size: usize,
}

#[derive(Debug, Deserialize)]
pub struct ImageEditRequest {
    pub prompt: String,
}

#[derive(Serialize)]
pub struct MediaResponse {
    pub url: String,
}

#[derive(Serialize)]
pub struct CredentialResponse {
    pub state: CredentialState,
}

#[derive(Debug, Deserialize)]
pub struct LeadRequest {
    #[serde(flatten)]
    pub form: LeadForm,
    #[serde(default)]
    pub source: String,
}

#[derive(Serialize)]
pub struct LeadResponse {
    pub id: String,
    pub confirmation: String,
}

// ============================================================================
// Error mapping
// ============================================================================

fn status_for(err: &FastPosError) -> StatusCode {
    match err {
        FastPosError::Rejected(_) | FastPosError::Decode(_) => StatusCode::BAD_REQUEST,
        FastPosError::Busy => StatusCode::CONFLICT,
        FastPosError::CredentialRequired => StatusCode::FORBIDDEN,
        FastPosError::Auth(_) => StatusCode::UNAUTHORIZED,
        FastPosError::NotFound(_) => StatusCode::NOT_FOUND,
        FastPosError::Cancelled => StatusCode::GONE,
        FastPosError::Communication(_) | FastPosError::GenerationFailed(_) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn api_error(err: FastPosError) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, code = err.code(), "Request failed");
    } else {
        tracing::debug!(error = %err, code = err.code(), "Request rejected");
    }
    (
        status,
        Json(ErrorResponse {
            error: err.user_message(),
            code: err.code().into(),
        }),
    )
}

fn lookup(state: &AppState, id: &str) -> Result<(SurfaceId, Surface), ApiError> {
    let id = SurfaceId::parse(id).map_err(api_error)?;
    let surface = state.host.get(&id).map_err(api_error)?;
    Ok((id, surface))
}

fn describe(id: SurfaceId, surface: &Surface) -> SurfaceResponse {
    SurfaceResponse {
        id,
        kind: surface.kind(),
        chat: surface.chat().view(),
        playground: surface.playground().ok().map(|pg| PlaygroundView {
            tab: pg.tab(),
            image: pg.image().view(),
            video: pg.video().view(),
        }),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider_connected = state.provider.health_check().await.unwrap_or(false);
    let provider = state
        .provider
        .info()
        .await
        .map(|info| info.name)
        .unwrap_or_default();
    let credential_available = state.keys.has_credential().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider,
        provider_connected,
        credential_available,
        open_surfaces: state.host.open_count(),
    })
}

/// Open a chatbot or playground surface
pub async fn open_surface(
    State(state): State<AppState>,
    Json(payload): Json<OpenSurfaceRequest>,
) -> (StatusCode, Json<SurfaceResponse>) {
    let (id, surface) = state.host.open(payload.kind);
    (StatusCode::CREATED, Json(describe(id, &surface)))
}

pub async fn get_surface(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SurfaceResponse>, ApiError> {
    let (id, surface) = lookup(&state, &id)?;
    Ok(Json(describe(id, &surface)))
}

/// Close a surface: cancels polling and releases its media
pub async fn close_surface(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = SurfaceId::parse(&id).map_err(api_error)?;
    state.host.close(&id).map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Send one chat turn
pub async fn chat_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let (_, surface) = lookup(&state, &id)?;
    let chat = surface.chat();
    let reply = chat.send(&payload.message).await.map_err(api_error)?;

    Ok(Json(ChatResponse {
        reply,
        conversation: chat.view(),
    }))
}

pub async fn select_tab(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<TabRequest>,
) -> Result<StatusCode, ApiError> {
    let (_, surface) = lookup(&state, &id)?;
    surface.playground().map_err(api_error)?.select_tab(payload.tab);
    Ok(StatusCode::NO_CONTENT)
}

/// Multipart image upload into the image or video tab
pub async fn upload_handler(
    State(state): State<AppState>,
    Path((id, slot)): Path<(String, UploadSlot)>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let (_, surface) = lookup(&state, &id)?;
    let playground = surface.playground().map_err(api_error)?;

    let field = multipart
        .next_field()
        .await
        .map_err(|e| api_error(FastPosError::Decode(e.to_string())))?
        .ok_or_else(|| api_error(FastPosError::Rejected("Vui lòng chọn một tệp.".into())))?;

    let name = field.file_name().unwrap_or("upload").to_string();
    let mime_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let bytes = field
        .bytes()
        .await
        .map_err(|e| api_error(FastPosError::Decode(e.to_string())))?;

    let file = UploadFile::new(name, mime_type, bytes.to_vec());
    let asset = match slot {
        UploadSlot::Image => playground.image().select(file).await,
        UploadSlot::Video => playground.video().select(file).await,
    }
    .map_err(api_error)?;

    Ok(Json(UploadResponse {
        preview_url: asset.preview_url(),
        file_name: asset.file_name,
        size: asset.size,
    }))
}

/// Edit the uploaded image with a prompt
pub async fn image_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ImageEditRequest>,
) -> Result<Json<MediaResponse>, ApiError> {
    let (_, surface) = lookup(&state, &id)?;
    let result = surface
        .playground()
        .map_err(api_error)?
        .image()
        .generate(&payload.prompt)
        .await
        .map_err(api_error)?;

    Ok(Json(MediaResponse { url: result.url() }))
}

pub async fn credential_state(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CredentialResponse>, ApiError> {
    let (_, surface) = lookup(&state, &id)?;
    let video = surface.playground().map_err(api_error)?.video();
    Ok(Json(CredentialResponse {
        state: video.check_credential().await,
    }))
}

/// Ask the host for a credential, then re-check
pub async fn request_credential(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CredentialResponse>, ApiError> {
    let (_, surface) = lookup(&state, &id)?;
    let video = surface.playground().map_err(api_error)?.video();
    Ok(Json(CredentialResponse {
        state: video.request_credential().await,
    }))
}

/// Generate a video; the response arrives once polling completes
pub async fn video_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MediaResponse>, ApiError> {
    let (_, surface) = lookup(&state, &id)?;
    let result = surface
        .playground()
        .map_err(api_error)?
        .video()
        .generate()
        .await
        .map_err(api_error)?;

    Ok(Json(MediaResponse { url: result.url() }))
}

/// Serve a stored preview or generated file
pub async fn media_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = MediaId::parse(&id).map_err(api_error)?;
    let blob = state
        .media
        .get(&id)
        .ok_or_else(|| api_error(FastPosError::NotFound(format!("media {id}"))))?;

    Ok((
        [
            (header::CONTENT_TYPE, blob.mime_type.clone()),
            (header::CACHE_CONTROL, "private, max-age=3600".to_string()),
        ],
        blob.bytes.clone(),
    )
        .into_response())
}

/// Submit a consultation request
pub async fn lead_handler(
    State(state): State<AppState>,
    Json(payload): Json<LeadRequest>,
) -> Result<Json<LeadResponse>, ApiError> {
    let surface = state.host.lead_form(payload.source);
    let outcome = surface.submit(&payload.form).await.map_err(api_error)?;

    Ok(Json(LeadResponse {
        id: outcome.record.id.to_string(),
        confirmation: outcome.confirmation,
    }))
}
