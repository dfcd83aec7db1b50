//! FastPOS HTTP Server
//!
//! Axum-based server hosting the landing site's AI features: the floating
//! chatbot, the AI playground (chat, image edit, video) and lead capture.

mod config;
mod handlers;
mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fastpos_core::{
    CredentialProvider, GenAiProvider, KeyRing, MediaEncoder, MediaStore, PollConfig,
    SurfaceHost, TracingLeadSink, UploadPolicy,
};
use fastpos_runtime::{GeminiProvider, API_KEY_VARS};

use crate::config::ServerConfig;
use crate::handlers::{
    chat_handler, close_surface, credential_state, get_surface, health_check, image_handler,
    lead_handler, media_handler, open_surface, request_credential, select_tab, upload_handler,
    video_handler,
};
use crate::state::AppState;

/// Room for multipart framing on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// How often abandoned surfaces are looked for
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;
    let static_dir = state.config.static_dir.clone();

    Router::new()
        // Health
        .route("/health", get(health_check))

        // Surfaces
        .route("/api/surfaces", post(open_surface))
        .route("/api/surfaces/{id}", get(get_surface).delete(close_surface))
        // Beacons sent on page unload can only POST
        .route("/api/surfaces/{id}/close", post(close_surface))
        .route("/api/surfaces/{id}/chat", post(chat_handler))
        .route("/api/surfaces/{id}/tab", post(select_tab))
        .route("/api/surfaces/{id}/uploads/{slot}", post(upload_handler))
        .route("/api/surfaces/{id}/image", post(image_handler))
        .route(
            "/api/surfaces/{id}/video/credential",
            get(credential_state).post(request_credential),
        )
        .route("/api/surfaces/{id}/video", post(video_handler))

        // Media and leads
        .route("/media/{id}", get(media_handler))
        .route("/api/leads", post(lead_handler))

        // Static files (WASM frontend)
        .fallback_service(tower_http::services::ServeDir::new(static_dir))

        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let config = ServerConfig::from_env();

    // Credential and provider
    let keys = Arc::new(KeyRing::from_env(API_KEY_VARS));
    if keys.has_credential().await? {
        tracing::info!("✓ API key loaded");
    } else {
        tracing::warn!("⚠ No API key - AI features will fail");
        tracing::warn!("  Set GEMINI_API_KEY in .env");
    }

    let provider: Arc<dyn GenAiProvider> = Arc::new(GeminiProvider::from_env(keys.clone())?);
    match provider.health_check().await {
        Ok(true) => tracing::info!("✓ Connected to Gemini"),
        Ok(false) | Err(_) => tracing::warn!("⚠ Gemini not reachable - chat will show fallbacks"),
    }

    // Surfaces
    let media = Arc::new(MediaStore::new());
    let policy = UploadPolicy {
        max_bytes: config.max_upload_bytes,
        ..Default::default()
    };
    let host = SurfaceHost::new(
        provider.clone(),
        keys.clone(),
        Arc::new(TracingLeadSink),
        MediaEncoder::new(policy, media.clone()),
    )
    .with_poll_config(PollConfig {
        interval: config.poll_interval,
    });
    let host = Arc::new(host);

    // Visitors who leave without closing their surface are cleaned up here
    let sweeper = host.clone();
    let idle = config.surface_idle;
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tick.tick().await;
            sweeper.sweep_idle(idle);
        }
    });

    let addr = config.bind_addr.clone();
    let state = AppState {
        provider,
        keys,
        host,
        media,
        config: Arc::new(config),
    };
    let app = router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 FastPOS server running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET    /health                           - Health check");
    tracing::info!("  POST   /api/surfaces                     - Open chatbot/playground");
    tracing::info!("  DELETE /api/surfaces/{{id}}                - Close surface");
    tracing::info!("  POST   /api/surfaces/{{id}}/close          - Close surface (beacon)");
    tracing::info!("  POST   /api/surfaces/{{id}}/chat           - Send chat turn");
    tracing::info!("  POST   /api/surfaces/{{id}}/uploads/{{slot}} - Upload image");
    tracing::info!("  POST   /api/surfaces/{{id}}/image          - Edit image");
    tracing::info!("  POST   /api/surfaces/{{id}}/video          - Generate video");
    tracing::info!("  POST   /api/leads                        - Submit consultation request");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
