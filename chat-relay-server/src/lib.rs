//! chat-relay server: relays streamed chat completions to browsers over SSE.
//!
//! - [`config`]: environment-derived upstream and listener settings
//! - [`llm`]: the [`llm::CompletionClient`] seam and the live implementation
//! - [`mock`]: simulated stream used when no credentials are configured
//! - [`relay`]: the `POST /api/chat` handler

pub mod config;
pub mod error;
pub mod llm;
pub mod mock;
pub mod relay;

use std::path::Path;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use llm::CompletionClient;

/// Build the HTTP surface. Any path not matched by an API route is served
/// from `static_dir`, falling back to its `index.html`.
pub fn build_router(client: Arc<dyn CompletionClient>, static_dir: &Path) -> Router {
    let assets = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .route("/health", get({
            let llm = client.clone();
            move || health(llm)
        }))
        .route("/api/chat", post({
            let llm = client.clone();
            move |body| relay::chat(body, llm)
        }))
        .fallback_service(assets)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health(llm: Arc<dyn CompletionClient>) -> String {
    format!("OK mode={} model={}", llm.mode(), llm.model())
}
