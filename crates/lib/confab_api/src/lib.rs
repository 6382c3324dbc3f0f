//! # confab_api
//!
//! HTTP API library for Confab.

pub mod config;
pub mod error;
pub mod handlers;

use axum::Router;
use axum::routing::post;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::handlers::{chat, share};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: ApiConfig,
}

/// Builds the Axum router with all routes and shared state.
///
/// Unmatched methods on matched paths get axum's built-in 405.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(chat::chat_handler))
        .route(
            "/api/share",
            post(share::create_share_handler).get(share::view_share_handler),
        )
        .layer(cors)
        .with_state(state)
}
