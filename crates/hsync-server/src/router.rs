use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware, Router};
use hsync_directory::HandleDirectory;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::bridge::ConnectionBridge;
use crate::config::ServerConfig;
use crate::handler;
use crate::origin::{enforce_origin, OriginPolicy};

/// Shared state of every route.
#[derive(Clone, Debug)]
pub struct AppState {
    pub directory: HandleDirectory,
    pub bridge: Arc<ConnectionBridge>,
    pub policy: Arc<OriginPolicy>,
}

/// Build the axum router with all hsync endpoints.
///
/// Layers, outermost first: request tracing, origin enforcement, CORS
/// response headers.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let policy = Arc::clone(&state.policy);
    let cors = policy.cors_layer();

    Router::new()
        .route(endpoints::ROOT, get(handler::root_handler))
        .route(
            endpoints::HANDLE,
            post(handler::handle_handler).layer(DefaultBodyLimit::max(config.handle_body_limit)),
        )
        .route(
            endpoints::ASSIGN,
            post(handler::assign_handler).layer(DefaultBodyLimit::max(config.assign_body_limit)),
        )
        .fallback(handler::fallback_handler)
        .with_state(state)
        .layer(cors)
        .layer(middleware::from_fn_with_state(policy, enforce_origin))
        .layer(TraceLayer::new_for_http())
}
