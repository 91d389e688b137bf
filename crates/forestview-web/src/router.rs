//! Axum router construction for the web target.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router for the web target.
///
/// The router includes:
/// - `GET /api/viewmodel` -- latest snapshot as JSON
/// - `GET /health` -- liveness probe
/// - `GET /` -- files from `static_dir` when given, otherwise the HTML
///   status page
///
/// CORS allows any origin so a separately hosted client can poll the API.
pub fn build_router(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/api/viewmodel", get(handlers::get_viewmodel))
        .route("/health", get(handlers::health));

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router.route("/", get(handlers::index)),
    };

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
