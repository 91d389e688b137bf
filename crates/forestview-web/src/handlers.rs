//! HTTP endpoint handlers for the web target.
//!
//! All handlers read from the snapshot held in [`AppState`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page (no asset directory) |
//! | `GET` | `/api/viewmodel` | Latest snapshot as the JSON wire document |
//! | `GET` | `/health` | Liveness probe |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use forestview_types::WorldJson;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /api/viewmodel -- latest snapshot
// ---------------------------------------------------------------------------

/// Return the latest snapshot in wire format.
///
/// Before the first update this is an empty document with an all-zero
/// summary, never an error.
pub async fn get_viewmodel(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot().await;
    let body = WorldJson::from_view(snapshot.as_deref());
    ([(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")], Json(body))
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Liveness probe.
pub async fn health() -> &'static str {
    "ok"
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing listener status and the API link.
///
/// Only routed when no browser asset directory is configured.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let published = state.published().await;
    let land_count = published.as_ref().map_or(0, |p| p.state.lands.len());
    let process_count = published.as_ref().map_or(0, |p| p.state.process_count());
    let updated = published.as_ref().map_or_else(
        || String::from("never"),
        |p| p.updated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>forestview</title>
    <style>
        body {{
            background: #1a1a2e;
            color: #eee;
            font-family: system-ui, sans-serif;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #4ade80; }}
        .info {{
            background: #16213e;
            padding: 1rem 1.5rem;
            border-radius: 8px;
            margin: 1rem 0;
        }}
        a {{ color: #60a5fa; text-decoration: none; }}
        a:hover {{ text-decoration: underline; }}
    </style>
</head>
<body>
    <h1>forestview</h1>
    <div class="info">
        <p><strong>Status:</strong> Running</p>
        <p><strong>Lands:</strong> {land_count}</p>
        <p><strong>Processes:</strong> {process_count}</p>
        <p><strong>Last update:</strong> {updated}</p>
        <p><strong>API:</strong> <a href="/api/viewmodel">/api/viewmodel</a></p>
    </div>
    <p>For the full interactive visualization, configure a web asset directory.</p>
</body>
</html>"#
    ))
}
