//! Web/JSON output target for the Forestview viewer.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`GET /api/viewmodel`** -- the latest snapshot in the JSON wire
//!   format consumed by the browser client
//! - **`GET /health`** -- liveness probe answering `ok`
//! - **`GET /`** -- the browser client assets when a directory is
//!   configured, otherwise a minimal HTML status page
//!
//! # Architecture
//!
//! [`WebTarget`] implements the viewer's `Target` capability. Each update
//! replaces the snapshot held in [`AppState`]; the first update also
//! binds the listener. Handlers only ever read the snapshot, so a slow
//! client never blocks the refresh loop.
//!
//! [`WebTarget`]: target::WebTarget
//! [`AppState`]: state::AppState

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
pub mod target;

// Re-export primary types for convenience.
pub use error::WebError;
pub use router::build_router;
pub use state::AppState;
pub use target::WebTarget;
