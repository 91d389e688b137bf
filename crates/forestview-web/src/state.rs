//! Shared application state for the web listener.
//!
//! [`AppState`] holds the most recent snapshot pushed by the viewer. The
//! target writes it on every refresh; handlers take a read lock, clone
//! the `Arc`, and release the lock before serializing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use forestview_types::ViewState;
use tokio::sync::RwLock;

/// A snapshot together with the time it was received.
#[derive(Debug, Clone)]
pub struct Published {
    /// The snapshot.
    pub state: Arc<ViewState>,
    /// When the viewer delivered it.
    pub updated_at: DateTime<Utc>,
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Default)]
pub struct AppState {
    current: RwLock<Option<Published>>,
}

impl AppState {
    /// Create a state with no snapshot yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current snapshot.
    pub async fn publish(&self, state: Arc<ViewState>) {
        *self.current.write().await = Some(Published {
            state,
            updated_at: Utc::now(),
        });
    }

    /// The current snapshot, if one has been published.
    pub async fn snapshot(&self) -> Option<Arc<ViewState>> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|p| Arc::clone(&p.state))
    }

    /// The current snapshot and its receive time.
    pub async fn published(&self) -> Option<Published> {
        self.current.read().await.clone()
    }
}
