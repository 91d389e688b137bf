//! Sources of [`ViewState`] snapshots.
//!
//! The viewer asks its [`StateProvider`] for a fresh snapshot on every
//! refresh. Three providers ship with the crate:
//!
//! - [`StaticStateProvider`] always hands out the same snapshot.
//! - [`CallbackStateProvider`] calls a closure, letting the caller build
//!   each snapshot from its own (mutable) state.
//! - [`JsonFileStateProvider`] re-reads a JSON document from disk, so an
//!   external process can drive the display by rewriting one file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use forestview_types::ViewState;

use crate::error::ProviderError;

/// Yields the current [`ViewState`] on demand.
#[async_trait]
pub trait StateProvider: Send + Sync {
    /// Produce the snapshot for this refresh.
    async fn view_state(&self) -> Result<Arc<ViewState>, ProviderError>;
}

/// Provider wrapping one fixed snapshot.
#[derive(Debug, Clone)]
pub struct StaticStateProvider {
    state: Arc<ViewState>,
}

impl StaticStateProvider {
    /// Create a provider that always returns `state`.
    pub fn new(state: ViewState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }
}

#[async_trait]
impl StateProvider for StaticStateProvider {
    async fn view_state(&self) -> Result<Arc<ViewState>, ProviderError> {
        Ok(Arc::clone(&self.state))
    }
}

type StateFn = dyn Fn() -> Result<ViewState, ProviderError> + Send + Sync;

/// Provider that calls a closure for every snapshot.
pub struct CallbackStateProvider {
    callback: Box<StateFn>,
}

impl CallbackStateProvider {
    /// Create a provider from a snapshot-building closure.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn() -> Result<ViewState, ProviderError> + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl std::fmt::Debug for CallbackStateProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackStateProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl StateProvider for CallbackStateProvider {
    async fn view_state(&self) -> Result<Arc<ViewState>, ProviderError> {
        (self.callback)().map(Arc::new)
    }
}

/// Provider that reads a JSON-encoded [`ViewState`] from a file on every
/// fetch.
#[derive(Debug, Clone)]
pub struct JsonFileStateProvider {
    path: PathBuf,
}

impl JsonFileStateProvider {
    /// Create a provider reading from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file this provider reads.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StateProvider for JsonFileStateProvider {
    async fn view_state(&self) -> Result<Arc<ViewState>, ProviderError> {
        let contents = tokio::fs::read(&self.path).await.map_err(|e| {
            ProviderError::new(format_args!("read {}: {e}", self.path.display()))
        })?;
        let state: ViewState = serde_json::from_slice(&contents).map_err(|e| {
            ProviderError::new(format_args!("parse {}: {e}", self.path.display()))
        })?;
        Ok(Arc::new(state))
    }
}
