//! Error types for the viewer daemon.

use forestview_core::{ConfigError, ViewerError};

/// Errors that stop the daemon.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The configuration file could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The viewer failed to start or to shut down cleanly.
    #[error("viewer error: {0}")]
    Viewer(#[from] ViewerError),

    /// Waiting for the shutdown signal failed.
    #[error("signal error: {0}")]
    Signal(#[from] std::io::Error),
}
