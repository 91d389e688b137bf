//! Errors raised while running the web listener.

use forestview_core::TargetError;

/// Errors that can occur when starting or running the web listener.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}

impl From<WebError> for TargetError {
    fn from(err: WebError) -> Self {
        Self::Server(err.to_string())
    }
}
