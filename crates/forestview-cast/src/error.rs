//! Error types for the display targets.
//!
//! [`CastError`] covers every failure of the image and video pipelines.
//! It converts into the viewer's [`TargetError`] so the display targets
//! report through the same aggregate as every other target.

use std::process::ExitStatus;

use forestview_core::TargetError;

/// Failures reported by a [`CastTransport`](crate::transport::CastTransport).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Device discovery failed.
    #[error("discovery failed: {0}")]
    Discovery(String),

    /// The device rejected or did not answer a request.
    #[error("device {device}: {message}")]
    Device {
        /// The device's display name.
        device: String,
        /// What went wrong.
        message: String,
    },

    /// The transport was already closed.
    #[error("transport closed")]
    Closed,
}

/// Failures of an external encoder process.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The process could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// The program that was invoked.
        program: String,
        /// The underlying spawn error.
        source: std::io::Error,
    },

    /// Writing pixels into the process's stdin failed.
    #[error("failed to write to {program}: {source}")]
    Write {
        /// The program that was invoked.
        program: String,
        /// The underlying pipe error.
        source: std::io::Error,
    },

    /// The process exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    Exit {
        /// The program that was invoked.
        program: String,
        /// Its exit status.
        status: ExitStatus,
        /// Captured standard error, trimmed. Empty when not captured.
        stderr: String,
    },

    /// Reading or writing scratch files failed.
    #[error("encoder I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the image and video targets.
#[derive(Debug, thiserror::Error)]
pub enum CastError {
    /// `start` was called before any snapshot was stored.
    #[error("no state available")]
    NoStateAvailable,

    /// A video pipeline is already in flight on this target.
    #[error("video pipeline already running")]
    AlreadyRunning,

    /// The pipeline was cancelled; partial output was discarded.
    #[error("video pipeline cancelled")]
    Cancelled,

    /// The renderer produced no usable frame.
    #[error("render failed: {0}")]
    Render(String),

    /// An encoder failed.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The cast transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The stream listener could not be started or stopped.
    #[error("stream server error: {0}")]
    Serve(String),

    /// A filesystem or socket operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CastError> for TargetError {
    fn from(err: CastError) -> Self {
        match err {
            CastError::NoStateAvailable => Self::NoStateAvailable,
            CastError::Render(message) => Self::Render(message),
            CastError::Transport(e) => Self::Transport(e.to_string()),
            CastError::Serve(message) => Self::Server(message),
            CastError::Io(e) => Self::Io(e),
            e @ (CastError::Encode(_) | CastError::AlreadyRunning | CastError::Cancelled) => {
                Self::Encode(e.to_string())
            }
        }
    }
}
