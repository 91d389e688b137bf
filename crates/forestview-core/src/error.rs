//! Error taxonomy for the viewer and its targets.
//!
//! - [`ProviderError`] -- the state provider could not produce a snapshot.
//!   The refresh is aborted before any target is touched.
//! - [`TargetError`] -- one target failed. Scoped to that target and
//!   collected into a [`TargetFailures`] aggregate; never halts siblings.
//! - [`ViewerError`] -- what the viewer reports to its caller, including
//!   the configuration errors rejected before any I/O.

use std::fmt;

/// The state provider failed to produce a snapshot.
#[derive(Debug, thiserror::Error)]
#[error("state provider failed: {message}")]
pub struct ProviderError {
    /// Description of the failure.
    pub message: String,
}

impl ProviderError {
    /// Create a provider error from any displayable cause.
    pub fn new(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// A failure inside a single output target.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// The renderer produced no frame.
    #[error("render failed: {0}")]
    Render(String),

    /// An encoder process failed or could not be driven.
    #[error("encode failed: {0}")]
    Encode(String),

    /// The cast transport rejected a request.
    #[error("transport error: {0}")]
    Transport(String),

    /// An HTTP listener could not be started or stopped.
    #[error("server error: {0}")]
    Server(String),

    /// The target has no snapshot to work with yet.
    #[error("no state available")]
    NoStateAvailable,

    /// A filesystem or socket operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One target's failure, tagged with the target's name.
#[derive(Debug, thiserror::Error)]
#[error("target {target}: {source}")]
pub struct TargetFailure {
    /// The failing target's [`name`](crate::target::Target::name).
    pub target: String,
    /// The underlying cause.
    #[source]
    pub source: TargetError,
}

/// Every target failure from one fan-out, in dispatch order.
#[derive(Debug, Default)]
pub struct TargetFailures(pub Vec<TargetFailure>);

impl TargetFailures {
    /// Record a failure.
    pub fn push(&mut self, target: String, source: TargetError) {
        self.0.push(TargetFailure { target, source });
    }

    /// Whether no failure was recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of recorded failures.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Names of the failing targets, in dispatch order.
    pub fn target_names(&self) -> Vec<&str> {
        self.0.iter().map(|f| f.target.as_str()).collect()
    }

    /// Iterate over the recorded failures.
    pub fn iter(&self) -> std::slice::Iter<'_, TargetFailure> {
        self.0.iter()
    }
}

impl fmt::Display for TargetFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} target(s) failed", self.0.len())?;
        for (i, failure) in self.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for TargetFailures {}

/// Errors reported by the [`Viewer`](crate::viewer::Viewer).
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    /// No state provider has been set.
    #[error("no state provider configured")]
    NoProviderConfigured,

    /// A refresh loop is already running on this viewer.
    #[error("viewer already started")]
    AlreadyStarted,

    /// The state provider failed; no target was updated.
    #[error("failed to get view state: {source}")]
    Provider {
        /// The underlying provider error.
        #[from]
        source: ProviderError,
    },

    /// One or more targets failed to accept the snapshot.
    #[error("update failed: {0}")]
    Targets(TargetFailures),

    /// One or more targets failed to close.
    #[error("close failed: {0}")]
    Close(TargetFailures),
}

impl ViewerError {
    /// Whether this error was a configuration error rejected before any I/O.
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::NoProviderConfigured | Self::AlreadyStarted)
    }

    /// The per-target failures carried by this error, if any.
    pub const fn target_failures(&self) -> Option<&TargetFailures> {
        match self {
            Self::Targets(failures) | Self::Close(failures) => Some(failures),
            _ => None,
        }
    }
}
