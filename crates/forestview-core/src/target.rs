//! The output target capability.
//!
//! Every sink the viewer can drive -- the web JSON surface, a still-image
//! display, a video stream -- implements [`Target`]. The viewer only ever
//! sees `Arc<dyn Target>` and never inspects the concrete type.

use std::sync::Arc;

use async_trait::async_trait;
use forestview_types::ViewState;

use crate::error::TargetError;

/// An output destination for view state snapshots.
///
/// Implementations own their resources and their internal
/// synchronization: the viewer may call `update` from its periodic loop
/// while another caller triggers a manual refresh.
#[async_trait]
pub trait Target: Send + Sync {
    /// Accept a new snapshot. The snapshot is shared and must not be
    /// mutated.
    async fn update(&self, state: Arc<ViewState>) -> Result<(), TargetError>;

    /// Release every resource held by the target.
    async fn close(&self) -> Result<(), TargetError>;

    /// A descriptive name used in logs and aggregate errors.
    fn name(&self) -> String;
}
