//! The cast transport seam.
//!
//! Device discovery and remote playback control are delegated to an
//! implementation of [`CastTransport`]. The display targets only ever push
//! an encoded still image, point a device at a video URL, or stop playback.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::TransportError;

/// A display discovered on the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Friendly name reported by the device.
    pub name: String,
    /// Transport-specific address of the device's control endpoint.
    pub location: String,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.location)
    }
}

/// Discovery and playback control for network displays.
#[async_trait]
pub trait CastTransport: Send + Sync {
    /// Find displays on the local network, waiting at most `timeout`.
    async fn discover(&self, timeout: Duration) -> Result<Vec<Device>, TransportError>;

    /// Show a JPEG image on `device`.
    async fn push_image(&self, device: &Device, jpeg: &[u8]) -> Result<(), TransportError>;

    /// Make `device` pull and play the video at `url`.
    async fn stream_video(
        &self,
        device: &Device,
        url: &str,
        title: &str,
    ) -> Result<(), TransportError>;

    /// Halt playback on `device`.
    async fn stop(&self, device: &Device) -> Result<(), TransportError>;

    /// Release transport resources.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Discover displays and pick the first one found.
///
/// Returns `Ok(None)` when discovery succeeds but finds nothing.
pub async fn discover_first(
    transport: &dyn CastTransport,
    timeout: Duration,
) -> Result<Option<Device>, TransportError> {
    let devices = transport.discover(timeout).await?;
    debug!(count = devices.len(), "discovery finished");
    let first = devices.into_iter().next();
    if let Some(device) = &first {
        info!(device = %device, "using display");
    }
    Ok(first)
}
