//! Still-image display target.
//!
//! Every update renders one frame, encodes it, and pushes it to the
//! display. Pushes are suppressed when the encoded bytes are identical to
//! the last successful push, so an unchanged cluster costs one render and
//! one encode per refresh but no network traffic.

use std::sync::Arc;

use async_trait::async_trait;
use forestview_core::config::DisplayConfig;
use forestview_core::{Scene, Target, TargetError};
use forestview_types::ViewState;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::encode::{CompatibleJpegEncoder, DirectJpegEncoder, StillEncoder};
use crate::error::CastError;
use crate::render::{Frame, FrameRenderer};
use crate::transport::{CastTransport, Device};

/// Pushes rendered still images to one display.
pub struct ImageTarget {
    device: Device,
    renderer: Arc<dyn FrameRenderer>,
    transport: Arc<dyn CastTransport>,
    encoder: Arc<dyn StillEncoder>,
    last_pushed: Mutex<Option<Vec<u8>>>,
}

impl ImageTarget {
    /// Create a target for `device`.
    pub fn new(
        device: Device,
        renderer: Arc<dyn FrameRenderer>,
        transport: Arc<dyn CastTransport>,
        encoder: Arc<dyn StillEncoder>,
    ) -> Self {
        Self {
            device,
            renderer,
            transport,
            encoder,
            last_pushed: Mutex::new(None),
        }
    }

    /// Create a target whose encoder is chosen by `use_compatibility_format`.
    pub fn from_config(
        device: Device,
        renderer: Arc<dyn FrameRenderer>,
        transport: Arc<dyn CastTransport>,
        config: &DisplayConfig,
    ) -> Self {
        let encoder: Arc<dyn StillEncoder> = if config.use_compatibility_format {
            Arc::new(CompatibleJpegEncoder::new())
        } else {
            Arc::new(DirectJpegEncoder::new())
        };
        Self::new(device, renderer, transport, encoder)
    }

    /// The display this target pushes to.
    pub const fn device(&self) -> &Device {
        &self.device
    }

    /// Render, encode, and push one snapshot.
    ///
    /// # Errors
    ///
    /// [`CastError::Render`] when the renderer yields no frame; encoder
    /// and transport failures otherwise. A failed push is retried on the
    /// next update even if the image has not changed.
    pub async fn show(&self, state: &ViewState) -> Result<(), CastError> {
        let scene = Scene::from_view(state);
        let frame = render_one(Arc::clone(&self.renderer), scene).await?;
        let bytes = self.encoder.encode(&frame).await?;

        // Held across the push so concurrent updates cannot interleave.
        let mut last = self.last_pushed.lock().await;
        if last.as_deref() == Some(bytes.as_slice()) {
            debug!(device = %self.device.name, "image unchanged, skipping push");
            return Ok(());
        }

        self.transport.push_image(&self.device, &bytes).await?;
        info!(device = %self.device.name, bytes = bytes.len(), "image pushed");
        *last = Some(bytes);
        Ok(())
    }

    /// Halt playback on the display.
    pub async fn stop(&self) -> Result<(), CastError> {
        self.transport.stop(&self.device).await?;
        Ok(())
    }

    /// Release the renderer and the transport. Both are attempted; the
    /// first failure is returned.
    pub async fn shutdown(&self) -> Result<(), CastError> {
        let renderer = self.renderer.close();
        if let Err(e) = &renderer {
            warn!(error = %e, "failed to release renderer");
        }
        let transport = self.transport.close().await.map_err(CastError::from);
        if let Err(e) = &transport {
            warn!(error = %e, "failed to release transport");
        }
        renderer.and(transport)
    }
}

/// Render exactly one frame on a blocking worker.
async fn render_one(renderer: Arc<dyn FrameRenderer>, scene: Scene) -> Result<Frame, CastError> {
    let (width, height) = renderer.dimensions();
    let frame = tokio::task::spawn_blocking(move || renderer.render(&scene))
        .await
        .map_err(|e| CastError::Render(format!("render task failed: {e}")))?
        .ok_or_else(|| CastError::Render("renderer produced no frame".to_owned()))?;
    if !frame.has_size(width, height) {
        return Err(CastError::Render(format!(
            "frame is {}x{}, expected {width}x{height}",
            frame.width, frame.height
        )));
    }
    Ok(frame)
}

#[async_trait]
impl Target for ImageTarget {
    async fn update(&self, state: Arc<ViewState>) -> Result<(), TargetError> {
        self.show(&state).await.map_err(TargetError::from)
    }

    async fn close(&self) -> Result<(), TargetError> {
        self.shutdown().await.map_err(TargetError::from)
    }

    fn name(&self) -> String {
        format!("SmartTV({})", self.device.name)
    }
}
