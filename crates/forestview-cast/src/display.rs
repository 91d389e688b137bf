//! Display target assembly from configuration.
//!
//! Discovers one display through the given transport and builds the image
//! and video targets the `display` and `video` sections enable. Both share
//! one [`TileRenderer`] sized by `display.width` x `display.height`.

use std::sync::Arc;

use forestview_core::{ForestviewConfig, Target};
use tracing::{info, warn};

use crate::error::CastError;
use crate::image::ImageTarget;
use crate::render::{FrameRenderer, TileRenderer};
use crate::transport::{CastTransport, Device, discover_first};
use crate::video::VideoTarget;

/// Targets built for the discovered display.
#[derive(Default)]
pub struct DisplayTargets {
    /// The display the targets drive, if one was found.
    pub device: Option<Device>,
    /// Renderer shared by the built targets.
    pub renderer: Option<Arc<dyn FrameRenderer>>,
    /// Still-image target, when `display.enabled`.
    pub image: Option<Arc<ImageTarget>>,
    /// Video target, when `video.enabled`. Streaming is started by the
    /// caller through [`VideoTarget::start`].
    pub video: Option<Arc<VideoTarget>>,
}

impl DisplayTargets {
    /// Every built target, image first.
    pub fn targets(&self) -> Vec<Arc<dyn Target>> {
        let image = self.image.iter().map(|t| Arc::clone(t) as Arc<dyn Target>);
        let video = self.video.iter().map(|t| Arc::clone(t) as Arc<dyn Target>);
        image.chain(video).collect()
    }

    /// Whether no target was built.
    pub const fn is_empty(&self) -> bool {
        self.image.is_none() && self.video.is_none()
    }
}

/// Discover the first display and build the enabled targets for it.
///
/// Nothing is discovered when neither output is enabled. Finding no
/// display is not an error: the result is simply empty.
///
/// # Errors
///
/// [`CastError::Transport`] when discovery itself fails.
pub async fn display_targets(
    config: &ForestviewConfig,
    transport: Arc<dyn CastTransport>,
) -> Result<DisplayTargets, CastError> {
    if !config.display.enabled && !config.video.enabled {
        return Ok(DisplayTargets::default());
    }

    let timeout = config.display.discovery_timeout();
    info!(timeout_ms = config.display.discovery_timeout_ms, "discovering displays");
    let Some(device) = discover_first(transport.as_ref(), timeout).await? else {
        warn!("no display found, display output disabled");
        return Ok(DisplayTargets::default());
    };

    let renderer: Arc<dyn FrameRenderer> = Arc::new(TileRenderer::new(
        config.display.width,
        config.display.height,
    ));

    let image = config.display.enabled.then(|| {
        Arc::new(ImageTarget::from_config(
            device.clone(),
            Arc::clone(&renderer),
            Arc::clone(&transport),
            &config.display,
        ))
    });
    let video = config.video.enabled.then(|| {
        Arc::new(VideoTarget::from_config(
            device.clone(),
            Arc::clone(&renderer),
            Arc::clone(&transport),
            &config.video,
        ))
    });

    Ok(DisplayTargets {
        device: Some(device),
        renderer: Some(renderer),
        image,
        video,
    })
}
