//! Forestview viewer daemon.
//!
//! Loads `forestview.yaml` (or the file named by `FORESTVIEW_CONFIG`),
//! picks a state provider, registers the enabled output targets, and runs
//! the periodic refresh loop until Ctrl-C.
//!
//! ```text
//! StateProvider --> Viewer --+--> WebTarget  (GET /api/viewmodel)
//!                            +--> SmartTV     (still image push)
//!                            +--> VideoTarget (encoded stream)
//! ```
//!
//! Display and video targets are built by [`display_targets`] once a cast
//! transport is supplied. This binary ships none, so enabling them only
//! logs a warning.

mod demo;
mod error;

use std::path::PathBuf;
use std::sync::Arc;

use forestview_cast::{CastTransport, VideoTarget, display_targets};
use forestview_core::{ForestviewConfig, JsonFileStateProvider, StateProvider, Target, Viewer};
use forestview_web::WebTarget;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::demo::DemoStateProvider;
use crate::error::AppError;

/// Config file read when `FORESTVIEW_CONFIG` is unset.
const DEFAULT_CONFIG_FILE: &str = "forestview.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, the first
/// refresh fails, or targets fail to close on shutdown.
#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = load_config()?;

    // RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        refresh_interval_ms = config.viewer.refresh_interval_ms,
        web_enabled = config.web.enabled,
        "forestview-viewer starting"
    );

    let viewer = Viewer::new(config.viewer.options());
    viewer.set_state_provider(state_provider(&config)).await;

    if config.web.enabled {
        let web = Arc::new(WebTarget::from_config(&config.web));
        info!(url = %web.url().await, "web target registered");
        viewer.add_target(web).await;
    }
    let video = attach_displays(&viewer, &config, None).await;
    if viewer.target_count().await == 0 {
        warn!("no targets enabled, snapshots will be fetched and dropped");
    }

    let shutdown = CancellationToken::new();
    if let Err(e) = viewer.start(&shutdown).await {
        error!(error = %e, "initial refresh failed");
        if let Err(close) = viewer.close().await {
            warn!(error = %close, "cleanup after failed start");
        }
        return Err(e.into());
    }
    if let Some(video) = video {
        let token = shutdown.child_token();
        tokio::spawn(async move {
            match video.start(&token).await {
                Ok(url) => info!(%url, "video stream cast"),
                Err(e) => warn!(error = %e, "video stream failed"),
            }
        });
    }
    info!("viewer running, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    shutdown.cancel();

    viewer.close().await?;
    info!("forestview-viewer stopped");
    Ok(())
}

/// Read the config file if present, defaults otherwise.
///
/// An explicitly named file must exist; the default file is optional.
fn load_config() -> Result<ForestviewConfig, AppError> {
    match std::env::var_os("FORESTVIEW_CONFIG") {
        Some(path) => Ok(ForestviewConfig::from_file(&PathBuf::from(path))?),
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if path.exists() {
                Ok(ForestviewConfig::from_file(&path)?)
            } else {
                Ok(ForestviewConfig::parse("{}")?)
            }
        }
    }
}

/// Register display targets for the first discovered display.
///
/// Returns the video target so the caller can start streaming once the
/// viewer holds a snapshot. Discovery failures leave the web target alone.
async fn attach_displays(
    viewer: &Viewer,
    config: &ForestviewConfig,
    transport: Option<Arc<dyn CastTransport>>,
) -> Option<Arc<VideoTarget>> {
    if !config.display.enabled && !config.video.enabled {
        return None;
    }
    let Some(transport) = transport else {
        warn!(
            display = config.display.enabled,
            video = config.video.enabled,
            "no cast transport available, display output disabled"
        );
        return None;
    };

    match display_targets(config, transport).await {
        Ok(built) => {
            for target in built.targets() {
                info!(target = %target.name(), "display target registered");
                viewer.add_target(target).await;
            }
            built.video
        }
        Err(e) => {
            warn!(error = %e, "display discovery failed, continuing without displays");
            None
        }
    }
}

fn state_provider(config: &ForestviewConfig) -> Arc<dyn StateProvider> {
    match &config.state.file {
        Some(path) => {
            info!(path = %path.display(), "reading snapshots from file");
            Arc::new(JsonFileStateProvider::new(path.clone()))
        }
        None => {
            info!("no state file configured, using demo snapshots");
            Arc::new(DemoStateProvider::new())
        }
    }
}
