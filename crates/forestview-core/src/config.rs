//! Configuration loading and typed config structures for forestview.
//!
//! The configuration lives in `forestview.yaml`. Every field has a default,
//! so an empty (or missing) file yields a working web-only viewer.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::viewer::ViewerOptions;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ForestviewConfig {
    /// Refresh loop settings.
    #[serde(default)]
    pub viewer: ViewerConfig,

    /// Browser-facing JSON API.
    #[serde(default)]
    pub web: WebConfig,

    /// Still-image smart display output.
    #[serde(default)]
    pub display: DisplayConfig,

    /// Streamed video output.
    #[serde(default)]
    pub video: VideoConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Where snapshots come from.
    #[serde(default)]
    pub state: StateConfig,
}

impl ForestviewConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for the web surface:
    /// - `FORESTVIEW_LISTEN` overrides `web.listen_address`
    /// - `FORESTVIEW_WEB_DIR` overrides `web.static_dir`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.web.apply_env_overrides();
        Ok(config)
    }
}

/// Refresh loop configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ViewerConfig {
    /// Milliseconds between periodic refreshes.
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
}

impl ViewerConfig {
    /// Viewer options derived from this section.
    pub const fn options(&self) -> ViewerOptions {
        ViewerOptions {
            refresh_interval: Duration::from_millis(self.refresh_interval_ms),
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
        }
    }
}

/// Web/JSON target configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebConfig {
    /// Whether the web target is registered.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Address the HTTP listener binds to.
    #[serde(default = "default_listen_address")]
    pub listen_address: SocketAddr,

    /// Directory of browser client assets served at `/`. When absent a
    /// built-in status page is served instead.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    /// Milliseconds to wait for in-flight requests on shutdown.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl WebConfig {
    /// Override web settings with environment variables when set.
    ///
    /// An unparsable `FORESTVIEW_LISTEN` is ignored and the YAML value kept.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("FORESTVIEW_LISTEN") {
            match val.parse() {
                Ok(addr) => self.listen_address = addr,
                Err(e) => tracing::warn!(value = %val, error = %e, "ignoring FORESTVIEW_LISTEN"),
            }
        }
        if let Ok(val) = std::env::var("FORESTVIEW_WEB_DIR") {
            self.static_dir = Some(PathBuf::from(val));
        }
    }

    /// Shutdown grace period as a [`Duration`].
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            listen_address: default_listen_address(),
            static_dir: None,
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

/// Still-image display configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DisplayConfig {
    /// Whether an image target is registered.
    #[serde(default)]
    pub enabled: bool,

    /// Re-encode through ImageMagick for displays that reject plain
    /// ffmpeg JPEG output.
    #[serde(default = "default_true")]
    pub use_compatibility_format: bool,

    /// Rendered frame width in pixels.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Rendered frame height in pixels.
    #[serde(default = "default_height")]
    pub height: u32,

    /// Milliseconds to spend discovering displays.
    #[serde(default = "default_discovery_timeout_ms")]
    pub discovery_timeout_ms: u64,
}

impl DisplayConfig {
    /// Discovery timeout as a [`Duration`].
    pub const fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            use_compatibility_format: default_true(),
            width: default_width(),
            height: default_height(),
            discovery_timeout_ms: default_discovery_timeout_ms(),
        }
    }
}

/// Video stream configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VideoConfig {
    /// Whether a video target is registered.
    #[serde(default)]
    pub enabled: bool,

    /// Frames per second of the generated video.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    /// Length of the generated video in seconds.
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u32,

    /// Port of the listener serving the encoded file.
    #[serde(default = "default_stream_port")]
    pub stream_port: u16,

    /// Title shown on the display while casting.
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            frame_rate: default_frame_rate(),
            duration_secs: default_duration_secs(),
            stream_port: default_stream_port(),
            title: default_title(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Snapshot source configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StateConfig {
    /// JSON file holding a `ViewState`, re-read on every refresh. The
    /// animated demo state is used when absent.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

const fn default_refresh_interval_ms() -> u64 {
    1000
}

const fn default_true() -> bool {
    true
}

fn default_listen_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

const fn default_shutdown_grace_ms() -> u64 {
    5000
}

const fn default_width() -> u32 {
    1920
}

const fn default_height() -> u32 {
    1080
}

const fn default_discovery_timeout_ms() -> u64 {
    5000
}

const fn default_frame_rate() -> u32 {
    10
}

const fn default_duration_secs() -> u32 {
    60
}

const fn default_stream_port() -> u16 {
    8889
}

fn default_title() -> String {
    "forestview".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_web_only() {
        let config = ForestviewConfig::default();
        assert!(config.web.enabled);
        assert!(!config.display.enabled);
        assert!(!config.video.enabled);
        assert_eq!(config.viewer.refresh_interval_ms, 1000);
        assert_eq!(config.web.listen_address.port(), 8080);
        assert_eq!(config.video.stream_port, 8889);
        assert_eq!(config.display.width, 1920);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.viewer.options(), ViewerOptions::default());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
viewer:
  refresh_interval_ms: 250

web:
  enabled: false
  listen_address: "127.0.0.1:9000"
  static_dir: "web/dist"
  shutdown_grace_ms: 1000

display:
  enabled: true
  use_compatibility_format: false
  width: 1280
  height: 720
  discovery_timeout_ms: 2000

video:
  enabled: true
  frame_rate: 25
  duration_secs: 10
  stream_port: 9999
  title: "cluster"

logging:
  level: "debug"

state:
  file: "/tmp/state.json"
"#;

        let config = ForestviewConfig::parse(yaml);
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.viewer.options().refresh_interval, Duration::from_millis(250));
        assert!(!config.web.enabled);
        assert_eq!(config.web.static_dir, Some(PathBuf::from("web/dist")));
        assert_eq!(config.web.shutdown_grace(), Duration::from_secs(1));
        assert!(config.display.enabled);
        assert!(!config.display.use_compatibility_format);
        assert_eq!(config.display.height, 720);
        assert_eq!(config.display.discovery_timeout(), Duration::from_secs(2));
        assert_eq!(config.video.frame_rate, 25);
        assert_eq!(config.video.title, "cluster");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.state.file, Some(PathBuf::from("/tmp/state.json")));
    }

    #[test]
    fn parse_minimal_yaml() {
        let yaml = "video:\n  frame_rate: 30\n";
        let config = ForestviewConfig::parse(yaml);
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        // Frame rate is overridden
        assert_eq!(config.video.frame_rate, 30);
        // Everything else uses defaults
        assert_eq!(config.video.duration_secs, 60);
        assert!(config.web.enabled);
    }

    #[test]
    fn parse_empty_yaml() {
        let config = ForestviewConfig::parse("");
        assert!(config.is_ok());
    }

    #[test]
    fn rejects_bad_listen_address() {
        let config = ForestviewConfig::parse("web:\n  listen_address: \"not an address\"\n");
        assert!(matches!(config, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn missing_file_is_io_error() {
        let config = ForestviewConfig::from_file(Path::new("/nonexistent/forestview.yaml"));
        assert!(matches!(config, Err(ConfigError::Io { .. })));
    }
}
