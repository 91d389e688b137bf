//! Smart display output targets for the Forestview viewer.
//!
//! Two targets drive network displays through a [`CastTransport`]:
//!
//! - [`ImageTarget`] renders each snapshot to one still image and pushes
//!   it when it differs from the last push.
//! - [`VideoTarget`] renders a fixed-length video of the latest snapshot
//!   through an external encoder, serves it over HTTP, and points the
//!   display at it.
//!
//! [`display_targets`] discovers a display and builds both targets from
//! configuration.
//!
//! Pixel rendering sits behind [`FrameRenderer`]; [`TileRenderer`] is the
//! built-in software implementation.
//!
//! [`CastTransport`]: transport::CastTransport
//! [`ImageTarget`]: image::ImageTarget
//! [`VideoTarget`]: video::VideoTarget
//! [`FrameRenderer`]: render::FrameRenderer
//! [`TileRenderer`]: render::TileRenderer

pub mod display;
pub mod encode;
pub mod error;
pub mod image;
pub mod net;
pub mod render;
pub mod transport;
pub mod video;

pub use display::{DisplayTargets, display_targets};
pub use encode::{CompatibleJpegEncoder, DirectJpegEncoder, EncoderCommand, StillEncoder};
pub use error::{CastError, EncodeError, TransportError};
pub use image::ImageTarget;
pub use render::{Frame, FrameRenderer, TileRenderer};
pub use transport::{CastTransport, Device, discover_first};
pub use video::{PipelineStage, VideoOptions, VideoTarget};
