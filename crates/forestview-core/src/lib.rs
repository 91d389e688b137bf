//! State providers, the target protocol, and the fan-out viewer.
//!
//! This crate owns the orchestration core: a [`Viewer`] binds one
//! [`StateProvider`] to any number of [`Target`]s and pushes a single
//! authoritative snapshot to all of them, either on demand or from a
//! cancellable periodic loop. A failing target never stops its siblings.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration for the viewer and its targets.
//! - [`error`] -- Error taxonomy shared by the viewer and all targets.
//! - [`provider`] -- [`StateProvider`] trait and the static, callback,
//!   and JSON-file providers.
//! - [`scene`] -- Projection of a snapshot into renderer scene
//!   descriptors.
//! - [`target`] -- The [`Target`] capability.
//! - [`viewer`] -- The [`Viewer`] fan-out and refresh loop.
//!
//! [`StateProvider`]: provider::StateProvider
//! [`Target`]: target::Target
//! [`Viewer`]: viewer::Viewer

pub mod config;
pub mod error;
pub mod provider;
pub mod scene;
pub mod target;
pub mod viewer;

pub use config::{ConfigError, ForestviewConfig};
pub use error::{ProviderError, TargetError, TargetFailure, TargetFailures, ViewerError};
pub use provider::{CallbackStateProvider, JsonFileStateProvider, StateProvider, StaticStateProvider};
pub use scene::{LandKind, Scene, SceneLand, SceneProcess};
pub use target::Target;
pub use viewer::{Viewer, ViewerOptions};
