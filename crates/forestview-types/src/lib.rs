//! Shared type definitions for the Forestview viewer.
//!
//! This crate is the single source of truth for the visualization model
//! that flows from a state provider through the viewer to every output
//! target. The JSON wire types flow downstream to `TypeScript` via
//! `ts-rs` for the browser client.
//!
//! # Modules
//!
//! - [`view`] -- The immutable [`ViewState`] snapshot and its parts
//! - [`wire`] -- JSON projection served by the web target

pub mod view;
pub mod wire;

// Re-export all public types at crate root for convenience.
pub use view::{LandView, ProcessKind, ProcessView, SummaryView, ViewState};
pub use wire::{LandJson, ProcessJson, SummaryJson, WorldJson};
