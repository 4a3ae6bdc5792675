//! Core domain models for pipeline documents
//!
//! This module defines the document shape, the validated step model and
//! the loader that turns one into the other.

pub mod config;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod plugin;
pub mod step;

pub use error::{LoadError, LoadErrors};
pub use loader::{load, LoaderOptions, PipelineLoader, DEFAULT_CONTAINER_PLUGIN};
pub use pipeline::*;
pub use plugin::PluginRef;
pub use step::*;
