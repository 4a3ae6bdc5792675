//! pipeline-loader - loads, validates and dispatches CI pipeline definitions

pub mod cli;
pub mod core;
pub mod execution;

// Re-export commonly used types
pub use crate::core::{load, LoadError, LoadErrors, LoaderOptions, Pipeline, PipelineLoader, Step};
pub use execution::{DispatchRequest, Dispatcher, Executor, SchedulingStrategy};
