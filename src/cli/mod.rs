//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{DispatchCommand, FmtCommand, PlanCommand, ValidateCommand};
use std::ffi::OsString;

/// Pipeline definition loader
#[derive(Debug, Parser, Clone)]
#[command(name = "pipeline-loader")]
#[command(author = "Pipeline Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Load, validate and dispatch CI pipeline definitions", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Name of the plugin carrying the container spec
    #[arg(long, global = true, default_value = crate::core::DEFAULT_CONTAINER_PLUGIN)]
    pub container_plugin: String,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Validate a pipeline definition
    Validate(ValidateCommand),

    /// Show the dispatch requests a pipeline produces
    Plan(PlanCommand),

    /// Hand every step to the executor as JSON lines on stdout
    Dispatch(DispatchCommand),

    /// Print the normalized pipeline definition
    Fmt(FmtCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }

    /// Loader options derived from the global flags
    pub fn loader_options(&self) -> crate::core::LoaderOptions {
        crate::core::LoaderOptions::new().with_container_plugin(self.container_plugin.clone())
    }
}
