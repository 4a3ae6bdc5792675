//! CLI command definitions

use crate::execution::SchedulingStrategy;
use clap::Args;

/// Validate a pipeline definition
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to pipeline YAML file (`-` for stdin)
    #[arg(short, long)]
    pub file: String,

    /// Output the validated steps in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show dispatch requests without handing them over
#[derive(Debug, Args, Clone)]
pub struct PlanCommand {
    /// Path to pipeline YAML file (`-` for stdin)
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Dispatch every step
#[derive(Debug, Args, Clone)]
pub struct DispatchCommand {
    /// Path to pipeline YAML file (`-` for stdin)
    #[arg(short, long)]
    pub file: String,

    /// Scheduling strategy
    #[arg(long, value_enum, default_value_t = SchedulingStrategyArg::Sequential)]
    pub strategy: SchedulingStrategyArg,

    /// Requests in flight for `parallel-limited`
    #[arg(long, default_value_t = 4)]
    pub max_parallel: usize,
}

impl DispatchCommand {
    pub fn scheduling_strategy(&self) -> SchedulingStrategy {
        match self.strategy {
            SchedulingStrategyArg::Sequential => SchedulingStrategy::Sequential,
            SchedulingStrategyArg::Parallel => SchedulingStrategy::Parallel,
            SchedulingStrategyArg::ParallelLimited => {
                SchedulingStrategy::LimitedParallel(self.max_parallel)
            }
        }
    }
}

/// Print the normalized pipeline definition
#[derive(Debug, Args, Clone)]
pub struct FmtCommand {
    /// Path to pipeline YAML file (`-` for stdin)
    #[arg(short, long)]
    pub file: String,
}

/// Scheduling strategy argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SchedulingStrategyArg {
    Sequential,
    Parallel,
    #[clap(name = "parallel-limited")]
    ParallelLimited,
}
