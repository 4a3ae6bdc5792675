//! Scheduling strategies for handing requests to an executor

use std::fmt;

/// Strategy for dispatching requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulingStrategy {
    /// One request at a time, in pipeline order
    #[default]
    Sequential,

    /// All requests at once
    Parallel,

    /// At most N requests in flight
    LimitedParallel(usize),
}

impl SchedulingStrategy {
    /// Maximum number of requests in flight, `None` for unbounded
    pub fn concurrency_limit(&self) -> Option<usize> {
        match self {
            SchedulingStrategy::Sequential => Some(1),
            SchedulingStrategy::Parallel => None,
            SchedulingStrategy::LimitedParallel(max) => Some((*max).max(1)),
        }
    }
}

impl fmt::Display for SchedulingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulingStrategy::Sequential => write!(f, "sequential"),
            SchedulingStrategy::Parallel => write!(f, "parallel"),
            SchedulingStrategy::LimitedParallel(max) => write!(f, "parallel-limited({})", max),
        }
    }
}
