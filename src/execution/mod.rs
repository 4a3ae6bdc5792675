//! Dispatch of validated steps to executors

pub mod engine;
pub mod executor;
pub mod request;
pub mod scheduler;

pub use engine::{DispatchEvent, DispatchFailure, DispatchReport, Dispatcher, EventHandler};
pub use executor::{DispatchError, DispatchReceipt, Executor, JsonLinesExecutor};
pub use request::{ContainerLaunch, DispatchRequest};
pub use scheduler::SchedulingStrategy;
