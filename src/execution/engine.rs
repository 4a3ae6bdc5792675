//! Dispatcher - hands a pipeline's requests to an executor

use crate::{
    core::Pipeline,
    execution::{
        executor::{DispatchError, DispatchReceipt, Executor},
        request::DispatchRequest,
        scheduler::SchedulingStrategy,
    },
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Events that can occur during a dispatch run
#[derive(Debug, Clone)]
pub enum DispatchEvent {
    RunStarted {
        run_id: Uuid,
        total: usize,
        strategy: SchedulingStrategy,
    },
    RequestStarted {
        sequence: usize,
        label: String,
    },
    RequestDispatched {
        sequence: usize,
        label: String,
        request_id: Uuid,
    },
    RequestFailed {
        sequence: usize,
        label: String,
        error: String,
    },
    RunFinished {
        run_id: Uuid,
        dispatched: usize,
        failed: usize,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(DispatchEvent) + Send + Sync>;

/// A request the executor did not accept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchFailure {
    pub sequence: usize,
    pub label: String,
    pub error: String,
}

/// Outcome of one dispatch run, ordered by sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchReport {
    pub run_id: Uuid,
    pub receipts: Vec<DispatchReceipt>,
    pub failures: Vec<DispatchFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DispatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total(&self) -> usize {
        self.receipts.len() + self.failures.len()
    }
}

/// Hands dispatch requests to an executor.
///
/// Every request is dispatched exactly once. Nothing is retried here: the
/// `retry_automatic` flag travels with the request for the executor to honor.
pub struct Dispatcher<E> {
    executor: Arc<E>,
    strategy: SchedulingStrategy,
    event_handlers: Vec<EventHandler>,
}

impl<E: Executor + 'static> Dispatcher<E> {
    pub fn new(executor: E, strategy: SchedulingStrategy) -> Self {
        Self::with_shared(Arc::new(executor), strategy)
    }

    /// Use an executor the caller keeps a handle to
    pub fn with_shared(executor: Arc<E>, strategy: SchedulingStrategy) -> Self {
        Self {
            executor,
            strategy,
            event_handlers: Vec::new(),
        }
    }

    pub fn strategy(&self) -> SchedulingStrategy {
        self.strategy
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(DispatchEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    /// Dispatch one request per pipeline step
    pub async fn dispatch_pipeline(&self, pipeline: &Pipeline) -> DispatchReport {
        self.dispatch(DispatchRequest::for_pipeline(pipeline)).await
    }

    /// Dispatch every request according to the strategy
    pub async fn dispatch(&self, requests: Vec<DispatchRequest>) -> DispatchReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let handlers: Arc<[EventHandler]> = self.event_handlers.clone().into();

        info!(
            "Starting dispatch run {} ({} requests, {})",
            run_id,
            requests.len(),
            self.strategy
        );
        emit(
            &handlers,
            DispatchEvent::RunStarted {
                run_id,
                total: requests.len(),
                strategy: self.strategy,
            },
        );

        let results = match self.strategy.concurrency_limit() {
            Some(1) => self.dispatch_sequential(requests, &handlers).await,
            limit => self.dispatch_concurrent(requests, limit, &handlers).await,
        };

        let mut receipts = Vec::new();
        let mut failures = Vec::new();
        for (sequence, label, result) in results {
            match result {
                Ok(receipt) => receipts.push(receipt),
                Err(error) => failures.push(DispatchFailure {
                    sequence,
                    label,
                    error,
                }),
            }
        }

        info!(
            "Dispatch run {} finished: {} dispatched, {} failed",
            run_id,
            receipts.len(),
            failures.len()
        );
        emit(
            &handlers,
            DispatchEvent::RunFinished {
                run_id,
                dispatched: receipts.len(),
                failed: failures.len(),
            },
        );

        DispatchReport {
            run_id,
            receipts,
            failures,
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn dispatch_sequential(
        &self,
        requests: Vec<DispatchRequest>,
        handlers: &Arc<[EventHandler]>,
    ) -> Vec<(usize, String, Result<DispatchReceipt, String>)> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            let result = dispatch_one(self.executor.as_ref(), &request, handlers).await;
            results.push((request.sequence, request.label, result));
        }
        results
    }

    async fn dispatch_concurrent(
        &self,
        requests: Vec<DispatchRequest>,
        limit: Option<usize>,
        handlers: &Arc<[EventHandler]>,
    ) -> Vec<(usize, String, Result<DispatchReceipt, String>)> {
        let semaphore = limit.map(|n| Arc::new(Semaphore::new(n)));

        let mut handles = Vec::with_capacity(requests.len());
        for request in requests {
            let executor = Arc::clone(&self.executor);
            let handlers = Arc::clone(handlers);
            let semaphore = semaphore.clone();
            let sequence = request.sequence;
            let label = request.label.clone();

            let handle = tokio::spawn(async move {
                let _permit = match semaphore {
                    Some(semaphore) => match semaphore.acquire_owned().await {
                        Ok(permit) => Some(permit),
                        Err(e) => {
                            let error = DispatchError::Internal(format!(
                                "dispatch slot unavailable: {}",
                                e
                            ));
                            return fail(&handlers, request.sequence, &request.label, error);
                        }
                    },
                    None => None,
                };
                dispatch_one(executor.as_ref(), &request, &handlers).await
            });
            handles.push((sequence, label, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (sequence, label, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    let error = DispatchError::Internal(format!("dispatch task failed: {}", e));
                    fail(handlers, sequence, &label, error)
                }
            };
            results.push((sequence, label, result));
        }
        results
    }
}

async fn dispatch_one<E: Executor + ?Sized>(
    executor: &E,
    request: &DispatchRequest,
    handlers: &[EventHandler],
) -> Result<DispatchReceipt, String> {
    debug!(sequence = request.sequence, label = %request.label, "dispatching");
    emit(
        handlers,
        DispatchEvent::RequestStarted {
            sequence: request.sequence,
            label: request.label.clone(),
        },
    );

    match executor.dispatch(request).await {
        Ok(receipt) => {
            emit(
                handlers,
                DispatchEvent::RequestDispatched {
                    sequence: request.sequence,
                    label: request.label.clone(),
                    request_id: receipt.request_id,
                },
            );
            Ok(receipt)
        }
        Err(e) => fail(handlers, request.sequence, &request.label, e),
    }
}

/// Report a request that was not dispatched to the handlers and the caller alike
fn fail(
    handlers: &[EventHandler],
    sequence: usize,
    label: &str,
    error: DispatchError,
) -> Result<DispatchReceipt, String> {
    warn!("Dispatch of step '{}' failed: {}", label, error);
    let error = error.to_string();
    emit(
        handlers,
        DispatchEvent::RequestFailed {
            sequence,
            label: label.to_string(),
            error: error.clone(),
        },
    );
    Err(error)
}

fn emit(handlers: &[EventHandler], event: DispatchEvent) {
    for handler in handlers {
        handler(event.clone());
    }
}
