//! Test utility functions for pipeline-loader

#![allow(dead_code)]

use async_trait::async_trait;
use pipeline_loader::execution::{DispatchError, DispatchReceipt, DispatchRequest, Executor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// The sample pipeline shipped with the tests
pub const FIXTURE: &str = include_str!("../fixtures/pipeline.yml");

/// Number of step entries in [`FIXTURE`]
pub const FIXTURE_STEPS: usize = 5;

/// Build a minimal valid step entry
pub fn step_yaml(label: &str, command: &str) -> String {
    format!(
        r#"
  - label: "{}"
    command: "{}"
    agents:
      os: linux
    plugins:
      - docker#v3.0.1:
          image: "alpine:3.20"
"#,
        label, command
    )
}

/// Wrap step entries into a document
pub fn document(steps: &[String]) -> String {
    format!("steps:{}", steps.concat())
}

/// Mock executor that records every request it receives
pub struct MockExecutor {
    received: Arc<Mutex<Vec<DispatchRequest>>>,
    reject: Vec<String>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    simulate_delay: Option<std::time::Duration>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self {
            received: Arc::new(Mutex::new(Vec::new())),
            reject: Vec::new(),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            simulate_delay: None,
        }
    }

    /// Reject requests for the given label
    pub fn rejecting(mut self, label: &str) -> Self {
        self.reject.push(label.to_string());
        self
    }

    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.simulate_delay = Some(delay);
        self
    }

    pub fn received(&self) -> Vec<DispatchRequest> {
        self.received.lock().unwrap().clone()
    }

    pub fn received_labels(&self) -> Vec<String> {
        self.received().into_iter().map(|r| r.label).collect()
    }

    /// Highest number of concurrent dispatches observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchReceipt, DispatchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.simulate_delay {
            tokio::time::sleep(delay).await;
        }

        self.received.lock().unwrap().push(request.clone());
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.reject.contains(&request.label) {
            return Err(DispatchError::Rejected(format!(
                "MockExecutor: rejected '{}'",
                request.label
            )));
        }

        Ok(DispatchReceipt::for_request(request))
    }
}
