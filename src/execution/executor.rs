//! Executors - the external collaborators that receive dispatch requests

use crate::execution::request::DispatchRequest;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

/// Error types for dispatch operations
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Acknowledgement that an executor accepted a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReceipt {
    pub request_id: Uuid,
    pub label: String,
    pub accepted_at: DateTime<Utc>,
}

impl DispatchReceipt {
    pub fn for_request(request: &DispatchRequest) -> Self {
        Self {
            request_id: request.id,
            label: request.label.clone(),
            accepted_at: Utc::now(),
        }
    }
}

/// Trait for step executors - allows for different implementations
#[async_trait]
pub trait Executor: Send + Sync {
    /// Hand one request to the executor
    async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchReceipt, DispatchError>;
}

/// Writes each request as one JSON line, for an external runner to consume
pub struct JsonLinesExecutor<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesExecutor<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl JsonLinesExecutor<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

#[async_trait]
impl<W: Write + Send> Executor for JsonLinesExecutor<W> {
    async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchReceipt, DispatchError> {
        let line = serde_json::to_string(request)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| DispatchError::Internal("writer lock poisoned".to_string()))?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(DispatchReceipt::for_request(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::load;

    #[tokio::test]
    async fn test_json_lines_executor_writes_one_line_per_request() {
        let yaml = r#"
steps:
  - label: "a"
    command: "echo a"
    agents: { os: linux }
    plugins:
      - docker: { image: "alpine:3" }
  - label: "b"
    command: "echo b"
    agents: { os: linux }
    plugins:
      - docker: { image: "alpine:3" }
"#;
        let pipeline = load(yaml).unwrap();
        let executor = JsonLinesExecutor::new(Vec::new());

        for request in DispatchRequest::for_pipeline(&pipeline) {
            let receipt = executor.dispatch(&request).await.unwrap();
            assert_eq!(receipt.request_id, request.id);
        }

        let output = String::from_utf8(executor.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: DispatchRequest = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.label, "a");
    }
}
