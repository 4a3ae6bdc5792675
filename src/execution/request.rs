//! Dispatch requests handed to executors

use crate::core::{Pipeline, PullPolicy, Step};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Everything an executor needs to run one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRequest {
    /// Unique id of this request
    pub id: Uuid,

    /// Position of the step in the pipeline, starting at 0
    pub sequence: usize,

    pub label: String,

    /// Commands to run, in order
    pub commands: Vec<String>,

    /// Target-selection constraints for picking a host
    pub constraints: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    pub container: ContainerLaunch,

    /// Whether the executor may retry the step on its own
    pub retry_automatic: bool,
}

/// Container launch parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerLaunch {
    pub image: String,
    pub pull_policy: PullPolicy,
    pub privileged: bool,
    pub mounts: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
}

impl DispatchRequest {
    /// Build the request for the step at `sequence`
    pub fn from_step(step: &Step, sequence: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            sequence,
            label: step.label.clone(),
            commands: step.commands.clone(),
            constraints: step.agents.clone(),
            env: step.env.clone(),
            container: ContainerLaunch {
                image: step.container.image.clone(),
                pull_policy: step.container.pull_policy,
                privileged: step.container.privileged,
                mounts: step.container.mounts.iter().cloned().collect(),
                volumes: step.container.volumes.iter().cloned().collect(),
            },
            retry_automatic: step.retry.automatic,
        }
    }

    /// One request per step, in pipeline order
    pub fn for_pipeline(pipeline: &Pipeline) -> Vec<Self> {
        pipeline
            .iter()
            .enumerate()
            .map(|(sequence, step)| Self::from_step(step, sequence))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::load;

    #[test]
    fn test_requests_follow_pipeline_order() {
        let yaml = r#"
steps:
  - label: "b"
    command: "echo b"
    retry: { automatic: true }
    agents: { os: linux }
    plugins:
      - docker#v3.0.1:
          image: "alpine:3"
          always-pull: true
          tmpfs: ["/tmp"]
  - label: "a"
    command: "echo a"
    agents: { os: linux }
    plugins:
      - docker#v3.0.1: { image: "alpine:3" }
"#;

        let pipeline = load(yaml).unwrap();
        let requests = DispatchRequest::for_pipeline(&pipeline);

        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].label, "b");
        assert_eq!(requests[0].sequence, 0);
        assert!(requests[0].retry_automatic);
        assert_eq!(requests[0].container.pull_policy, PullPolicy::Always);
        assert_eq!(requests[0].container.mounts, vec!["/tmp"]);
        assert_eq!(requests[1].label, "a");
        assert_ne!(requests[0].id, requests[1].id);
    }

    #[test]
    fn test_request_json_shape() {
        let yaml = r#"
steps:
  - label: "a"
    command: "echo a"
    agents: { os: linux }
    plugins:
      - docker: { image: "alpine:3" }
"#;

        let pipeline = load(yaml).unwrap();
        let request = DispatchRequest::from_step(&pipeline.steps()[0], 0);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["container"]["pull_policy"], "if-absent");
        assert_eq!(json["constraints"]["os"], "linux");
        assert!(json.get("env").is_none());
    }
}
