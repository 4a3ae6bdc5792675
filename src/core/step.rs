//! Step domain model

use crate::core::{
    config::{CommandValue, DockerPluginConfig, RetryConfig, StepConfig},
    plugin::PluginRef,
};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, BTreeSet};

/// A single validated step in a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Unique, human-readable label
    pub label: String,

    /// Shell commands, run in order. Never empty.
    pub commands: Vec<String>,

    pub retry: RetryPolicy,

    /// Constraint key to value, used to pick an execution host. Never empty.
    pub agents: BTreeMap<String, String>,

    /// Environment variables for the step
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    pub container: ContainerSpec,
}

/// Retry behavior, passed through to the executor untouched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub automatic: bool,
}

/// When the executor should pull the container image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PullPolicy {
    Always,
    #[default]
    IfAbsent,
}

impl PullPolicy {
    pub fn from_always_pull(always_pull: bool) -> Self {
        if always_pull {
            PullPolicy::Always
        } else {
            PullPolicy::IfAbsent
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PullPolicy::Always => "always",
            PullPolicy::IfAbsent => "if-absent",
        }
    }
}

/// Container launch parameters for a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Image reference. Never empty.
    pub image: String,

    pub pull_policy: PullPolicy,

    pub privileged: bool,

    /// tmpfs mount specs
    pub mounts: BTreeSet<String>,

    /// Bind-mount specs
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub volumes: BTreeSet<String>,

    /// Plugin these parameters were read from, e.g. `docker#v3.0.1`
    #[serde(skip)]
    pub plugin: Option<PluginRef>,
}

impl ContainerSpec {
    /// Build from a docker plugin config whose image has already been checked
    pub fn from_docker(image: String, config: DockerPluginConfig, plugin: PluginRef) -> Self {
        Self {
            image,
            pull_policy: PullPolicy::from_always_pull(config.always_pull),
            privileged: config.privileged,
            mounts: config.tmpfs.into_iter().collect(),
            volumes: config.volumes.into_iter().collect(),
            plugin: Some(plugin),
        }
    }

    fn to_docker_config(&self) -> DockerPluginConfig {
        DockerPluginConfig {
            image: Some(self.image.clone()),
            always_pull: self.pull_policy == PullPolicy::Always,
            privileged: self.privileged,
            tmpfs: self.mounts.iter().cloned().collect(),
            volumes: self.volumes.iter().cloned().collect(),
        }
    }
}

impl Step {
    /// Convert back to the declarative document form.
    ///
    /// `default_plugin` names the plugin used when the step does not remember
    /// which one it was read from.
    pub fn to_config(&self, default_plugin: &str) -> Result<StepConfig, serde_yaml::Error> {
        let plugin = self
            .container
            .plugin
            .clone()
            .unwrap_or_else(|| PluginRef::new(default_plugin, None));

        let mut entry = Mapping::new();
        entry.insert(
            Value::String(plugin.to_string()),
            serde_yaml::to_value(self.container.to_docker_config())?,
        );

        let to_values = |map: &BTreeMap<String, String>| -> BTreeMap<String, Value> {
            map.iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect()
        };

        Ok(StepConfig {
            label: Some(self.label.clone()),
            command: None,
            commands: Some(CommandValue::List(self.commands.clone())),
            retry: Some(RetryConfig {
                automatic: Some(self.retry.automatic),
            }),
            agents: Some(to_values(&self.agents)),
            env: (!self.env.is_empty()).then(|| to_values(&self.env)),
            plugins: Some(vec![Value::Mapping(entry)]),
        })
    }
}
