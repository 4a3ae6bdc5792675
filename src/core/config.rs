//! Pipeline document shape as read from and written to YAML

use crate::core::error::LoadError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// Top-level pipeline document as loaded from YAML.
///
/// Steps are kept as raw values so that each entry can be parsed, and fail,
/// on its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Agent constraints applied beneath every step's own `agents`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub agents: BTreeMap<String, Value>,

    /// Environment applied beneath every step's own `env`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, Value>,

    /// Raw step entries, in document order
    pub steps: Vec<Value>,
}

impl PipelineConfig {
    /// Parse the document envelope. Step entries are not inspected here.
    pub fn from_yaml(yaml: &str) -> Result<Self, LoadError> {
        serde_yaml::from_str(yaml).map_err(|e| LoadError::document(e.to_string()))
    }
}

/// A single step entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Alias of `commands`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<CommandValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agents: Option<BTreeMap<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, Value>>,

    /// Plugin entries: `name#version` strings or single-key mappings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Vec<Value>>,
}

/// A step field whose value has the wrong shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl StepConfig {
    /// Parse a step entry one field at a time.
    ///
    /// A field that fails to parse is left unset and reported, so the rest of
    /// the entry can still be checked. Only a non-mapping entry fails outright.
    pub fn from_value(value: &Value) -> Result<(Self, Vec<FieldError>), String> {
        let Some(map) = value.as_mapping() else {
            return Err("step entry must be a mapping".to_string());
        };

        let mut bad = Vec::new();
        let label = match map.get("label") {
            None | Some(Value::Null) => None,
            Some(value) => {
                let label = scalar_to_string(value);
                if label.is_none() {
                    bad.push(FieldError {
                        field: "label",
                        message: "must be a scalar value".to_string(),
                    });
                }
                label
            }
        };

        let config = StepConfig {
            label,
            command: field(map, "command", &mut bad),
            commands: field(map, "commands", &mut bad),
            retry: field(map, "retry", &mut bad),
            agents: field(map, "agents", &mut bad),
            env: field(map, "env", &mut bad),
            plugins: field(map, "plugins", &mut bad),
        };
        Ok((config, bad))
    }
}

fn field<T: DeserializeOwned>(
    map: &Mapping,
    name: &'static str,
    bad: &mut Vec<FieldError>,
) -> Option<T> {
    let value = map.get(name).filter(|v| !v.is_null())?;
    match serde_yaml::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            bad.push(FieldError {
                field: name,
                message: e.to_string(),
            });
            None
        }
    }
}

/// Commands given either as one string or as a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandValue {
    Single(String),
    List(Vec<String>),
}

impl CommandValue {
    /// Resolve into the ordered command list. Blank commands are dropped in
    /// both forms.
    pub fn into_commands(self) -> Vec<String> {
        let commands = match self {
            CommandValue::Single(command) => vec![command],
            CommandValue::List(commands) => commands,
        };
        commands
            .into_iter()
            .filter(|c| !c.trim().is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automatic: Option<bool>,
}

/// Configuration block of the docker plugin
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DockerPluginConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub always_pull: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub privileged: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tmpfs: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
}

impl DockerPluginConfig {
    /// Parse a plugin config value. A bare plugin reference has no config at all.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_yaml::from_value(value.clone()).map_err(|e| e.to_string())
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Document written back out from validated steps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineDocument {
    pub steps: Vec<StepConfig>,
}

/// Render a scalar YAML value as a string. Sequences, mappings and nulls have no
/// string form.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}
