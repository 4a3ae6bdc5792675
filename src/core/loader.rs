//! Pipeline loader and validator
//!
//! Turns document text into a [`Pipeline`]. Every problem in the document is
//! collected and reported together instead of stopping at the first one.

use crate::core::{
    config::{scalar_to_string, DockerPluginConfig, PipelineConfig, StepConfig},
    error::{LoadError, LoadErrors},
    pipeline::Pipeline,
    plugin::PluginEntry,
    step::{ContainerSpec, RetryPolicy, Step},
};
use anyhow::{Context, Result};
use serde_yaml::Value;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// Plugin that carries container launch parameters unless configured otherwise
pub const DEFAULT_CONTAINER_PLUGIN: &str = "docker";

/// Options controlling how documents are interpreted
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Name of the plugin holding the container spec
    pub container_plugin: String,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            container_plugin: DEFAULT_CONTAINER_PLUGIN.to_string(),
        }
    }
}

impl LoaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container_plugin(mut self, name: impl Into<String>) -> Self {
        self.container_plugin = name.into();
        self
    }
}

/// Loads and validates pipeline documents
#[derive(Debug, Clone, Default)]
pub struct PipelineLoader {
    options: LoaderOptions,
}

/// Pipeline-level values merged beneath each step
struct Defaults {
    agents: BTreeMap<String, String>,
    env: BTreeMap<String, String>,
}

/// Errors and seen labels accumulated across one load
struct Validation {
    errors: Vec<LoadError>,
    labels: HashMap<String, usize>,
}

impl PipelineLoader {
    pub fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Load a pipeline from a file, or from stdin when `path` is `-`
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<Pipeline> {
        let path = path.as_ref();
        let content = if path == Path::new("-") {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read pipeline from stdin")?;
            buf
        } else {
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?
        };

        Ok(self.load(&content)?)
    }

    /// Parse and validate a pipeline document
    pub fn load(&self, text: &str) -> Result<Pipeline, LoadErrors> {
        let config = PipelineConfig::from_yaml(text)?;

        let mut validation = Validation {
            errors: Vec::new(),
            labels: HashMap::new(),
        };

        let defaults = Defaults {
            agents: document_map(&config.agents, "agents", &mut validation.errors),
            env: document_map(&config.env, "env", &mut validation.errors),
        };

        let mut steps = Vec::with_capacity(config.steps.len());
        for (index, value) in config.steps.iter().enumerate() {
            if let Some(step) = self.check_step(index, value, &defaults, &mut validation) {
                steps.push(step);
            }
        }

        if !validation.errors.is_empty() {
            debug!(errors = validation.errors.len(), "pipeline rejected");
            return Err(LoadErrors::new(validation.errors));
        }

        debug!(steps = steps.len(), "pipeline loaded");
        Ok(Pipeline::new(steps))
    }

    /// Validate one step entry. Returns the step only if it has no errors.
    fn check_step(
        &self,
        index: usize,
        value: &Value,
        defaults: &Defaults,
        validation: &mut Validation,
    ) -> Option<Step> {
        let (config, field_errors) = match StepConfig::from_value(value) {
            Ok(parsed) => parsed,
            Err(message) => {
                validation.errors.push(LoadError::ParseError {
                    index: Some(index),
                    message,
                });
                return None;
            }
        };

        let errors_before = validation.errors.len();
        let errors = &mut validation.errors;

        // Malformed fields are reported once and skip the checks that depend on them
        for bad in &field_errors {
            errors.push(LoadError::ParseError {
                index: Some(index),
                message: format!("{}: {}", bad.field, bad.message),
            });
        }
        let malformed = |field: &str| field_errors.iter().any(|e| e.field == field);

        let label = config
            .label
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string);
        match &label {
            None if malformed("label") => {}
            None => errors.push(missing(index, "label")),
            Some(label) => {
                if let Some(&first_index) = validation.labels.get(label) {
                    errors.push(LoadError::DuplicateLabel {
                        index,
                        first_index,
                        label: label.clone(),
                    });
                } else {
                    validation.labels.insert(label.clone(), index);
                }
            }
        }
        let display_label = label.clone().unwrap_or_else(|| "<unlabeled>".to_string());

        let command_value = match (config.commands, config.command) {
            (Some(commands), Some(_)) => {
                warn!(step = index, "both 'command' and 'commands' given, using 'commands'");
                Some(commands)
            }
            (commands, command) => commands.or(command),
        };
        let commands = match command_value {
            None if malformed("commands") || malformed("command") => Vec::new(),
            None => {
                errors.push(missing(index, "commands"));
                Vec::new()
            }
            Some(value) => {
                let commands = value.into_commands();
                if commands.is_empty() {
                    errors.push(LoadError::EmptyCommandList {
                        index,
                        label: display_label.clone(),
                    });
                }
                commands
            }
        };

        let mut agents = defaults.agents.clone();
        if let Some(step_agents) = &config.agents {
            agents.extend(step_map(index, step_agents, "agents", errors));
        }
        if agents.is_empty() && !malformed("agents") {
            errors.push(LoadError::NoAgentConstraint {
                index,
                label: display_label,
            });
        }

        let mut env = defaults.env.clone();
        if let Some(step_env) = &config.env {
            env.extend(step_map(index, step_env, "env", errors));
        }

        let retry = RetryPolicy {
            automatic: config.retry.and_then(|r| r.automatic).unwrap_or(false),
        };

        let container = if malformed("plugins") {
            None
        } else {
            self.container_spec(index, config.plugins.as_deref(), errors)
        };

        if validation.errors.len() > errors_before {
            return None;
        }

        Some(Step {
            label: label?,
            commands,
            retry,
            agents,
            env,
            container: container?,
        })
    }

    /// Find the container plugin among a step's plugins and build its spec
    fn container_spec(
        &self,
        index: usize,
        plugins: Option<&[Value]>,
        errors: &mut Vec<LoadError>,
    ) -> Option<ContainerSpec> {
        let wanted = self.options.container_plugin.as_str();
        let mut found: Option<PluginEntry> = None;

        for value in plugins.unwrap_or_default() {
            let entry = match PluginEntry::from_value(value) {
                Ok(entry) => entry,
                Err(message) => {
                    errors.push(LoadError::ParseError {
                        index: Some(index),
                        message: format!("plugins: {}", message),
                    });
                    continue;
                }
            };

            if !entry.plugin.is_named(wanted) {
                debug!(step = index, plugin = %entry.plugin, "ignoring plugin");
            } else if found.is_some() {
                warn!(step = index, plugin = %entry.plugin, "ignoring additional container plugin");
            } else {
                found = Some(entry);
            }
        }

        let image_field = format!("plugins.{}.image", wanted);
        let Some(entry) = found else {
            errors.push(missing(index, &image_field));
            return None;
        };

        let docker = match DockerPluginConfig::from_value(&entry.config) {
            Ok(docker) => docker,
            Err(message) => {
                errors.push(LoadError::ParseError {
                    index: Some(index),
                    message: format!("plugins.{}: {}", wanted, message),
                });
                return None;
            }
        };

        let image = docker
            .image
            .as_deref()
            .map(str::trim)
            .filter(|i| !i.is_empty())
            .map(str::to_string);
        let Some(image) = image else {
            errors.push(missing(index, &image_field));
            return None;
        };

        Some(ContainerSpec::from_docker(image, docker, entry.plugin))
    }
}

fn missing(index: usize, field: &str) -> LoadError {
    LoadError::MissingField {
        index,
        field: field.to_string(),
    }
}

/// Stringify a step's mapping, reporting non-scalar values against the step
fn step_map(
    index: usize,
    map: &BTreeMap<String, Value>,
    field: &str,
    errors: &mut Vec<LoadError>,
) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (key, value) in map {
        match scalar_to_string(value) {
            Some(s) => {
                out.insert(key.clone(), s);
            }
            None => errors.push(LoadError::ParseError {
                index: Some(index),
                message: format!("{}.{} must be a scalar value", field, key),
            }),
        }
    }
    out
}

/// Stringify a pipeline-level mapping, reporting non-scalar values against the document
fn document_map(
    map: &BTreeMap<String, Value>,
    field: &str,
    errors: &mut Vec<LoadError>,
) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (key, value) in map {
        match scalar_to_string(value) {
            Some(s) => {
                out.insert(key.clone(), s);
            }
            None => errors.push(LoadError::document(format!(
                "{}.{} must be a scalar value",
                field, key
            ))),
        }
    }
    out
}

/// Load a document with the default options
pub fn load(text: &str) -> Result<Pipeline, LoadErrors> {
    PipelineLoader::default().load(text)
}
