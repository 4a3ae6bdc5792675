//! Pipeline domain model

use crate::core::{
    config::PipelineDocument,
    step::Step,
};

/// An ordered, validated sequence of steps.
///
/// Built only by the loader and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    steps: Vec<Step>,
}

impl Pipeline {
    pub(crate) fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// Steps in document order
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Get a step by label
    pub fn step(&self, label: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.label == label)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Step> {
        self.steps.iter()
    }

    /// Convert back to the declarative document form
    pub fn to_document(&self, default_plugin: &str) -> Result<PipelineDocument, serde_yaml::Error> {
        let steps = self
            .steps
            .iter()
            .map(|step| step.to_config(default_plugin))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PipelineDocument { steps })
    }

    /// Serialize to normalized YAML that loads back into an equal pipeline
    pub fn to_yaml(&self, default_plugin: &str) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.to_document(default_plugin)?)
    }
}

impl<'a> IntoIterator for &'a Pipeline {
    type Item = &'a Step;
    type IntoIter = std::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}
