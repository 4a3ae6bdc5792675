//! Load and validation error types

use std::fmt;
use thiserror::Error;

/// A single problem found while loading a pipeline document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The document (index `None`) or one step entry could not be parsed
    #[error("{}", parse_message(.index, .message))]
    ParseError {
        index: Option<usize>,
        message: String,
    },

    #[error("Step {index}: missing required field '{field}'")]
    MissingField { index: usize, field: String },

    #[error("Step {index}: label '{label}' is already used by step {first_index}")]
    DuplicateLabel {
        index: usize,
        first_index: usize,
        label: String,
    },

    #[error("Step {index} ('{label}'): commands must not be empty")]
    EmptyCommandList { index: usize, label: String },

    #[error("Step {index} ('{label}'): agents must contain at least one constraint")]
    NoAgentConstraint { index: usize, label: String },
}

fn parse_message(index: &Option<usize>, message: &str) -> String {
    match index {
        Some(index) => format!("Step {}: parse error: {}", index, message),
        None => format!("Parse error: {}", message),
    }
}

impl LoadError {
    /// Index of the step the error belongs to, if any
    pub fn step_index(&self) -> Option<usize> {
        match self {
            LoadError::ParseError { index, .. } => *index,
            LoadError::MissingField { index, .. }
            | LoadError::DuplicateLabel { index, .. }
            | LoadError::EmptyCommandList { index, .. }
            | LoadError::NoAgentConstraint { index, .. } => Some(*index),
        }
    }

    pub(crate) fn document(message: impl Into<String>) -> Self {
        LoadError::ParseError {
            index: None,
            message: message.into(),
        }
    }
}

/// Every problem found in one load, in document order. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadErrors(Vec<LoadError>);

impl LoadErrors {
    pub(crate) fn new(errors: Vec<LoadError>) -> Self {
        debug_assert!(!errors.is_empty());
        Self(errors)
    }

    pub fn errors(&self) -> &[LoadError] {
        &self.0
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LoadError> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<LoadError> {
        self.0
    }
}

impl From<LoadError> for LoadErrors {
    fn from(error: LoadError) -> Self {
        Self(vec![error])
    }
}

impl<'a> IntoIterator for &'a LoadErrors {
    type Item = &'a LoadError;
    type IntoIter = std::slice::Iter<'a, LoadError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for LoadErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pipeline has {} error(s)", self.0.len())?;
        for error in &self.0 {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for LoadErrors {}
