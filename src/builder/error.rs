//! Build errors for state trees and machines.

use thiserror::Error;

/// A single problem found in a state configuration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("State under '{parent}' has an empty id")]
    EmptyId { parent: String },

    #[error("State id '{id}' is declared more than once")]
    DuplicateId { id: String },

    #[error("State '{parent}' flags several initial children: {ids:?}")]
    MultipleInitial { parent: String, ids: Vec<String> },

    #[error("Root state '{root}' has no context. Call .context(value) on the root")]
    MissingRootContext { root: String },
}

/// Errors that can occur when building a machine or appending states.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BuildError {
    #[error("Invalid state configuration: {}", describe(.0))]
    InvalidConfig(Vec<ConfigError>),

    #[error("Parent state '{id}' not found")]
    UnknownParent { id: String },
}

impl BuildError {
    /// The individual configuration problems, if any.
    pub fn problems(&self) -> &[ConfigError] {
        match self {
            Self::InvalidConfig(errors) => errors,
            Self::UnknownParent { .. } => &[],
        }
    }
}

fn describe(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
