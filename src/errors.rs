// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SitepipeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Task '{0}' is already registered")]
    DuplicateTask(String),

    #[error("Task not found: {0}")]
    UnknownTask(String),

    #[error("Cycle detected in task graph at '{task}': {}", path.join(" -> "))]
    Cycle { task: String, path: Vec<String> },

    #[error("Task '{task}' failed: {message}")]
    ActionFailure { task: String, message: String },

    /// Non-fatal report from an external collaborator (e.g. a style compile
    /// error). Only ever logged.
    #[error("{collaborator} warning: {message}")]
    CollaboratorWarning {
        collaborator: String,
        message: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SitepipeError {
    /// Errors detected before any task runs.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SitepipeError::ConfigError(_)
                | SitepipeError::DuplicateTask(_)
                | SitepipeError::UnknownTask(_)
                | SitepipeError::Cycle { .. }
                | SitepipeError::TomlError(_)
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SitepipeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_lists_path() {
        let err = SitepipeError::Cycle {
            task: "A".to_string(),
            path: vec!["A".to_string(), "B".to_string(), "A".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Cycle detected in task graph at 'A': A -> B -> A"
        );
        assert!(err.is_configuration());
    }

    #[test]
    fn action_failure_is_runtime() {
        let err = SitepipeError::ActionFailure {
            task: "html".to_string(),
            message: "boom".to_string(),
        };
        assert!(!err.is_configuration());
    }
}
