//! Error types for plugin authors

use thiserror::Error;

/// Errors raised by plugins during `setup`, `process` or `teardown`.
///
/// The framework propagates these to the caller unmodified.
#[derive(Error, Debug)]
pub enum PluginError {
    /// Input parameters are missing or have the wrong shape
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Lifecycle operation called in the wrong phase
    #[error("Cannot {operation} a plugin in phase {phase}")]
    InvalidState {
        operation: &'static str,
        phase: crate::Phase,
    },

    /// Processing stopped because the plugin was aborted
    #[error("Plugin aborted")]
    Aborted,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Custom error with message
    #[error("{0}")]
    Custom(String),
}

impl PluginError {
    /// Create a custom error with a message
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

/// A type or name that cannot serve as a registry key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// No namespace path in front of the simple name
    #[error("Plugin name '{name}' is not fully qualified")]
    Unqualified { name: String },

    /// A segment is not an identifier (closure, fn pointer, empty segment)
    #[error("Cannot derive a plugin name from '{name}'")]
    Malformed { name: String },
}
