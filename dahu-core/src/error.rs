//! Error types for discovery, instantiation and configuration

use dahu_plugin_api::{QualifiedName, ResolutionError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while locating or loading plugin modules
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// No plugin directory contains the module
    #[error("No plugin module named '{module}' in any plugin directory")]
    NotFound { module: String },

    /// The module exists but failed to load or register
    #[error("Failed to load plugin module '{module}' from {path}: {reason}")]
    Load {
        module: String,
        path: PathBuf,
        reason: String,
    },

    /// API version mismatch between dahu and the module
    #[error("API version mismatch: dahu expects {expected}, module has {found}")]
    ApiVersionMismatch { expected: u32, found: u32 },

    /// Failed to open the dynamic library or resolve a symbol
    #[error("Failed to load plugin library: {0}")]
    Library(#[from] libloading::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned by [`Factory::instantiate`](crate::Factory::instantiate)
#[derive(Error, Debug)]
pub enum FactoryError {
    /// Discovery ran but nothing registered this name
    #[error("Plugin '{0}' not found")]
    NotFound(QualifiedName),

    /// The requested name is not a valid qualified name
    #[error("Invalid plugin name: {0}")]
    Resolution(#[from] ResolutionError),

    /// A module that should provide the plugin failed to load
    #[error("Plugin discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),
}

/// Errors reading factory configuration files
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for the config schema
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
