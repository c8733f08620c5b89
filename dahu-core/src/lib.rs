//! dahu-core: plugin discovery and instantiation for dahu
//!
//! This crate turns a qualified plugin name into a runnable
//! [`PluginInstance`](dahu_plugin_api::PluginInstance):
//!
//! - **Factory** - [`Factory`] resolves names through the registry and falls
//!   back to discovery on a miss
//! - **Discovery** - [`DiscoveryEngine`] scans plugin directories and loads
//!   each module at most once through a [`ModuleLoader`]
//! - **Configuration** - [`FactoryConfig`] layers TOML files and the
//!   `DAHU_PLUGINS` search path
//!
//! # Quick Start
//!
//! ```no_run
//! use dahu_core::{Factory, FactoryConfig};
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let factory = Factory::new(FactoryConfig::load()?);
//!
//!     let mut plugin = factory.instantiate("dahu_example.square")?;
//!     let input = serde_json::json!({"x": 5});
//!     let output = plugin.run(input.as_object().cloned().unwrap_or_default())?;
//!     println!("{}", serde_json::Value::Object(output));
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! caller ──instantiate(name)──▶ Factory ──lookup──▶ Registry ◀──register── plugin module
//!                                  │ miss                                      ▲
//!                                  ▼                                           │ load once
//!                           DiscoveryEngine ──────────▶ ModuleLoader ──────────┘
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod factory;

pub use config::{FactoryConfig, PLUGIN_PATH_ENV, RawFactoryConfig};
pub use discovery::{DiscoveryEngine, DylibLoader, ModuleLoader, PluginDirectory};
pub use error::{ConfigError, DiscoveryError, FactoryError};
pub use factory::Factory;

// Re-export the plugin API so hosts need a single dependency
pub use dahu_plugin_api::{
    AbortHandle, Params, Phase, Plugin, PluginContext, PluginError, PluginInstance, QualifiedName,
    Registry, ResolutionError,
};
