//! Factory - instantiate plugins by qualified name

use dahu_plugin_api::{
    Params, PluginConstructor, PluginError, PluginInstance, QualifiedName, Registry,
    ResolutionError,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::FactoryConfig;
use crate::discovery::{DiscoveryEngine, DylibLoader, ModuleLoader};
use crate::error::{DiscoveryError, FactoryError};

/// Entry point for hosts: turns a qualified name into a ready-to-run
/// [`PluginInstance`].
///
/// Registry hits never touch the filesystem. A miss loads the providing
/// module once; concurrent misses are serialized so a module is never loaded
/// twice.
pub struct Factory {
    registry: Arc<Registry>,
    discovery: DiscoveryEngine,
    workdir: PathBuf,
    miss_lock: Mutex<()>,
}

impl Factory {
    /// Create a factory loading native plugin libraries
    pub fn new(config: FactoryConfig) -> Self {
        Self::with_loader(config, Arc::new(Registry::new()), Arc::new(DylibLoader))
    }

    /// Create a factory with an injected registry and module loader
    pub fn with_loader(
        config: FactoryConfig,
        registry: Arc<Registry>,
        loader: Arc<dyn ModuleLoader>,
    ) -> Self {
        let discovery = DiscoveryEngine::new(Arc::clone(&registry), loader);
        for dir in config.search_dirs() {
            discovery.add_directory(&dir);
        }

        Self {
            registry,
            discovery,
            workdir: config.workdir,
            miss_lock: Mutex::new(()),
        }
    }

    /// Create a new instance of the plugin registered under `name`.
    ///
    /// Every call returns a fresh instance.
    pub fn instantiate(&self, name: &str) -> Result<PluginInstance, FactoryError> {
        let name = QualifiedName::parse(name)?;

        if let Some(constructor) = self.registry.lookup(name.as_str()) {
            return Ok(self.build(name, constructor));
        }

        let constructor = {
            let _guard = self.miss_lock.lock().unwrap_or_else(PoisonError::into_inner);
            match self.discovery.ensure_loaded(&name) {
                Ok(()) => {}
                Err(DiscoveryError::NotFound { .. }) => {
                    return Err(FactoryError::NotFound(name));
                }
                Err(e) => return Err(e.into()),
            }
            self.registry.lookup(name.as_str())
        };

        match constructor {
            Some(constructor) => Ok(self.build(name, constructor)),
            None => {
                tracing::error!(
                    plugin = %name,
                    "Plugin directories have been searched but the plugin was not found"
                );
                Err(FactoryError::NotFound(name))
            }
        }
    }

    fn build(&self, name: QualifiedName, constructor: PluginConstructor) -> PluginInstance {
        let instance = PluginInstance::new(name, constructor(), &self.workdir);
        tracing::debug!(plugin = %instance.name(), id = %instance.id(), "Plugin instantiated");
        instance
    }

    /// Expose a plain function as a plugin; returns its qualified name
    pub fn register_function<F>(&self, function: F) -> Result<QualifiedName, ResolutionError>
    where
        F: Fn(&Params) -> Result<Value, PluginError> + Send + Sync + 'static,
    {
        self.registry.register_from_function(function)
    }

    /// Add a plugin directory after construction
    pub fn add_directory(&self, dir: impl AsRef<Path>) {
        self.discovery.add_directory(dir);
    }

    /// Load every discoverable module now, returning per-module failures
    pub fn preload(&self) -> Vec<DiscoveryError> {
        let _guard = self.miss_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.discovery.load_all()
    }

    /// The shared plugin registry
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The discovery engine
    pub fn discovery(&self) -> &DiscoveryEngine {
        &self.discovery
    }

    /// Working directory handed to every plugin instance
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }
}
