//! Plugin registry - qualified name to constructor
//!
//! The registry is shared between the host and every plugin module it loads:
//! modules register their plugin types into it while being loaded. It never
//! triggers discovery itself.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::context::Params;
use crate::error::{PluginError, ResolutionError};
use crate::function::FunctionPlugin;
use crate::name::QualifiedName;
use crate::Plugin;

/// Builds a new, empty plugin instance.
pub type PluginConstructor = Arc<dyn Fn() -> Box<dyn Plugin> + Send + Sync>;

/// Concurrency-safe map from [`QualifiedName`] to [`PluginConstructor`].
///
/// Re-registering a name replaces its entry; the last writer wins. Every
/// registration is atomic with respect to concurrent lookups.
#[derive(Default)]
pub struct Registry {
    entries: RwLock<HashMap<QualifiedName, PluginConstructor>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the constructor for `name`
    pub fn register<C>(&self, name: QualifiedName, constructor: C)
    where
        C: Fn() -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        self.register_constructor(name, Arc::new(constructor));
    }

    /// Insert or replace a shared constructor
    pub fn register_constructor(&self, name: QualifiedName, constructor: PluginConstructor) {
        tracing::debug!(plugin = %name, "Registering plugin");
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(name, constructor);
    }

    /// Register a plugin type under its resolved qualified name
    pub fn register_type<P>(&self) -> Result<QualifiedName, ResolutionError>
    where
        P: Plugin + Default + 'static,
    {
        let name = QualifiedName::of::<P>()?;
        self.register(name.clone(), || Box::new(P::default()));
        Ok(name)
    }

    /// Wrap a function into a plugin and register it as
    /// `<module>.<function name>`.
    ///
    /// Only named function items resolve; closures are rejected with
    /// [`ResolutionError::Malformed`].
    pub fn register_from_function<F>(&self, function: F) -> Result<QualifiedName, ResolutionError>
    where
        F: Fn(&Params) -> Result<Value, PluginError> + Send + Sync + 'static,
    {
        let name = QualifiedName::of_val(&function)?;
        let function = Arc::new(function);
        self.register(name.clone(), move || {
            Box::new(FunctionPlugin::new(Arc::clone(&function)))
        });
        Ok(name)
    }

    /// Constructor registered under `name`, if any
    pub fn lookup(&self, name: &str) -> Option<PluginConstructor> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(name).cloned()
    }

    /// Check if a name is registered
    pub fn contains(&self, name: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains_key(name)
    }

    /// All registered names, sorted
    pub fn names(&self) -> Vec<QualifiedName> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<QualifiedName> = entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered plugins
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.names())
            .finish()
    }
}
