//! Discovery engine - on-demand loading of plugin modules
//!
//! Plugin directories are scanned once when added. A module is loaded the
//! first time a qualified name needs it, and never again: success and
//! failure are both remembered for the life of the engine.
//!
//! # Plugin Structure
//!
//! Each plugin directory contains module files, e.g. with [`DylibLoader`]:
//! - `libcalib.so` (or `libcalib.dylib` / `calib.dll`) - provides module `calib`,
//!   and with it every plugin named `calib.<TypeName>`

mod loader;

pub use loader::{DylibLoader, ModuleLoader};

use dahu_plugin_api::{QualifiedName, Registry};
use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::DiscoveryError;

/// Snapshot of a scanned plugin directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDirectory {
    /// Absolute directory path
    pub path: PathBuf,
    /// Module name to module file, as found when scanned
    pub modules: BTreeMap<String, PathBuf>,
}

#[derive(Default)]
struct DiscoveryState {
    /// Searched in insertion order
    directories: Vec<PluginDirectory>,
    loaded: HashMap<String, PathBuf>,
    /// Module name to (path, reason)
    failed: HashMap<String, (PathBuf, String)>,
}

impl DiscoveryState {
    fn find(&self, module: &str) -> Option<PathBuf> {
        self.directories
            .iter()
            .find_map(|dir| dir.modules.get(module).cloned())
    }
}

/// Finds module files in plugin directories and loads them at most once.
pub struct DiscoveryEngine {
    registry: Arc<Registry>,
    loader: Arc<dyn ModuleLoader>,
    state: Mutex<DiscoveryState>,
}

impl DiscoveryEngine {
    /// Create an engine with no directories
    pub fn new(registry: Arc<Registry>, loader: Arc<dyn ModuleLoader>) -> Self {
        Self {
            registry,
            loader,
            state: Mutex::new(DiscoveryState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DiscoveryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Scan a directory and remember its modules.
    ///
    /// A missing directory is logged and ignored. Adding a directory again
    /// re-scans it in place; other directories are untouched.
    pub fn add_directory(&self, dir: impl AsRef<Path>) {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            tracing::warn!(dir = %dir.display(), "No such plugin directory");
            return;
        }
        let path = match dir.canonicalize() {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Cannot resolve plugin directory");
                return;
            }
        };

        let mut state = self.lock();
        let modules = match self.scan(&path) {
            Ok(modules) => modules,
            Err(e) => {
                tracing::warn!(dir = %path.display(), error = %e, "Cannot read plugin directory");
                return;
            }
        };
        tracing::debug!(dir = %path.display(), modules = modules.len(), "Plugin directory scanned");

        match state.directories.iter_mut().find(|d| d.path == path) {
            Some(existing) => existing.modules = modules,
            None => state.directories.push(PluginDirectory { path, modules }),
        }
    }

    fn scan(&self, dir: &Path) -> Result<BTreeMap<String, PathBuf>, DiscoveryError> {
        let mut modules = BTreeMap::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(module) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| self.loader.module_name(n))
            else {
                continue;
            };
            modules.entry(module).or_insert(path);
        }
        Ok(modules)
    }

    /// Make sure the module that should define `name` has been loaded.
    ///
    /// Candidates are tried longest dotted prefix first (`a.b.C` tries module
    /// `a.b`, then `a`). The first candidate that is loaded, has failed, or
    /// exists in a directory decides the outcome; a shorter prefix is only
    /// consulted when the longer one is unknown.
    pub fn ensure_loaded(&self, name: &QualifiedName) -> Result<(), DiscoveryError> {
        let mut state = self.lock();

        for module in name.module_candidates() {
            if state.loaded.contains_key(module) {
                tracing::debug!(plugin = %name, module, "Module already loaded");
                return Ok(());
            }
            if let Some((path, reason)) = state.failed.get(module) {
                return Err(DiscoveryError::Load {
                    module: module.to_string(),
                    path: path.clone(),
                    reason: reason.clone(),
                });
            }
            if let Some(path) = state.find(module) {
                return self.load_module(&mut state, module, path);
            }
        }

        Err(DiscoveryError::NotFound {
            module: name.module().to_string(),
        })
    }

    /// Load every known module not yet attempted.
    ///
    /// Failures are collected per module; one broken module does not stop
    /// the others.
    pub fn load_all(&self) -> Vec<DiscoveryError> {
        let mut state = self.lock();
        let mut pending: BTreeMap<String, PathBuf> = BTreeMap::new();
        for dir in &state.directories {
            for (module, path) in &dir.modules {
                if !state.loaded.contains_key(module) && !state.failed.contains_key(module) {
                    pending
                        .entry(module.clone())
                        .or_insert_with(|| path.clone());
                }
            }
        }

        pending
            .into_iter()
            .filter_map(|(module, path)| self.load_module(&mut state, &module, path).err())
            .collect()
    }

    fn load_module(
        &self,
        state: &mut DiscoveryState,
        module: &str,
        path: PathBuf,
    ) -> Result<(), DiscoveryError> {
        tracing::info!(module, path = %path.display(), "Loading plugin module");

        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.loader.load(module, &path, &self.registry)
        }))
        .unwrap_or_else(|_| {
            Err(DiscoveryError::Load {
                module: module.to_string(),
                path: path.clone(),
                reason: "module panicked while loading".to_string(),
            })
        });

        match result {
            Ok(()) => {
                state.loaded.insert(module.to_string(), path);
                Ok(())
            }
            Err(e) => {
                let reason = match e {
                    DiscoveryError::Load { reason, .. } => reason,
                    other => other.to_string(),
                };
                tracing::error!(module, path = %path.display(), error = %reason, "Failed to load plugin module");
                state
                    .failed
                    .insert(module.to_string(), (path.clone(), reason.clone()));
                Err(DiscoveryError::Load {
                    module: module.to_string(),
                    path,
                    reason,
                })
            }
        }
    }

    /// Scanned directories, in search order
    pub fn directories(&self) -> Vec<PluginDirectory> {
        self.lock().directories.clone()
    }

    /// Names of successfully loaded modules, sorted
    pub fn loaded_modules(&self) -> Vec<String> {
        let mut modules: Vec<String> = self.lock().loaded.keys().cloned().collect();
        modules.sort();
        modules
    }

    /// Check if a module has been loaded
    pub fn is_loaded(&self, module: &str) -> bool {
        self.lock().loaded.contains_key(module)
    }
}
