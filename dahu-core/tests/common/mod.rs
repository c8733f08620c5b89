//! Shared fixtures: a counting in-memory module loader and test plugins

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Barrier, Mutex};
use std::time::Duration;

use dahu_core::{
    DiscoveryError, ModuleLoader, Plugin, PluginContext, PluginError, QualifiedName, Registry,
};
use tempfile::TempDir;

/// Suffix of module files recognized by [`MockLoader`]
pub const MODULE_SUFFIX: &str = ".plugin";

type ModuleInit = Arc<dyn Fn(&Registry) -> Result<(), PluginError> + Send + Sync>;

/// Loader whose modules are registration closures keyed by module name.
///
/// Module files only need to exist on disk (`<module>.plugin`); their
/// content is ignored. Every load is counted.
#[derive(Default)]
pub struct MockLoader {
    modules: HashMap<String, ModuleInit>,
    loads: Mutex<HashMap<String, usize>>,
    delay: Duration,
    started: Option<Arc<Barrier>>,
}

impl MockLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a module
    pub fn with_module<F>(mut self, module: &str, init: F) -> Self
    where
        F: Fn(&Registry) -> Result<(), PluginError> + Send + Sync + 'static,
    {
        self.modules.insert(module.to_string(), Arc::new(init));
        self
    }

    /// Builder: add a module registering `<module>.Bar`
    pub fn with_bar_module(self, module: &str) -> Self {
        let name = QualifiedName::parse(&format!("{module}.Bar")).unwrap();
        self.with_module(module, move |registry| {
            registry.register(name.clone(), || Box::new(Bar));
            Ok(())
        })
    }

    /// Builder: make every load take this long
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Builder: wait on `barrier` once a load has been counted, so a test
    /// can tell that loading is in progress
    pub fn with_start_signal(mut self, barrier: Arc<Barrier>) -> Self {
        self.started = Some(barrier);
        self
    }

    /// Number of times `module` was loaded
    pub fn loads(&self, module: &str) -> usize {
        self.loads
            .lock()
            .unwrap()
            .get(module)
            .copied()
            .unwrap_or_default()
    }

    /// Number of loads across all modules
    pub fn total_loads(&self) -> usize {
        self.loads.lock().unwrap().values().sum()
    }
}

impl ModuleLoader for MockLoader {
    fn module_name(&self, file_name: &str) -> Option<String> {
        file_name.strip_suffix(MODULE_SUFFIX).map(str::to_string)
    }

    fn load(&self, module: &str, path: &Path, registry: &Registry) -> Result<(), DiscoveryError> {
        *self
            .loads
            .lock()
            .unwrap()
            .entry(module.to_string())
            .or_default() += 1;
        if let Some(started) = &self.started {
            started.wait();
        }
        std::thread::sleep(self.delay);

        let init = self
            .modules
            .get(module)
            .ok_or_else(|| DiscoveryError::Load {
                module: module.to_string(),
                path: path.to_path_buf(),
                reason: "module defines nothing".to_string(),
            })?;
        init(registry).map_err(|e| DiscoveryError::Load {
            module: module.to_string(),
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// Bounded plugin echoing its input
#[derive(Default)]
pub struct Bar;

impl Plugin for Bar {
    fn process(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError> {
        let input = ctx.input().clone();
        ctx.set_output(input);
        ctx.log("bar processed");
        Ok(())
    }
}

/// Server-like plugin: serves until aborted
#[derive(Default)]
pub struct Server;

impl Plugin for Server {
    fn process(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError> {
        ctx.log("serving");
        let mut requests = 0u64;
        while !ctx.is_aborted() {
            requests += 1;
            std::thread::sleep(Duration::from_millis(1));
        }
        ctx.insert_output("requests", requests);
        ctx.log("server stopped");
        Ok(())
    }
}

/// Temporary plugin directory holding empty module files
pub fn module_dir(modules: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for module in modules {
        std::fs::write(dir.path().join(format!("{module}{MODULE_SUFFIX}")), b"").unwrap();
    }
    dir
}
