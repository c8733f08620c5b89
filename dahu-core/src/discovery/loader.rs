//! Module loaders - turn a module file into registered plugins

use dahu_plugin_api::{API_VERSION, REGISTER_OK, REGISTER_PANICKED, Registry};
use libloading::{Library, Symbol};
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::Path;

use crate::error::DiscoveryError;

/// Recognizes module files and executes them.
///
/// Loading a module must make it register its plugins into the given
/// registry. The discovery engine guarantees `load` runs at most once per
/// module and never concurrently.
pub trait ModuleLoader: Send + Sync {
    /// Module provided by a directory entry, or `None` if the file is not a
    /// candidate module
    fn module_name(&self, file_name: &str) -> Option<String>;

    /// Execute the module at `path`
    fn load(&self, module: &str, path: &Path, registry: &Registry) -> Result<(), DiscoveryError>;
}

/// Loads plugin modules built as native dynamic libraries.
///
/// A library named `libcalib.so` (`libcalib.dylib`, `calib.dll`) provides
/// module `calib`. It must export the entry points generated by
/// [`dahu_plugin_api::export_plugins!`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DylibLoader;

impl ModuleLoader for DylibLoader {
    fn module_name(&self, file_name: &str) -> Option<String> {
        let stem = file_name.strip_suffix(DLL_SUFFIX)?;
        let stem = stem.strip_prefix(DLL_PREFIX).unwrap_or(stem);
        if stem.is_empty() || stem.starts_with('.') {
            return None;
        }
        Some(stem.to_string())
    }

    fn load(&self, module: &str, path: &Path, registry: &Registry) -> Result<(), DiscoveryError> {
        // SAFETY: Loading runs the library's initializers. Only libraries
        // placed in configured plugin directories are loaded.
        let library = unsafe { Library::new(path)? };

        let status = {
            // SAFETY: Signature fixed by `export_plugins!`.
            let api_version_fn: Symbol<extern "C" fn() -> u32> =
                unsafe { library.get(b"_dahu_plugin_api_version")? };

            let found = api_version_fn();
            if found != API_VERSION {
                return Err(DiscoveryError::ApiVersionMismatch {
                    expected: API_VERSION,
                    found,
                });
            }

            // SAFETY: Signature fixed by `export_plugins!`; the module was
            // built against the same API version.
            let register_fn: Symbol<extern "C" fn(&Registry) -> i32> =
                unsafe { library.get(b"_dahu_plugin_register")? };

            register_fn(registry)
        };

        // Registered constructors point into the library: it stays mapped
        // for the rest of the process.
        std::mem::forget(library);

        match status {
            REGISTER_OK => Ok(()),
            REGISTER_PANICKED => Err(DiscoveryError::Load {
                module: module.to_string(),
                path: path.to_path_buf(),
                reason: "module panicked during registration".to_string(),
            }),
            _ => Err(DiscoveryError::Load {
                module: module.to_string(),
                path: path.to_path_buf(),
                reason: format!("module registration failed with status {status}"),
            }),
        }
    }
}
