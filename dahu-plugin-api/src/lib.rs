//! dahu-plugin-api - Plugin API for dahu data-processing jobs
//!
//! This crate provides the traits and types needed to write dahu plugins and
//! the registry they register into. A plugin is one unit of schedulable work,
//! named by a qualified name (`<module>.<TypeName>`), driven by the host
//! through `setup` → `process` → `teardown`, and cooperatively abortable.
//!
//! Plugin modules are native Rust dynamic libraries. When the host loads one,
//! its registration function runs once and registers every plugin the module
//! defines.
//!
//! # Example
//!
//! ```ignore
//! use dahu_plugin_api::{export_plugins, Params, Plugin, PluginContext, PluginError, Registry};
//! use serde_json::{json, Value};
//!
//! #[derive(Default)]
//! pub struct Dark;
//!
//! impl Plugin for Dark {
//!     fn process(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError> {
//!         let frames: u32 = ctx.param("frames")?;
//!         ctx.insert_output("frames", frames);
//!         ctx.log("dark current averaged");
//!         Ok(())
//!     }
//! }
//!
//! fn square(input: &Params) -> Result<Value, PluginError> {
//!     let x = input.get("x").and_then(Value::as_f64).unwrap_or_default();
//!     Ok(json!(x * x))
//! }
//!
//! fn register(registry: &Registry) -> Result<(), PluginError> {
//!     registry.register_type::<Dark>().map_err(|e| PluginError::custom(e.to_string()))?;
//!     registry.register_from_function(square).map_err(|e| PluginError::custom(e.to_string()))?;
//!     Ok(())
//! }
//!
//! export_plugins!(register);
//! ```

pub mod context;
pub mod error;
pub mod function;
pub mod instance;
pub mod name;
pub mod registry;

pub use context::{AbortHandle, LOGGING_KEY, Params, PluginContext};
pub use error::{PluginError, ResolutionError};
pub use function::{FunctionPlugin, RESULT_KEY};
pub use instance::{Phase, PluginInstance};
pub use name::QualifiedName;
pub use registry::{PluginConstructor, Registry};

/// Current plugin API version. Plugin modules must match this exactly.
/// This is checked when loading a module, before it may register anything.
pub const API_VERSION: u32 = 1;

/// Status returned by the generated registration entry point on success.
pub const REGISTER_OK: i32 = 0;
/// Registration function returned an error.
pub const REGISTER_FAILED: i32 = 1;
/// Registration function panicked.
pub const REGISTER_PANICKED: i32 = 2;

/// The lifecycle contract - implement this to create a dahu plugin.
///
/// The host calls `setup` once with the input mapping already stored in the
/// context, then `process`, then `teardown` on every exit path. `setup` and
/// `teardown` default to no-ops.
///
/// Abort is cooperative: a `process` that loops or serves indefinitely must
/// poll [`PluginContext::is_aborted`] and return. Bounded work may ignore it.
pub trait Plugin: Send {
    /// Initialize from the input (open files, connect to devices)
    fn setup(&mut self, _ctx: &mut PluginContext) -> Result<(), PluginError> {
        Ok(())
    }

    /// Perform the work and populate the output
    fn process(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError>;

    /// Release resources (close connections, files)
    fn teardown(&mut self, _ctx: &mut PluginContext) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Export a module's registration function for dynamic loading.
///
/// The function has the signature
/// `fn(&Registry) -> Result<(), PluginError>` and is called exactly once,
/// when the host loads the library.
///
/// # Usage
///
/// ```ignore
/// dahu_plugin_api::export_plugins!(register);
/// ```
///
/// # Generated Functions
///
/// - `_dahu_plugin_api_version()`: Returns the API version
/// - `_dahu_plugin_register()`: Runs the registration function, returning
///   [`REGISTER_OK`], [`REGISTER_FAILED`] or [`REGISTER_PANICKED`]
#[macro_export]
macro_rules! export_plugins {
    ($register:path) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn _dahu_plugin_api_version() -> u32 {
            $crate::API_VERSION
        }

        #[unsafe(no_mangle)]
        #[allow(improper_ctypes_definitions)]
        pub extern "C" fn _dahu_plugin_register(registry: &$crate::Registry) -> i32 {
            $crate::run_registration(registry, $register)
        }
    };
}

/// Run a module's registration function, turning errors and panics into a
/// status code. Used by [`export_plugins!`]; unwinding must not cross the
/// `extern "C"` boundary.
#[doc(hidden)]
pub fn run_registration<F>(registry: &Registry, register: F) -> i32
where
    F: FnOnce(&Registry) -> Result<(), PluginError>,
{
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| register(registry)));
    match result {
        Ok(Ok(())) => REGISTER_OK,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Plugin module registration failed");
            REGISTER_FAILED
        }
        Err(_) => {
            tracing::error!("Plugin module panicked during registration");
            REGISTER_PANICKED
        }
    }
}
