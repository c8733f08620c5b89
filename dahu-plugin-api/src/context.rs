//! PluginContext - per-instance state handed to plugin hooks

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::error::PluginError;

/// Input and output mappings: parameter name to JSON value.
pub type Params = serde_json::Map<String, serde_json::Value>;

/// Output key under which `teardown` stores the log buffer.
pub const LOGGING_KEY: &str = "logging";

// ─── Abort Flag ──────────────────────────────────────────────────────

/// Cooperative cancellation signal for one plugin instance.
///
/// The flag only moves from `false` to `true`. Clones share the same flag,
/// so a handle can be moved to another thread and fired while the instance
/// is busy in `process`.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    token: CancellationToken,
}

impl AbortHandle {
    /// Create a fresh, unset flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the intent to stop. Does not wait for the plugin.
    pub fn abort(&self) {
        self.token.cancel();
    }

    /// Whether `abort` has been called on any clone
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the flag is set.
    ///
    /// For server-like plugins that drive a tokio runtime inside `process`.
    pub async fn aborted(&self) {
        self.token.cancelled().await
    }

    /// Underlying token, for `tokio::select!` and child tokens
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

// ─── Context ─────────────────────────────────────────────────────────

/// State owned by one plugin instance.
///
/// Holds the input given to `setup`, the output built by `process`, the log
/// buffer returned to the caller, the abort flag and the working directory
/// the host allows plugins to write into.
pub struct PluginContext {
    plugin_name: String,
    workdir: PathBuf,
    input: Params,
    output: Params,
    logs: Vec<String>,
    abort: AbortHandle,
}

impl PluginContext {
    /// Create a new plugin context
    pub fn new(plugin_name: impl Into<String>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            workdir: workdir.into(),
            input: Params::new(),
            output: Params::new(),
            logs: Vec::new(),
            abort: AbortHandle::new(),
        }
    }

    /// Get the plugin's qualified name
    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    /// Directory where the plugin may write scratch and result files
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    // ─── Input ───────────────────────────────────────────────────────

    /// Input parameters; empty until `setup`
    pub fn input(&self) -> &Params {
        &self.input
    }

    pub(crate) fn set_input(&mut self, input: Params) {
        self.input = input;
    }

    /// Read and deserialize one input parameter
    ///
    /// # Example
    /// ```ignore
    /// let exposure: f64 = ctx.param("exposure")?;
    /// ```
    pub fn param<T: DeserializeOwned>(&self, key: &str) -> Result<T, PluginError> {
        let value = self
            .input
            .get(key)
            .ok_or_else(|| PluginError::invalid_input(format!("missing parameter '{key}'")))?;
        serde_json::from_value(value.clone())
            .map_err(|e| PluginError::invalid_input(format!("parameter '{key}': {e}")))
    }

    /// Read an optional parameter; absent and `null` both give `None`
    pub fn param_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, PluginError> {
        match self.input.get(key) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(_) => self.param(key).map(Some),
        }
    }

    // ─── Output ──────────────────────────────────────────────────────

    /// Result mapping built so far
    pub fn output(&self) -> &Params {
        &self.output
    }

    /// Mutable access to the result mapping
    pub fn output_mut(&mut self) -> &mut Params {
        &mut self.output
    }

    /// Replace the whole result mapping
    pub fn set_output(&mut self, output: Params) {
        self.output = output;
    }

    /// Insert one result value
    pub fn insert_output(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.output.insert(key.into(), value.into());
    }

    pub(crate) fn merge_logs(&mut self) {
        let lines = self
            .logs
            .iter()
            .cloned()
            .map(serde_json::Value::String)
            .collect();
        self.output
            .insert(LOGGING_KEY.to_string(), serde_json::Value::Array(lines));
    }

    // ─── Logging ─────────────────────────────────────────────────────

    /// Append a line to the log buffer returned to the caller.
    ///
    /// The line is also emitted as a `debug` event tagged with the plugin
    /// name. Only plugins linked into the host process reach the host's
    /// subscriber this way: a plugin built as a `cdylib` carries its own copy
    /// of `tracing`, so for it the log buffer (and `"logging"` in the output)
    /// is the only channel back to the caller.
    pub fn log(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(plugin = %self.plugin_name, "{}", message);
        self.logs.push(message);
    }

    /// Lines logged so far, oldest first
    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    // ─── Abort ───────────────────────────────────────────────────────

    /// Whether the host asked this instance to stop
    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    /// Return `Err(PluginError::Aborted)` once the flag is set
    pub fn check_aborted(&self) -> Result<(), PluginError> {
        if self.is_aborted() {
            Err(PluginError::Aborted)
        } else {
            Ok(())
        }
    }

    /// Handle sharing this instance's abort flag
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }
}
