//! Plugins built from plain functions

use serde_json::Value;
use std::sync::Arc;

use crate::context::{Params, PluginContext};
use crate::error::PluginError;
use crate::Plugin;

/// Output key used when a wrapped function returns something other than a
/// JSON object.
pub const RESULT_KEY: &str = "result";

/// Adapter turning a function of the input parameters into a [`Plugin`].
///
/// `process` calls the function with the input mapping. A returned object
/// becomes the output as is; any other value is stored under
/// [`RESULT_KEY`].
pub struct FunctionPlugin<F> {
    function: Arc<F>,
}

impl<F> FunctionPlugin<F>
where
    F: Fn(&Params) -> Result<Value, PluginError> + Send + Sync + 'static,
{
    /// Wrap a shared function
    pub fn new(function: Arc<F>) -> Self {
        Self { function }
    }
}

impl<F> Plugin for FunctionPlugin<F>
where
    F: Fn(&Params) -> Result<Value, PluginError> + Send + Sync + 'static,
{
    fn process(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError> {
        let output = match (self.function)(ctx.input())? {
            Value::Object(map) => map,
            other => {
                let mut map = Params::new();
                map.insert(RESULT_KEY.to_string(), other);
                map
            }
        };
        ctx.set_output(output);
        Ok(())
    }
}
