//! Example plugin module for dahu
//!
//! This module demonstrates:
//! - Exposing a plain function as a plugin (`dahu_example.square`)
//! - A server-like plugin that runs until aborted (`dahu_example.Heartbeat`)
//! - Self-registration with the `export_plugins!` macro
//!
//! ## Building
//!
//! ```bash
//! cargo build --release -p dahu-example
//! ```
//!
//! ## Installing
//!
//! ```bash
//! mkdir -p ~/.local/share/dahu/plugins
//! cp target/release/libdahu_example.so ~/.local/share/dahu/plugins/
//! dahu run dahu_example.square --input '{"x": 4}'
//! ```

use std::time::Duration;

use dahu_plugin_api::{
    Params, Plugin, PluginContext, PluginError, Registry, export_plugins,
};
use serde_json::{Value, json};

/// Square the number given as `x`
pub fn square(input: &Params) -> Result<Value, PluginError> {
    let x = input
        .get("x")
        .ok_or_else(|| PluginError::invalid_input("missing parameter 'x'"))?;
    if let Some(x) = x.as_i64() {
        return x
            .checked_mul(x)
            .map(|sq| json!(sq))
            .ok_or_else(|| PluginError::invalid_input(format!("{x} squared overflows")));
    }
    x.as_f64()
        .map(|x| json!(x * x))
        .ok_or_else(|| PluginError::invalid_input("'x' must be a number"))
}

/// Emits a tick every `interval_ms` until aborted or `max_ticks` is reached.
pub struct Heartbeat {
    interval: Duration,
    max_ticks: Option<u64>,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(Self::DEFAULT_INTERVAL_MS),
            max_ticks: None,
        }
    }
}

impl Heartbeat {
    const DEFAULT_INTERVAL_MS: u64 = 100;
}

impl Plugin for Heartbeat {
    fn setup(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError> {
        let interval_ms = ctx
            .param_opt::<u64>("interval_ms")?
            .unwrap_or(Self::DEFAULT_INTERVAL_MS);
        self.interval = Duration::from_millis(interval_ms);
        self.max_ticks = ctx.param_opt("max_ticks")?;
        ctx.log(format!("heartbeat every {interval_ms} ms"));
        Ok(())
    }

    fn process(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError> {
        let mut ticks = 0u64;
        while !ctx.is_aborted() && self.max_ticks.is_none_or(|max| ticks < max) {
            ticks += 1;
            std::thread::sleep(self.interval);
        }

        ctx.insert_output("ticks", ticks);
        ctx.insert_output("aborted", ctx.is_aborted());
        ctx.log(format!("heartbeat stopped after {ticks} ticks"));
        Ok(())
    }
}

fn register(registry: &Registry) -> Result<(), PluginError> {
    registry
        .register_from_function(square)
        .map_err(|e| PluginError::custom(e.to_string()))?;
    registry
        .register_type::<Heartbeat>()
        .map_err(|e| PluginError::custom(e.to_string()))?;
    Ok(())
}

// This macro generates the C ABI entry points for dynamic loading
export_plugins!(register);
