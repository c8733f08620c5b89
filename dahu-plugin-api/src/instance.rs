//! PluginInstance - drives one plugin through its lifecycle
//!
//! ```text
//! Created --setup--> Configured --process--> Processed --teardown--> Done
//!    |________________ abort (sets the flag, any phase) ________________|
//! ```

use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::context::{AbortHandle, Params, PluginContext};
use crate::error::PluginError;
use crate::name::QualifiedName;
use crate::Plugin;

/// Lifecycle phase of a plugin instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed, `setup` not yet called
    Created,
    /// `setup` has run
    Configured,
    /// `process` has run
    Processed,
    /// `teardown` has run
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Created => "created",
            Phase::Configured => "configured",
            Phase::Processed => "processed",
            Phase::Done => "done",
        };
        f.write_str(s)
    }
}

/// A runnable plugin, exclusively owned by the caller that instantiated it.
///
/// Only [`abort`](Self::abort) (or an [`AbortHandle`] obtained beforehand)
/// may be used from another thread while `process` runs.
pub struct PluginInstance {
    id: Uuid,
    name: QualifiedName,
    plugin: Box<dyn Plugin>,
    ctx: PluginContext,
    phase: Phase,
}

impl PluginInstance {
    /// Wrap a freshly constructed plugin
    pub fn new(name: QualifiedName, plugin: Box<dyn Plugin>, workdir: impl Into<PathBuf>) -> Self {
        let ctx = PluginContext::new(name.as_str(), workdir);
        Self {
            id: Uuid::new_v4(),
            name,
            plugin,
            ctx,
            phase: Phase::Created,
        }
    }

    /// Unique id of this instance
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Qualified name the instance was created from
    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    /// Simple type name, without the namespace
    pub fn simple_name(&self) -> &str {
        self.name.type_name()
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Input given to `setup`
    pub fn input(&self) -> &Params {
        self.ctx.input()
    }

    /// Result mapping
    pub fn output(&self) -> &Params {
        self.ctx.output()
    }

    /// Store the input and let the plugin initialize. Allowed once.
    pub fn setup(&mut self, input: Params) -> Result<(), PluginError> {
        if self.phase != Phase::Created {
            return Err(PluginError::InvalidState {
                operation: "setup",
                phase: self.phase,
            });
        }
        self.ctx.set_input(input);
        self.phase = Phase::Configured;
        self.plugin.setup(&mut self.ctx)
    }

    /// Perform the unit of work. Runs at most once.
    pub fn process(&mut self) -> Result<(), PluginError> {
        match self.phase {
            Phase::Created => {
                tracing::warn!(plugin = %self.name, "process called before setup, input is empty");
            }
            Phase::Configured => {}
            Phase::Processed | Phase::Done => {
                return Err(PluginError::InvalidState {
                    operation: "process",
                    phase: self.phase,
                });
            }
        }
        self.phase = Phase::Processed;
        self.plugin.process(&mut self.ctx)
    }

    /// Release resources and merge the log buffer into the output.
    ///
    /// Safe in any phase. The plugin's own teardown runs once; repeated calls
    /// only refresh the merged logs.
    pub fn teardown(&mut self) -> Result<(), PluginError> {
        let result = if self.phase == Phase::Done {
            Ok(())
        } else {
            self.phase = Phase::Done;
            self.plugin.teardown(&mut self.ctx)
        };
        self.ctx.merge_logs();
        result
    }

    /// Ask the plugin to stop. Fire-and-forget.
    pub fn abort(&self) {
        tracing::debug!(plugin = %self.name, id = %self.id, "Abort requested");
        self.ctx.abort_handle().abort();
    }

    /// Handle for aborting from another thread while `process` runs
    pub fn abort_handle(&self) -> AbortHandle {
        self.ctx.abort_handle()
    }

    /// Whether abort was requested
    pub fn is_aborted(&self) -> bool {
        self.ctx.is_aborted()
    }

    /// Log buffer as text, one line per entry
    pub fn get_info(&self) -> String {
        self.ctx.logs().join(LINE_SEPARATOR)
    }

    /// Drive setup, process and teardown, returning the output.
    ///
    /// `teardown` runs on every exit path; the first error wins.
    pub fn run(&mut self, input: Params) -> Result<Params, PluginError> {
        let result = self.setup(input).and_then(|()| self.process());
        let teardown = self.teardown();
        result.and(teardown)?;
        Ok(self.ctx.output().clone())
    }
}

#[cfg(windows)]
const LINE_SEPARATOR: &str = "\r\n";
#[cfg(not(windows))]
const LINE_SEPARATOR: &str = "\n";

impl fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginInstance")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("phase", &self.phase)
            .field("aborted", &self.is_aborted())
            .finish_non_exhaustive()
    }
}
