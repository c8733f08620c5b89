//! CLI command implementations

pub mod list;
pub mod run;

use anyhow::Result;
use dahu_core::FactoryConfig;
use std::path::{Path, PathBuf};

/// Layered file configuration with command-line overrides applied on top
pub fn factory_config(plugin_dirs: &[PathBuf], workdir: Option<&Path>) -> Result<FactoryConfig> {
    let mut config = FactoryConfig::load()?;
    config.plugin_path.extend(plugin_dirs.iter().cloned());
    if let Some(workdir) = workdir {
        config.workdir = workdir.to_path_buf();
    }
    Ok(config)
}
