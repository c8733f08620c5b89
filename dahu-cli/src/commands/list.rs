//! List plugin directories and registered plugins

use anyhow::Result;
use clap::Args;
use dahu_core::Factory;
use std::path::PathBuf;

/// Plugin list arguments
#[derive(Args)]
pub struct ListArgs {
    /// Load every module before listing
    #[arg(long)]
    pub load: bool,

    /// Extra plugin directory (repeatable)
    #[arg(short = 'p', long = "plugin-dir")]
    pub plugin_dirs: Vec<PathBuf>,
}

/// Run list command
pub fn run(args: ListArgs) -> Result<()> {
    let factory = Factory::new(super::factory_config(&args.plugin_dirs, None)?);

    if args.load {
        for e in factory.preload() {
            tracing::warn!(error = %e, "Plugin module failed to load");
        }
    }

    let directories = factory.discovery().directories();
    if directories.is_empty() {
        println!("No plugin directories found");
        println!();
        println!("Plugin directory: {}", dahu_paths::plugin_dir().display());
        println!();
        println!("To install a plugin module:");
        println!("  1. Create the directory: mkdir -p {}", dahu_paths::plugin_dir().display());
        println!("  2. Copy the plugin library: cp libmy_plugins.so <plugin directory>/");
        println!("  3. Run a plugin: dahu run my_plugins.MyPlugin");
        return Ok(());
    }

    for dir in &directories {
        println!("{}", dir.path.display());
        if dir.modules.is_empty() {
            println!("  (no modules)");
        }
        for module in dir.modules.keys() {
            let status = if factory.discovery().is_loaded(module) {
                "✓"
            } else {
                "○"
            };
            println!("  {status} {module}");
        }
    }

    let names = factory.registry().names();
    if !names.is_empty() {
        println!();
        println!("Registered plugins:");
        for name in names {
            println!("  {name}");
        }
    }

    Ok(())
}
