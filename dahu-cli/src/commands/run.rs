//! Run a single plugin

use anyhow::{Context, Result, bail};
use clap::Args;
use dahu_core::{Factory, Params};
use serde_json::Value;
use std::path::PathBuf;

/// Plugin run arguments
#[derive(Args)]
pub struct RunArgs {
    /// Qualified plugin name, e.g. `dahu_example.square`
    pub name: String,

    /// Input parameters as a JSON object
    #[arg(short, long)]
    pub input: Option<String>,

    /// Extra plugin directory (repeatable)
    #[arg(short = 'p', long = "plugin-dir")]
    pub plugin_dirs: Vec<PathBuf>,

    /// Working directory handed to the plugin
    #[arg(short, long)]
    pub workdir: Option<PathBuf>,
}

/// Run plugin command
pub async fn run(args: RunArgs) -> Result<()> {
    let input = parse_input(args.input.as_deref())?;
    let config = super::factory_config(&args.plugin_dirs, args.workdir.as_deref())?;
    let factory = Factory::new(config);

    let mut instance = factory.instantiate(&args.name)?;
    let abort = instance.abort_handle();
    let name = instance.name().clone();
    tracing::debug!(plugin = %name, id = %instance.id(), "Running plugin");

    let mut task = tokio::task::spawn_blocking(move || instance.run(input));
    let output = tokio::select! {
        joined = &mut task => joined?,
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::warn!(plugin = %name, "Interrupted, aborting plugin");
            abort.abort();
            task.await?
        }
    };

    let output = output.with_context(|| format!("Plugin '{name}' failed"))?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Parse `--input`; absent means an empty mapping
fn parse_input(input: Option<&str>) -> Result<Params> {
    let Some(input) = input else {
        return Ok(Params::new());
    };
    match serde_json::from_str(input).context("Input is not valid JSON")? {
        Value::Object(params) => Ok(params),
        other => bail!("Input must be a JSON object, got: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serde_json::json;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: RunArgs,
    }

    #[test]
    fn test_run_args_parsing() {
        let cli = TestCli::try_parse_from([
            "test",
            "dahu_example.square",
            "--input",
            r#"{"x": 4}"#,
            "-p",
            "/opt/a",
            "--plugin-dir",
            "/opt/b",
            "--workdir",
            "/scratch",
        ])
        .unwrap();

        assert_eq!(cli.args.name, "dahu_example.square");
        assert_eq!(cli.args.input.as_deref(), Some(r#"{"x": 4}"#));
        assert_eq!(
            cli.args.plugin_dirs,
            vec![PathBuf::from("/opt/a"), PathBuf::from("/opt/b")]
        );
        assert_eq!(cli.args.workdir, Some(PathBuf::from("/scratch")));
    }

    #[test]
    fn test_run_args_require_name() {
        assert!(TestCli::try_parse_from(["test"]).is_err());
    }

    #[test]
    fn test_parse_input() {
        assert!(parse_input(None).unwrap().is_empty());

        let params = parse_input(Some(r#"{"x": 4, "label": "dark"}"#)).unwrap();
        assert_eq!(params["x"], json!(4));
        assert_eq!(params["label"], json!("dark"));
    }

    #[test]
    fn test_parse_input_rejects_non_objects() {
        assert!(parse_input(Some("[1, 2]")).is_err());
        assert!(parse_input(Some("4")).is_err());
        assert!(parse_input(Some("{x: 4}")).is_err());
    }
}
