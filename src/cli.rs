//! Command-line interface implementation for kiln.
//! Provides argument parsing and help text formatting using clap.

use crate::context::{Context, Value};
use crate::error::{Error, Result};
use clap::{error::ErrorKind, CommandFactory, Parser};
use std::path::PathBuf;

/// Command-line arguments structure for kiln.
#[derive(Parser, Debug)]
#[command(author, version, about = "kiln: create projects from reusable directory templates", long_about = None)]
pub struct Args {
    /// Path to the template directory, repository URL or zip URI
    #[arg(value_name = "TEMPLATE")]
    pub template: String,

    /// key=value pairs overriding the template's declared defaults
    #[arg(value_name = "EXTRA_CONTEXT")]
    pub extra_context: Vec<String>,

    /// Branch, tag or commit to check out after cloning
    #[arg(short, long)]
    pub checkout: Option<String>,

    /// Do not prompt for parameters; use declared defaults
    #[arg(long)]
    pub no_input: bool,

    /// Do not prompt; reuse the context saved by the previous run
    #[arg(long)]
    pub replay: bool,

    /// Overwrite the contents of the output directory if it exists
    #[arg(short = 'f', long)]
    pub overwrite_if_exists: bool,

    /// Skip files in the output directory that already exist
    #[arg(short, long)]
    pub skip_if_file_exists: bool,

    /// Directory where the generated project will be created
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// User configuration file
    #[arg(long)]
    pub config_file: Option<PathBuf>,

    /// Ignore any configuration file and use built-in defaults
    #[arg(long)]
    pub default_config: bool,

    /// Directory within the repository that holds the template
    #[arg(long)]
    pub directory: Option<String>,

    /// Do not run pre/post generation hooks
    #[arg(long)]
    pub no_hooks: bool,

    /// Keep the generated project directory even when generation fails
    #[arg(long)]
    pub keep_project_on_failure: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parses `key=value` pairs from the command line into a context.
pub fn parse_extra_context(pairs: &[String]) -> Result<Option<Context>> {
    if pairs.is_empty() {
        return Ok(None);
    }
    let mut context = Context::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(Error::ConfigError(format!(
                "invalid extra context '{pair}': expected key=value"
            )));
        };
        context.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(Some(context))
}

/// Parses command line arguments and returns the Args structure.
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if e.kind() == ErrorKind::MissingRequiredArgument {
                Args::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help()
                    .unwrap();
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}
