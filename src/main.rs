//! kiln's main application entry point.
//! Parses command-line arguments, wires up the interactive prompter and
//! runs the generation pipeline.

use kiln::{
    cli::{get_args, parse_extra_context, Args},
    error::{default_error_handler, Result},
    prompt::DialoguerPrompter,
    scaffold::{scaffold, ScaffoldOptions},
};

/// Environment variable supplying the password for encrypted archives.
const REPO_PASSWORD_ENV_VAR: &str = "KILN_REPO_PASSWORD";

fn main() {
    let args = get_args();

    env_logger::Builder::new()
        .filter_level(if args.verbose {
            log::LevelFilter::Trace
        } else {
            log::LevelFilter::Off
        })
        .init();

    if let Err(err) = run(args) {
        default_error_handler(err);
    }
}

fn run(args: Args) -> Result<()> {
    let extra_context = parse_extra_context(&args.extra_context)?;

    let options = ScaffoldOptions {
        template: args.template,
        checkout: args.checkout,
        no_input: args.no_input,
        extra_context,
        replay: args.replay,
        overwrite_if_exists: args.overwrite_if_exists,
        output_dir: args.output_dir,
        config_file: args.config_file,
        default_config: args.default_config,
        password: std::env::var(REPO_PASSWORD_ENV_VAR).ok(),
        directory: args.directory,
        skip_if_file_exists: args.skip_if_file_exists,
        accept_hooks: !args.no_hooks,
        keep_project_on_failure: args.keep_project_on_failure,
    };

    let prompter = DialoguerPrompter::new();
    let project_dir = scaffold(&options, &prompter)?;

    println!("Project generated in '{}'.", project_dir.display());
    Ok(())
}
