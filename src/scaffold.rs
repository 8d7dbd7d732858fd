//! The top-level pipeline: acquisition, context building, prompting,
//! generation and replay, with unconditional acquisition cleanup.

use crate::config::get_user_config;
use crate::context::{load_context, Context};
use crate::error::Result;
use crate::generate::{generate_files, GenerateOptions};
use crate::hooks::run_pre_prompt_hook;
use crate::loader::{self, DESCRIPTOR_FILE};
use crate::prompt::{choose_nested_template, prompt_for_config, Prompter};
use crate::renderer::MiniJinjaRenderer;
use crate::replay;
use crate::utils::{self, template_identity};
use std::path::PathBuf;

/// Everything a single generation run needs to know.
#[derive(Debug, Clone)]
pub struct ScaffoldOptions {
    /// Template reference: local path, VCS URL or zip URI.
    pub template: String,
    /// Branch, tag or commit to switch to after cloning.
    pub checkout: Option<String>,
    /// Answer every prompt with its default.
    pub no_input: bool,
    /// Caller overrides, applied over user-config and template defaults.
    pub extra_context: Option<Context>,
    /// Reuse the previously saved context instead of the built one.
    pub replay: bool,
    /// Proceed when the output project directory already exists.
    pub overwrite_if_exists: bool,
    /// Where the generated project directory is created.
    pub output_dir: PathBuf,
    /// Explicit user configuration file.
    pub config_file: Option<PathBuf>,
    /// Ignore any configuration file and use built-in defaults.
    pub default_config: bool,
    /// Password for encrypted zip archives.
    pub password: Option<String>,
    /// Sub-path of the repository holding the template.
    pub directory: Option<String>,
    /// Leave pre-existing output files untouched.
    pub skip_if_file_exists: bool,
    /// Run the template's lifecycle hooks.
    pub accept_hooks: bool,
    /// Keep partially generated output when generation fails.
    pub keep_project_on_failure: bool,
}

impl Default for ScaffoldOptions {
    fn default() -> Self {
        Self {
            template: String::new(),
            checkout: None,
            no_input: false,
            extra_context: None,
            replay: false,
            overwrite_if_exists: false,
            output_dir: PathBuf::from("."),
            config_file: None,
            default_config: false,
            password: None,
            directory: None,
            skip_if_file_exists: false,
            accept_hooks: true,
            keep_project_on_failure: false,
        }
    }
}

/// Creates a project from a template and returns the generated project
/// directory.
///
/// Acquisition cleanup is unconditional: temporary clone/extraction
/// directories and any `pre_prompt` working copy are removed whether or
/// not generation succeeded. Rollback of partially generated output is
/// handled inside the generation engine and controlled by
/// `keep_project_on_failure`.
pub fn scaffold(options: &ScaffoldOptions, prompter: &dyn Prompter) -> Result<PathBuf> {
    let config = get_user_config(options.config_file.as_deref(), options.default_config)?;
    let renderer = MiniJinjaRenderer::new();

    let acquired = loader::acquire(
        prompter,
        &options.template,
        &config.abbreviations,
        &config.templates_dir,
        options.checkout.as_deref(),
        options.no_input,
        options.password.as_deref(),
        options.directory.as_deref(),
    )?;

    // pre_prompt may rewrite the template tree; it runs against an
    // isolated copy which then becomes the working root.
    let repo_dir = if options.accept_hooks {
        match run_pre_prompt_hook(&acquired.template_dir, &renderer) {
            Ok(dir) => dir,
            Err(e) => {
                acquired.cleanup();
                return Err(e);
            }
        }
    } else {
        acquired.template_dir.clone()
    };

    let result = run_pipeline(options, &config, &repo_dir, prompter, &renderer);

    if repo_dir != acquired.template_dir {
        log::debug!("Removing pre_prompt working copy '{}'", repo_dir.display());
        if let Err(e) = utils::rmtree(&repo_dir) {
            log::warn!("Failed to remove '{}': {}", repo_dir.display(), e);
        }
    }
    acquired.cleanup();
    result
}

fn run_pipeline(
    options: &ScaffoldOptions,
    config: &crate::config::UserConfig,
    repo_dir: &std::path::Path,
    prompter: &dyn Prompter,
    renderer: &MiniJinjaRenderer,
) -> Result<PathBuf> {
    let mut repo_dir = repo_dir.to_path_buf();

    let mut context = load_context(
        repo_dir.join(DESCRIPTOR_FILE),
        Some(&config.default_context),
        options.extra_context.as_ref(),
    )?;

    if !options.no_input {
        if let Some(nested_dir) = choose_nested_template(&context, &repo_dir, prompter)? {
            // Selecting a sub-template discards the first context entirely
            // and rebuilds against the chosen subtree.
            repo_dir = nested_dir;
            context = load_context(
                repo_dir.join(DESCRIPTOR_FILE),
                Some(&config.default_context),
                options.extra_context.as_ref(),
            )?;
        }
    }

    let mut context = prompt_for_config(&context, renderer, prompter, options.no_input)?;

    let identity = template_identity(&options.template);
    if options.replay {
        context = replay::load(&config.replay_dir, &identity)?;
    }

    let generate_options = GenerateOptions {
        overwrite_if_exists: options.overwrite_if_exists,
        skip_if_file_exists: options.skip_if_file_exists,
        accept_hooks: options.accept_hooks,
        keep_project_on_failure: options.keep_project_on_failure,
    };
    let project_dir = generate_files(
        &repo_dir,
        &context,
        &options.output_dir,
        &generate_options,
        renderer,
    )?;

    replay::dump(&config.replay_dir, &identity, &context)?;

    Ok(project_dir)
}
