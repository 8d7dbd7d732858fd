//! Lifecycle hook discovery and execution.
//!
//! Hooks live under `hooks/` in the template repository:
//! `pre_prompt` (before variables are collected, against an isolated copy
//! of the repository), `pre_gen_project` and `post_gen_project` (against
//! the generated output). A `.j2`-suffixed hook is rendered through the
//! context before it runs; everything else is executed directly. At most
//! one script per hook name is recognized.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::renderer::{namespaced, TemplateRenderer};
use crate::utils;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// The recognized lifecycle hook names.
pub const HOOKS: [&str; 3] = ["pre_prompt", "pre_gen_project", "post_gen_project"];

const HOOKS_DIR: &str = "hooks";

/// File suffix marking a hook script as templated.
const TEMPLATED_SUFFIX: &str = ".j2";

fn is_valid_hook(file_name: &str, hook_name: &str) -> bool {
    file_name.starts_with(hook_name)
        && !file_name.ends_with('~')
        && !file_name.ends_with(".pyc")
}

fn is_templated(script_path: &Path) -> bool {
    script_path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(TEMPLATED_SUFFIX))
}

/// Finds the hook script for `hook_name` under the repository's `hooks`
/// directory. Discovery is a pure filename match; the first candidate in
/// directory-listing order wins.
pub fn find_hook<P: AsRef<Path>>(repo_dir: P, hook_name: &str) -> Option<PathBuf> {
    let hooks_dir = repo_dir.as_ref().join(HOOKS_DIR);
    let entries = std::fs::read_dir(&hooks_dir).ok()?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    candidates.sort();
    candidates.into_iter().find(|path| {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| is_valid_hook(name, hook_name))
    })
}

fn failed(hook: &str, reason: impl Into<String>) -> Error {
    Error::FailedHook {
        hook: hook.to_string(),
        reason: reason.into(),
    }
}

/// Executes a script as a subprocess in `cwd`, feeding the context as
/// JSON on stdin.
fn run_script(
    hook_name: &str,
    script_path: &Path,
    cwd: &Path,
    context: &Context,
) -> Result<()> {
    utils::make_executable(script_path)?;
    log::debug!(
        "Running hook script '{}' in '{}'",
        script_path.display(),
        cwd.display()
    );

    let mut child = Command::new(script_path)
        .current_dir(cwd)
        .stdin(Stdio::piped())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| failed(hook_name, format!("failed to start script: {e}")))?;

    if let Some(mut stdin) = child.stdin.take() {
        let payload = serde_json::to_string(context).unwrap_or_default();
        // The script may exit without reading stdin; a broken pipe here
        // is not a hook failure.
        let _ = stdin.write_all(payload.as_bytes());
    }

    let status = child
        .wait()
        .map_err(|e| failed(hook_name, format!("failed to wait for script: {e}")))?;
    if !status.success() {
        return Err(failed(hook_name, format!("script exited with {status}")));
    }
    Ok(())
}

/// Renders a templated script through the context, writes it to a private
/// temporary file and executes it. The temporary file is removed whether
/// or not execution succeeds.
fn run_script_with_context(
    hook_name: &str,
    script_path: &Path,
    cwd: &Path,
    context: &Context,
    renderer: &dyn TemplateRenderer,
) -> Result<()> {
    let source = std::fs::read_to_string(script_path).map_err(Error::IoError)?;
    let rendered = match renderer.render(&source, &namespaced(context)) {
        Ok(rendered) => rendered,
        Err(e) if e.is_undefined_variable() => {
            return Err(failed(
                hook_name,
                format!("undefined variable in '{}': {e}", script_path.display()),
            ));
        }
        Err(e) => return Err(e),
    };

    // Keep the real script extension so the kernel picks the right
    // interpreter from the shebang-equivalent suffix, e.g. `.sh.j2` -> `.sh`.
    let stripped = script_path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.trim_end_matches(TEMPLATED_SUFFIX))
        .unwrap_or("script");
    let suffix = Path::new(stripped)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();

    let mut temp = tempfile::Builder::new()
        .prefix("kiln-hook-")
        .suffix(&suffix)
        .tempfile()
        .map_err(Error::IoError)?;
    temp.write_all(rendered.as_bytes()).map_err(Error::IoError)?;
    temp.flush().map_err(Error::IoError)?;

    // Dropping `temp` removes the rendered script regardless of outcome.
    run_script(hook_name, temp.path(), cwd, context)
}

/// Finds and executes the hook `hook_name`, if the template provides one.
pub fn run_hook<P: AsRef<Path>>(
    repo_dir: P,
    hook_name: &str,
    cwd: &Path,
    context: &Context,
    renderer: &dyn TemplateRenderer,
) -> Result<()> {
    let Some(script_path) = find_hook(repo_dir, hook_name) else {
        log::debug!("No '{hook_name}' hook found");
        return Ok(());
    };
    if is_templated(&script_path) {
        run_script_with_context(hook_name, &script_path, cwd, context, renderer)
    } else {
        run_script(hook_name, &script_path, cwd, context)
    }
}

/// Runs a generation hook against the project directory, deleting the
/// partially generated project on failure when asked to.
pub fn run_hook_from_repo_dir(
    repo_dir: &Path,
    hook_name: &str,
    project_dir: &Path,
    context: &Context,
    renderer: &dyn TemplateRenderer,
    delete_project_on_failure: bool,
) -> Result<()> {
    match run_hook(repo_dir, hook_name, project_dir, context, renderer) {
        Ok(()) => Ok(()),
        Err(e) => {
            if delete_project_on_failure && project_dir.exists() {
                log::warn!(
                    "Hook '{hook_name}' failed; removing project directory '{}'",
                    project_dir.display()
                );
                if let Err(cleanup_err) = utils::rmtree(project_dir) {
                    log::warn!("Failed to remove project directory: {cleanup_err}");
                }
            }
            match e {
                Error::FailedHook { .. } => Err(e),
                other => Err(failed(hook_name, other.to_string())),
            }
        }
    }
}

/// Runs the `pre_prompt` hook, if present, against an isolated copy of
/// the repository and returns the copy as the new working root.
///
/// The copy exists because `pre_prompt` may mutate the template tree
/// before variables are collected; a cached or shared checkout must not
/// observe that mutation. On failure the copy is deleted and the error
/// propagates.
pub fn run_pre_prompt_hook<P: AsRef<Path>>(
    repo_dir: P,
    renderer: &dyn TemplateRenderer,
) -> Result<PathBuf> {
    let repo_dir = repo_dir.as_ref();
    if find_hook(repo_dir, "pre_prompt").is_none() {
        return Ok(repo_dir.to_path_buf());
    }

    let work_dir = utils::create_tmp_repo_dir(repo_dir)?;
    match run_hook(&work_dir, "pre_prompt", &work_dir, &Context::new(), renderer) {
        Ok(()) => Ok(work_dir),
        Err(e) => {
            if let Err(cleanup_err) = utils::rmtree(&work_dir) {
                log::warn!("Failed to remove temporary repository copy: {cleanup_err}");
            }
            match e {
                Error::FailedHook { .. } => Err(e),
                other => Err(failed("pre_prompt", other.to_string())),
            }
        }
    }
}
