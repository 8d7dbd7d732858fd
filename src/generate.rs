//! The generation engine: walks the template tree, renders directory and
//! file names then file contents, honors copy-only exclusions and
//! orchestrates the generation hooks around itself.

use crate::context::{copy_without_render_patterns, Context};
use crate::error::{Error, Result};
use crate::hooks::run_hook_from_repo_dir;
use crate::locate::{find_project_template, find_template};
use crate::renderer::{namespaced, TemplateRenderer};
use crate::utils;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Flags controlling a single generation run.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub overwrite_if_exists: bool,
    pub skip_if_file_exists: bool,
    pub accept_hooks: bool,
    pub keep_project_on_failure: bool,
}

/// Compiles the `_copy_without_render` patterns into a matcher.
pub fn build_copy_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).map_err(|e| {
            Error::ConfigError(format!("invalid copy-only pattern '{pattern}': {e}"))
        })?);
    }
    builder
        .build()
        .map_err(|e| Error::ConfigError(format!("invalid copy-only patterns: {e}")))
}

/// A rendered path is usable when it is non-empty and did not lose a
/// segment to a conditional name that collapsed to nothing.
pub fn is_rendered_path_valid(path: &str) -> bool {
    !path.trim().is_empty() && !path.starts_with('/') && !path.contains("//")
}

/// Renders a source-tree path through the context. Undefined references
/// surface as [`Error::UndefinedVariable`] naming the offending source
/// path.
fn render_path(
    renderer: &dyn TemplateRenderer,
    template: &str,
    ctx_value: &crate::context::Value,
    infile: &str,
    context: &Context,
) -> Result<String> {
    match renderer.render(template, ctx_value) {
        Ok(rendered) => Ok(rendered),
        Err(e) if e.is_undefined_variable() => Err(Error::UndefinedVariable {
            file: infile.to_string(),
            message: e.to_string(),
            context: context.clone(),
        }),
        Err(e) => Err(e),
    }
}

/// Renders `dirname` and creates the resulting directory under
/// `output_dir`. Returns `None` when the rendered name collapsed to
/// nothing, otherwise the directory path and whether this call created
/// it; fails with [`Error::OutputDirExists`] when the directory exists
/// and overwriting was not requested.
pub fn render_and_create_dir(
    dirname: &str,
    context: &Context,
    output_dir: &Path,
    renderer: &dyn TemplateRenderer,
    overwrite_if_exists: bool,
) -> Result<Option<(PathBuf, bool)>> {
    let ctx_value = namespaced(context);
    let rendered = render_path(renderer, dirname, &ctx_value, dirname, context)?;
    if !is_rendered_path_valid(&rendered) {
        log::debug!("Skipping '{dirname}': rendered name is empty");
        return Ok(None);
    }

    let dir_to_create = output_dir.join(&rendered);
    if dir_to_create.exists() {
        if !overwrite_if_exists {
            return Err(Error::OutputDirExists {
                output_dir: dir_to_create.display().to_string(),
            });
        }
        log::debug!("Output directory '{}' exists, reusing", dir_to_create.display());
        Ok(Some((dir_to_create, false)))
    } else {
        utils::make_sure_path_exists(&dir_to_create)?;
        Ok(Some((dir_to_create, true)))
    }
}

/// Renders one template file into the project directory.
///
/// Binary files (content-sniffed) are copied verbatim. Text files have
/// their relative path and contents rendered; with `skip_if_file_exists`
/// a pre-existing output file is left untouched. Returns `true` when the
/// output file was written or copied.
///
/// Precondition: the template root is the current working directory, so
/// `infile` resolves relative to it.
pub fn generate_file(
    project_dir: &Path,
    infile: &str,
    context: &Context,
    renderer: &dyn TemplateRenderer,
    skip_if_file_exists: bool,
) -> Result<bool> {
    let ctx_value = namespaced(context);
    let rendered_path = render_path(renderer, infile, &ctx_value, infile, context)?;
    if !is_rendered_path_valid(&rendered_path) {
        log::debug!("Skipping '{infile}': rendered path is empty");
        return Ok(false);
    }

    let outfile = project_dir.join(&rendered_path);
    if let Some(parent) = outfile.parent() {
        utils::make_sure_path_exists(parent)?;
    }
    if skip_if_file_exists && outfile.exists() {
        log::debug!("File '{}' already exists, skipping", outfile.display());
        return Ok(false);
    }

    if utils::is_binary(infile)? {
        log::debug!("Copying binary '{infile}' to '{}'", outfile.display());
        fs::copy(infile, &outfile).map_err(Error::IoError)?;
        return Ok(true);
    }

    let source = fs::read_to_string(infile).map_err(Error::IoError)?;
    let rendered = match renderer.render(&source, &ctx_value) {
        Ok(rendered) => rendered,
        Err(e) if e.is_undefined_variable() => {
            return Err(Error::UndefinedVariable {
                file: infile.to_string(),
                message: e.to_string(),
                context: context.clone(),
            });
        }
        // Syntax errors indicate a malformed template; propagate as-is.
        Err(e) => return Err(e),
    };

    log::debug!("Writing file '{}'", outfile.display());
    fs::write(&outfile, rendered).map_err(Error::IoError)?;
    let permissions = fs::metadata(infile).map_err(Error::IoError)?.permissions();
    fs::set_permissions(&outfile, permissions).map_err(Error::IoError)?;
    Ok(true)
}

/// Renders the template into `output_dir` and returns the generated
/// project directory.
///
/// A failure after the project directory was created by this run deletes
/// it again unless `keep_project_on_failure` is set. A project directory
/// that existed before this run is never deleted: without
/// `overwrite_if_exists` it fails before anything is written, with it
/// the directory survives rollback.
pub fn generate_files(
    repo_dir: &Path,
    context: &Context,
    output_dir: &Path,
    options: &GenerateOptions,
    renderer: &dyn TemplateRenderer,
) -> Result<PathBuf> {
    let template_root = find_template(repo_dir)?;
    let template_dir = find_project_template(&template_root);
    log::debug!("Generating project from '{}'", template_dir.display());

    let unrendered_name = template_dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            Error::ConfigError("template directory name is not valid UTF-8".to_string())
        })?;

    let (project_dir, created) = render_and_create_dir(
        unrendered_name,
        context,
        output_dir,
        renderer,
        options.overwrite_if_exists,
    )?
    .ok_or_else(|| {
        Error::ConfigError(format!(
            "template directory name '{unrendered_name}' rendered to nothing"
        ))
    })?;
    // The traversal below changes the working directory; the project path
    // must stay valid throughout.
    let project_dir = fs::canonicalize(&project_dir).map_err(Error::IoError)?;
    log::debug!("Project directory is '{}'", project_dir.display());

    // Rollback only removes what this run created.
    let delete_on_failure = created && !options.keep_project_on_failure;

    if options.accept_hooks {
        run_hook_from_repo_dir(
            repo_dir,
            "pre_gen_project",
            &project_dir,
            context,
            renderer,
            delete_on_failure,
        )?;
    }

    if let Err(e) = render_tree(&template_dir, context, &project_dir, options, renderer) {
        if delete_on_failure && project_dir.exists() {
            log::warn!(
                "Generation failed; removing project directory '{}'",
                project_dir.display()
            );
            if let Err(cleanup_err) = utils::rmtree(&project_dir) {
                log::warn!("Failed to remove project directory: {cleanup_err}");
            }
        }
        return Err(e);
    }

    if options.accept_hooks {
        run_hook_from_repo_dir(
            repo_dir,
            "post_gen_project",
            &project_dir,
            context,
            renderer,
            delete_on_failure,
        )?;
    }

    Ok(project_dir)
}

/// Walks the template tree in stable sorted order, creating directories
/// before the files beneath them.
fn render_tree(
    template_dir: &Path,
    context: &Context,
    project_dir: &Path,
    options: &GenerateOptions,
    renderer: &dyn TemplateRenderer,
) -> Result<()> {
    let copy_set = build_copy_globset(&copy_without_render_patterns(context))?;
    let ctx_value = namespaced(context);

    let _guard = utils::WorkingDirGuard::change_to(template_dir)?;
    for entry in WalkDir::new(".").sort_by_file_name() {
        let entry = entry.map_err(|e| Error::IoError(e.into()))?;
        let rel = entry.path().strip_prefix(".").unwrap_or(entry.path());
        let Some(rel_str) = rel.to_str() else {
            return Err(Error::ConfigError(format!(
                "template path '{}' is not valid UTF-8",
                rel.display()
            )));
        };
        if rel_str.is_empty() {
            continue;
        }

        if entry.file_type().is_dir() {
            render_and_create_dir(
                rel_str,
                context,
                project_dir,
                renderer,
                options.overwrite_if_exists,
            )?;
        } else if copy_set.is_match(rel_str) {
            // Copy-only: the destination path is still rendered, the
            // contents are copied byte-for-byte.
            let rendered = render_path(renderer, rel_str, &ctx_value, rel_str, context)?;
            if !is_rendered_path_valid(&rendered) {
                continue;
            }
            let target = project_dir.join(&rendered);
            if let Some(parent) = target.parent() {
                utils::make_sure_path_exists(parent)?;
            }
            if options.skip_if_file_exists && target.exists() {
                log::debug!("File '{}' already exists, skipping", target.display());
                continue;
            }
            log::debug!("Copying '{rel_str}' to '{}' without rendering", target.display());
            fs::copy(rel, &target).map_err(Error::IoError)?;
        } else {
            generate_file(
                project_dir,
                rel_str,
                context,
                renderer,
                options.skip_if_file_exists,
            )?;
        }
    }
    Ok(())
}
