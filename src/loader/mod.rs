//! Template acquisition: resolving a template reference (local path, VCS
//! URL or zip archive) into a local directory.

use crate::error::{Error, Result};
use crate::prompt::Prompter;
use crate::utils;
use indexmap::IndexMap;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub mod archive;
pub mod vcs;

/// The template descriptor file every valid template root must contain.
pub const DESCRIPTOR_FILE: &str = "kiln.json";

/// Built-in repository abbreviations, merged with (and overridable by)
/// the user configuration.
pub fn builtin_abbreviations() -> IndexMap<String, String> {
    IndexMap::from([
        ("gh".to_string(), "https://github.com/{0}.git".to_string()),
        ("gl".to_string(), "https://gitlab.com/{0}.git".to_string()),
        ("bb".to_string(), "https://bitbucket.org/{0}".to_string()),
    ])
}

fn repo_regex() -> &'static Regex {
    static REPO_REGEX: OnceLock<Regex> = OnceLock::new();
    REPO_REGEX.get_or_init(|| {
        // scheme-style URLs (optionally forced with git+/hg+) or a bare
        // user@host form
        Regex::new(r"^((git\+|hg\+)?(git|ssh|file|https?):(//)?|\w+@[\w.]+)")
            .expect("repository URL pattern is valid")
    })
}

/// Returns true if the reference looks like a VCS repository URL.
pub fn is_repo_url(value: &str) -> bool {
    repo_regex().is_match(value)
}

/// Returns true if the reference points at a zip archive.
pub fn is_zip_file(value: &str) -> bool {
    value.to_lowercase().ends_with(".zip")
}

/// Expands a repository abbreviation in a template reference.
///
/// An exact match against the table is replaced outright; a `prefix:rest`
/// reference with a known prefix expands the table's format string,
/// substituting `{0}` with the rest. Anything else passes through
/// unchanged.
pub fn expand_abbreviations(template: &str, abbreviations: &IndexMap<String, String>) -> String {
    if let Some(expanded) = abbreviations.get(template) {
        return expanded.clone();
    }
    if let Some((prefix, rest)) = template.split_once(':') {
        if let Some(format) = abbreviations.get(prefix) {
            return format.replace("{0}", rest);
        }
    }
    template.to_string()
}

/// A template resolved to a local directory.
///
/// `cleanup_dir` is set when acquisition created the directory itself
/// (archive extraction); it is deleted by [`AcquiredTemplate::cleanup`]
/// once the top-level operation finishes. Pre-existing local directories
/// and cached checkouts are never deleted.
#[derive(Debug)]
pub struct AcquiredTemplate {
    pub template_dir: PathBuf,
    cleanup_dir: Option<PathBuf>,
}

impl AcquiredTemplate {
    /// Deletes any acquisition-owned temporary directory. Best-effort:
    /// a failure here is logged, never escalated.
    pub fn cleanup(&self) {
        if let Some(dir) = &self.cleanup_dir {
            log::debug!("Removing acquisition directory '{}'", dir.display());
            if let Err(e) = utils::rmtree(dir) {
                log::warn!("Failed to remove '{}': {}", dir.display(), e);
            }
        }
    }
}

/// Resolves a template reference into a local directory.
///
/// Classification precedence: VCS URL, then zip archive, then existing
/// local directory. The resolved directory (after joining the optional
/// `directory` sub-path) must directly contain [`DESCRIPTOR_FILE`],
/// otherwise acquisition fails with [`Error::RepositoryNotFound`].
#[allow(clippy::too_many_arguments)]
pub fn acquire(
    prompter: &dyn Prompter,
    template: &str,
    abbreviations: &IndexMap<String, String>,
    cache_dir: &Path,
    checkout: Option<&str>,
    no_input: bool,
    password: Option<&str>,
    directory: Option<&str>,
) -> Result<AcquiredTemplate> {
    let expanded = expand_abbreviations(template, abbreviations);

    let (base_dir, cleanup_dir) = if is_repo_url(&expanded) {
        let cloned = vcs::clone(prompter, &expanded, checkout, cache_dir, no_input)?;
        // Checkouts are cached under the cache directory and reused on
        // the next run; they are not acquisition-owned temporaries.
        (cloned, None)
    } else if is_zip_file(&expanded) {
        let is_url = url::Url::parse(&expanded)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false);
        let extracted =
            archive::unzip(prompter, &expanded, is_url, cache_dir, no_input, password)?;
        (extracted.template_dir, Some(extracted.extraction_root))
    } else {
        let path = utils::expand_path(&expanded);
        if !path.is_dir() {
            return Err(Error::RepositoryNotFound {
                template_dir: path.display().to_string(),
            });
        }
        (path, None)
    };

    let template_dir = match directory {
        Some(sub_path) => base_dir.join(sub_path),
        None => base_dir,
    };

    if !template_dir.join(DESCRIPTOR_FILE).is_file() {
        // A just-extracted archive without a descriptor is ours to remove.
        if let Some(dir) = &cleanup_dir {
            if let Err(e) = utils::rmtree(dir) {
                log::warn!("Failed to remove '{}': {}", dir.display(), e);
            }
        }
        return Err(Error::RepositoryNotFound {
            template_dir: template_dir.display().to_string(),
        });
    }

    Ok(AcquiredTemplate {
        template_dir,
        cleanup_dir,
    })
}
