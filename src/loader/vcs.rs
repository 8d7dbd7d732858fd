//! Cloning template repositories with the system's git/hg clients.

use crate::error::{Error, Result};
use crate::prompt::{prompt_and_delete, Prompter};
use crate::utils;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Substrings in checkout output indicating the requested
/// branch/tag/revision does not exist.
const BRANCH_ERRORS: [&str; 2] = ["error: pathspec", "unknown revision"];

/// The version control systems kiln knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcsKind {
    Git,
    Hg,
}

impl VcsKind {
    fn program(self) -> &'static str {
        match self {
            VcsKind::Git => "git",
            VcsKind::Hg => "hg",
        }
    }

    fn checkout_command(self) -> &'static str {
        match self {
            VcsKind::Git => "checkout",
            VcsKind::Hg => "update",
        }
    }
}

impl std::fmt::Display for VcsKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.program())
    }
}

/// Determines the VCS kind for a repository URL.
///
/// An explicit `git+`/`hg+` prefix wins and is stripped from the URL;
/// otherwise a `.git` suffix, a git scheme or a known git host means git
/// and a known hg host means hg. Anything else is
/// [`Error::UnknownRepoType`].
pub fn identify_repo(repo_url: &str) -> Result<(VcsKind, String)> {
    if let Some(stripped) = repo_url.strip_prefix("git+") {
        return Ok((VcsKind::Git, stripped.to_string()));
    }
    if let Some(stripped) = repo_url.strip_prefix("hg+") {
        return Ok((VcsKind::Hg, stripped.to_string()));
    }
    if repo_url.ends_with(".git")
        || repo_url.starts_with("git://")
        || repo_url.starts_with("git@")
        || repo_url.contains("github.com")
        || repo_url.contains("gitlab.com")
    {
        return Ok((VcsKind::Git, repo_url.to_string()));
    }
    // bitbucket historically hosts hg
    if repo_url.contains("bitbucket.org") {
        return Ok((VcsKind::Hg, repo_url.to_string()));
    }
    Err(Error::UnknownRepoType {
        repo_url: repo_url.to_string(),
    })
}

/// Checks whether the client binary for `kind` is on the search path.
pub fn is_vcs_installed(kind: VcsKind) -> bool {
    Command::new(kind.program())
        .arg("--version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok()
}

fn command_output(output: &std::process::Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    format!("{stdout}{stderr}").trim().to_string()
}

/// Clones `repo_url` into `clone_to_dir / basename stem` and optionally
/// switches to `checkout`. Returns the checkout directory.
///
/// An already-cached clone is either deleted and refreshed (forced under
/// `no_input`, otherwise after asking) or reused as-is.
pub fn clone(
    prompter: &dyn Prompter,
    repo_url: &str,
    checkout: Option<&str>,
    clone_to_dir: &Path,
    no_input: bool,
) -> Result<PathBuf> {
    let (kind, url) = identify_repo(repo_url)?;
    if !is_vcs_installed(kind) {
        return Err(Error::VcsNotInstalled {
            vcs: kind.to_string(),
        });
    }

    utils::make_sure_path_exists(clone_to_dir)?;
    let repo_name = utils::template_identity(&url);
    let repo_dir = clone_to_dir.join(&repo_name);
    log::debug!("Cloning '{url}' to '{}'", repo_dir.display());

    if repo_dir.exists() && !prompt_and_delete(prompter, &repo_dir, no_input)? {
        // Reuse the cached checkout as-is.
        return Ok(repo_dir);
    }

    let output = Command::new(kind.program())
        .arg("clone")
        .arg(&url)
        .arg(&repo_name)
        .current_dir(clone_to_dir)
        .output()
        .map_err(Error::IoError)?;
    if !output.status.success() {
        let captured = command_output(&output);
        // A failed clone must not leave a stale cache entry behind.
        if repo_dir.exists() {
            if let Err(e) = utils::rmtree(&repo_dir) {
                log::warn!("Failed to remove '{}': {}", repo_dir.display(), e);
            }
        }
        if captured.to_lowercase().contains("not found") {
            return Err(Error::RepositoryNotFound {
                template_dir: url.clone(),
            });
        }
        return Err(Error::RepositoryCloneFailed {
            repo_url: url.clone(),
            output: captured,
        });
    }

    if let Some(reference) = checkout {
        let output = Command::new(kind.program())
            .arg(kind.checkout_command())
            .arg(reference)
            .current_dir(&repo_dir)
            .output()
            .map_err(Error::IoError)?;
        if !output.status.success() {
            let captured = command_output(&output);
            if BRANCH_ERRORS.iter().any(|e| captured.contains(e)) {
                return Err(Error::RepositoryCloneFailed {
                    repo_url: url,
                    output: format!("the ref '{reference}' does not exist: {captured}"),
                });
            }
            return Err(Error::RepositoryCloneFailed {
                repo_url: url,
                output: captured,
            });
        }
    }

    Ok(repo_dir)
}
