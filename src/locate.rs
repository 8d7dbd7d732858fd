//! Locating the template root inside an acquired directory.

use crate::error::{Error, Result};
use crate::loader::DESCRIPTOR_FILE;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// VCS metadata folders that are never treated as a template root.
pub const VCS_DIRS: [&str; 4] = [".git", ".hg", ".svn", ".bzr"];

/// Determines which directory under `repo_dir` is the template root.
///
/// Search order: a descriptor directly in `repo_dir`; the first directory
/// of a recursive walk containing the descriptor; the first immediate
/// child that is not VCS metadata.
pub fn find_template<P: AsRef<Path>>(repo_dir: P) -> Result<PathBuf> {
    let repo_dir = repo_dir.as_ref();
    log::debug!("Searching '{}' for the template root", repo_dir.display());

    if repo_dir.join(DESCRIPTOR_FILE).is_file() {
        log::debug!("Found {DESCRIPTOR_FILE} at the repository root");
        return Ok(repo_dir.to_path_buf());
    }

    for entry in WalkDir::new(repo_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::IoError(e.into()))?;
        if entry.file_type().is_dir() && entry.path().join(DESCRIPTOR_FILE).is_file() {
            log::debug!("Found {DESCRIPTOR_FILE} in '{}'", entry.path().display());
            return Ok(entry.path().to_path_buf());
        }
    }

    let mut children: Vec<PathBuf> = std::fs::read_dir(repo_dir)
        .map_err(Error::IoError)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    children.sort();
    for child in children {
        let name = child.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if child.is_dir() && !VCS_DIRS.contains(&name) {
            log::debug!("Treating '{}' as the template root", child.display());
            return Ok(child);
        }
    }

    Err(Error::NonTemplatedInputDir {
        repo_dir: repo_dir.display().to_string(),
    })
}

/// The directory whose own (templated) name becomes the output project
/// name: the first child of `template_root` carrying template syntax in
/// its name, or `template_root` itself when no such child exists.
pub fn find_project_template<P: AsRef<Path>>(template_root: P) -> PathBuf {
    let template_root = template_root.as_ref();
    let mut children: Vec<PathBuf> = match std::fs::read_dir(template_root) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(_) => return template_root.to_path_buf(),
    };
    children.sort();
    for child in children {
        let name = child.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if child.is_dir() && name.contains("{{") && name.contains("}}") {
            return child;
        }
    }
    template_root.to_path_buf()
}
