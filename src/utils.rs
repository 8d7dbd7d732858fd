//! Filesystem helpers shared across the pipeline.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Scoped working-directory change. The previous directory is restored on
/// drop, on every exit path.
pub struct WorkingDirGuard {
    previous: PathBuf,
}

impl WorkingDirGuard {
    pub fn change_to<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let previous = std::env::current_dir().map_err(Error::IoError)?;
        std::env::set_current_dir(dir.as_ref()).map_err(Error::IoError)?;
        Ok(Self { previous })
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        if let Err(e) = std::env::set_current_dir(&self.previous) {
            log::warn!(
                "Failed to restore working directory '{}': {}",
                self.previous.display(),
                e
            );
        }
    }
}

/// Ensures a directory exists, creating parents as needed.
pub fn make_sure_path_exists<P: AsRef<Path>>(path: P) -> Result<()> {
    fs::create_dir_all(path.as_ref()).map_err(Error::IoError)
}

/// Removes a directory tree, clearing read-only bits first so checkouts
/// with protected metadata can be deleted.
pub fn rmtree<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if let Err(first) = fs::remove_dir_all(path) {
        if !path.exists() {
            return Ok(());
        }
        make_tree_writable(path)?;
        fs::remove_dir_all(path).map_err(|_| Error::IoError(first))?;
    }
    Ok(())
}

fn make_tree_writable(path: &Path) -> Result<()> {
    for entry in walkdir::WalkDir::new(path) {
        let entry = entry.map_err(|e| Error::IoError(e.into()))?;
        let metadata = entry.metadata().map_err(|e| Error::IoError(e.into()))?;
        let mut permissions = metadata.permissions();
        if permissions.readonly() {
            #[allow(clippy::permissions_set_readonly_false)]
            permissions.set_readonly(false);
            fs::set_permissions(entry.path(), permissions).map_err(Error::IoError)?;
        }
    }
    Ok(())
}

/// Recursively copies `src` into `dst` (which is created if absent).
pub fn copy_dir_recursive<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dst: Q) -> Result<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();
    make_sure_path_exists(dst)?;
    for entry in fs::read_dir(src).map_err(Error::IoError)? {
        let entry = entry.map_err(Error::IoError)?;
        let target = dst.join(entry.file_name());
        let file_type = entry.file_type().map_err(Error::IoError)?;
        if file_type.is_dir() {
            copy_dir_recursive(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target).map_err(Error::IoError)?;
        }
    }
    Ok(())
}

/// Copies the repository into a fresh temporary directory and returns its
/// path. The caller owns the copy and is responsible for deleting it.
pub fn create_tmp_repo_dir<P: AsRef<Path>>(repo_dir: P) -> Result<PathBuf> {
    let temp_dir = tempfile::Builder::new()
        .prefix("kiln-repo-")
        .tempdir()
        .map_err(Error::IoError)?
        .keep();
    log::debug!(
        "Copying '{}' to temporary directory '{}'",
        repo_dir.as_ref().display(),
        temp_dir.display()
    );
    copy_dir_recursive(repo_dir, &temp_dir)?;
    Ok(temp_dir)
}

/// Marks a script executable for owner, group and others.
#[cfg(unix)]
pub fn make_executable<P: AsRef<Path>>(script_path: P) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let metadata = fs::metadata(script_path.as_ref()).map_err(Error::IoError)?;
    let mut permissions = metadata.permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    fs::set_permissions(script_path.as_ref(), permissions).map_err(Error::IoError)
}

#[cfg(not(unix))]
pub fn make_executable<P: AsRef<Path>>(_script_path: P) -> Result<()> {
    Ok(())
}

/// Content-sniffs a file for binary data: a NUL byte in the first 8 KiB
/// marks it binary. Extension is deliberately ignored.
pub fn is_binary<P: AsRef<Path>>(path: P) -> Result<bool> {
    use std::io::Read;
    let mut buffer = [0u8; 8192];
    let mut file = fs::File::open(path.as_ref()).map_err(Error::IoError)?;
    let read = file.read(&mut buffer).map_err(Error::IoError)?;
    Ok(buffer[..read].contains(&0))
}

/// Derives a template identity from a reference: the basename with any
/// trailing slash and `.git`/`.zip` suffix stripped. Used both for cache
/// directory naming and replay record naming.
pub fn template_identity(template: &str) -> String {
    let trimmed = template.trim_end_matches(['/', '\\']);
    let base = trimmed
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(trimmed);
    let base = base.strip_suffix(".git").unwrap_or(base);
    let base = if base.to_lowercase().ends_with(".zip") {
        &base[..base.len() - 4]
    } else {
        base
    };
    base.to_string()
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}
