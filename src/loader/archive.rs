//! Fetching and unpacking zip-archived templates.

use crate::error::{Error, Result};
use crate::prompt::{prompt_and_delete, Prompter};
use crate::utils;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// The result of a successful archive extraction.
///
/// `extraction_root` is the acquisition-owned temporary directory that
/// must be deleted once the run finishes; `template_dir` is the archive's
/// single top-level directory inside it.
#[derive(Debug)]
pub struct ExtractedArchive {
    pub template_dir: PathBuf,
    pub extraction_root: PathBuf,
}

fn invalid(zip_uri: &str, reason: impl Into<String>) -> Error {
    Error::InvalidZipRepository {
        zip_uri: zip_uri.to_string(),
        reason: reason.into(),
    }
}

/// Downloads (if remote) and unpacks a zip archive into a fresh
/// temporary directory under `clone_to_dir`.
///
/// Corrupt archives, archives without a single top-level directory and
/// bad passwords all surface as [`Error::InvalidZipRepository`]. A
/// downloaded archive file is deleted afterward: immediately under
/// `no_input`, otherwise after asking.
pub fn unzip(
    prompter: &dyn Prompter,
    zip_uri: &str,
    is_url: bool,
    clone_to_dir: &Path,
    no_input: bool,
    password: Option<&str>,
) -> Result<ExtractedArchive> {
    utils::make_sure_path_exists(clone_to_dir)?;

    let (zip_path, downloaded) = if is_url {
        (download(zip_uri, clone_to_dir)?, true)
    } else {
        let path = PathBuf::from(zip_uri);
        if !path.is_file() {
            return Err(invalid(zip_uri, "no such file"));
        }
        (path, false)
    };

    let result = extract(prompter, zip_uri, &zip_path, clone_to_dir, no_input, password);

    if downloaded {
        let delete = if no_input {
            true
        } else {
            prompt_and_delete(prompter, &zip_path, no_input).unwrap_or(true)
        };
        if delete && zip_path.exists() {
            if let Err(e) = std::fs::remove_file(&zip_path) {
                log::warn!("Failed to remove '{}': {}", zip_path.display(), e);
            }
        }
    }

    result
}

fn download(zip_uri: &str, clone_to_dir: &Path) -> Result<PathBuf> {
    log::debug!("Downloading zip archive '{zip_uri}'");
    let response = reqwest::blocking::get(zip_uri)
        .map_err(|e| invalid(zip_uri, format!("download failed: {e}")))?;
    if !response.status().is_success() {
        return Err(invalid(
            zip_uri,
            format!("download failed with status {}", response.status()),
        ));
    }
    let bytes = response
        .bytes()
        .map_err(|e| invalid(zip_uri, format!("download failed: {e}")))?;

    let mut temp = tempfile::Builder::new()
        .prefix("kiln-download-")
        .suffix(".zip")
        .tempfile_in(clone_to_dir)
        .map_err(Error::IoError)?;
    temp.write_all(&bytes).map_err(Error::IoError)?;
    temp.into_temp_path().keep().map_err(|e| Error::IoError(e.into()))
}

fn extract(
    prompter: &dyn Prompter,
    zip_uri: &str,
    zip_path: &Path,
    clone_to_dir: &Path,
    no_input: bool,
    password: Option<&str>,
) -> Result<ExtractedArchive> {
    let file = std::fs::File::open(zip_path).map_err(Error::IoError)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| invalid(zip_uri, format!("corrupt archive: {e}")))?;
    if archive.is_empty() {
        return Err(invalid(zip_uri, "empty archive"));
    }

    // The archive must unpack into a single top-level directory; its name
    // becomes the acquired template directory.
    let (top_level, encrypted) = {
        let first = archive
            .by_index_raw(0)
            .map_err(|e| invalid(zip_uri, format!("corrupt archive: {e}")))?;
        let top = first
            .name()
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string();
        (top, first.encrypted())
    };
    if top_level.is_empty() {
        return Err(invalid(zip_uri, "archive has no top-level directory"));
    }

    let password = match (password, encrypted, no_input) {
        (Some(pw), _, _) => Some(pw.to_string()),
        (None, true, false) => Some(prompter.password(format!(
            "Enter the password for the encrypted repository '{zip_uri}'"
        ))?),
        _ => None,
    };

    let extraction_root = tempfile::Builder::new()
        .prefix("kiln-zip-")
        .tempdir_in(clone_to_dir)
        .map_err(Error::IoError)?
        .keep();

    if let Err(e) = extract_all(&mut archive, &extraction_root, password.as_deref()) {
        let _ = utils::rmtree(&extraction_root);
        return Err(invalid(zip_uri, e));
    }

    let template_dir = extraction_root.join(&top_level);
    if !template_dir.is_dir() {
        let _ = utils::rmtree(&extraction_root);
        return Err(invalid(
            zip_uri,
            "archive did not unpack into a top-level directory",
        ));
    }

    Ok(ExtractedArchive {
        template_dir,
        extraction_root,
    })
}

fn extract_all(
    archive: &mut zip::ZipArchive<std::fs::File>,
    target: &Path,
    password: Option<&str>,
) -> std::result::Result<(), String> {
    for index in 0..archive.len() {
        let mut entry = match password {
            Some(pw) => archive
                .by_index_decrypt(index, pw.as_bytes())
                .map_err(|e| format!("bad password or corrupt archive: {e}"))?,
            None => archive
                .by_index(index)
                .map_err(|e| format!("corrupt or encrypted archive: {e}"))?,
        };
        // enclosed_name refuses paths escaping the extraction root.
        let Some(rel) = entry.enclosed_name() else {
            return Err(format!("unsafe path in archive: '{}'", entry.name()));
        };
        let out_path = target.join(rel);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| e.to_string())?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let mut out_file = std::fs::File::create(&out_path).map_err(|e| e.to_string())?;
        let mut contents = Vec::new();
        entry
            .read_to_end(&mut contents)
            .map_err(|e| format!("bad password or corrupt archive: {e}"))?;
        out_file.write_all(&contents).map_err(|e| e.to_string())?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(
                &out_path,
                std::fs::Permissions::from_mode(mode),
            );
        }
    }
    Ok(())
}
