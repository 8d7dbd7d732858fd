use kiln::error::{Error, Result};
use kiln::loader::archive::unzip;
use kiln::prompt::Prompter;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// Prompter that fails the test if anything prompts; archive handling
/// under `no_input` must never ask.
struct NoPrompter;

impl Prompter for NoPrompter {
    fn confirm(&self, _skip: bool, question: String) -> Result<bool> {
        panic!("unexpected prompt: {question}");
    }

    fn input(&self, prompt: String, _default: String) -> Result<String> {
        panic!("unexpected prompt: {prompt}");
    }

    fn select(&self, prompt: String, _items: &[String], _default: usize) -> Result<usize> {
        panic!("unexpected prompt: {prompt}");
    }

    fn password(&self, prompt: String) -> Result<String> {
        panic!("unexpected prompt: {prompt}");
    }
}

/// Writes a zip archive at `path`. Entries with contents become files,
/// entries without become directories.
fn write_zip(path: &Path, entries: &[(&str, Option<&str>)]) {
    let file = fs::File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    for (name, contents) in entries {
        match contents {
            Some(data) => {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data.as_bytes()).unwrap();
            }
            None => {
                writer.add_directory(*name, options).unwrap();
            }
        }
    }
    writer.finish().unwrap();
}

#[test]
fn test_local_zip_extracts_into_cache_dir() {
    let dir = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    let zip_path = dir.path().join("template.zip");
    write_zip(
        &zip_path,
        &[
            ("tpl/", None),
            ("tpl/kiln.json", Some(r#"{"project_name": "Demo"}"#)),
            ("tpl/{{ kiln.project_name }}/", None),
            ("tpl/{{ kiln.project_name }}/README.md", Some("# {{ kiln.project_name }}\n")),
        ],
    );

    let extracted = unzip(
        &NoPrompter,
        zip_path.to_str().unwrap(),
        false,
        cache.path(),
        true,
        None,
    )
    .unwrap();

    assert_eq!(extracted.template_dir.file_name().unwrap(), "tpl");
    assert!(extracted.template_dir.join("kiln.json").is_file());
    assert!(extracted
        .template_dir
        .join("{{ kiln.project_name }}")
        .join("README.md")
        .is_file());
    assert!(extracted.extraction_root.starts_with(cache.path()));
}

#[test]
fn test_corrupt_archive_is_invalid() {
    let dir = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    let zip_path = dir.path().join("broken.zip");
    fs::write(&zip_path, "this is not a zip archive").unwrap();

    let err = unzip(
        &NoPrompter,
        zip_path.to_str().unwrap(),
        false,
        cache.path(),
        true,
        None,
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidZipRepository { .. }));
}

#[test]
fn test_empty_archive_is_invalid() {
    let dir = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    let zip_path = dir.path().join("empty.zip");
    write_zip(&zip_path, &[]);

    let err = unzip(
        &NoPrompter,
        zip_path.to_str().unwrap(),
        false,
        cache.path(),
        true,
        None,
    )
    .unwrap_err();
    match err {
        Error::InvalidZipRepository { reason, .. } => {
            assert!(reason.contains("empty"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_archive_without_top_level_directory_is_invalid() {
    let dir = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    let zip_path = dir.path().join("flat.zip");
    write_zip(&zip_path, &[("kiln.json", Some("{}"))]);

    let err = unzip(
        &NoPrompter,
        zip_path.to_str().unwrap(),
        false,
        cache.path(),
        true,
        None,
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidZipRepository { .. }));
    // The failed extraction left nothing behind in the cache.
    assert_eq!(fs::read_dir(cache.path()).unwrap().count(), 0);
}

#[test]
fn test_archive_with_escaping_path_is_rejected() {
    let dir = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    let zip_path = dir.path().join("hostile.zip");
    write_zip(
        &zip_path,
        &[
            ("tpl/", None),
            ("tpl/kiln.json", Some("{}")),
            ("../escaped.txt", Some("outside")),
        ],
    );

    let err = unzip(
        &NoPrompter,
        zip_path.to_str().unwrap(),
        false,
        cache.path(),
        true,
        None,
    )
    .unwrap_err();
    match err {
        Error::InvalidZipRepository { reason, .. } => {
            assert!(reason.contains("unsafe path"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!cache.path().join("escaped.txt").exists());
    assert!(!dir.path().join("escaped.txt").exists());
}

#[test]
fn test_missing_local_archive_is_invalid() {
    let cache = TempDir::new().unwrap();
    let err = unzip(
        &NoPrompter,
        "/no/such/template.zip",
        false,
        cache.path(),
        true,
        None,
    )
    .unwrap_err();
    match err {
        Error::InvalidZipRepository { reason, .. } => {
            assert!(reason.contains("no such file"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
